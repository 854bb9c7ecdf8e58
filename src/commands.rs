//! Turns raw command arguments into typed requests for the stores

use thiserror::Error;

use crate::error::ValidationError;
use crate::models::{AlertEdit, NewAlert};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

pub const ALERT_USAGE: &str = "/alert <resource_id> <target_price> [quality] [label]";
pub const EDIT_USAGE: &str = "/edit <id> <price|quality|label> <value>";
pub const DELETE_USAGE: &str = "/delete <id> [id...]";
pub const PRICE_USAGE: &str = "/price <resource_id> [quality]";

fn words(args: &str) -> Vec<&str> {
    args.split_whitespace().collect()
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, ValidationError> {
    value.parse().map_err(|_| ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// `<resource_id> <target_price> [quality] [label...]`
///
/// A third word that is not an integer starts the label instead.
pub fn parse_new_alert(owner: &str, args: &str) -> Result<NewAlert, CommandError> {
    let words = words(args);
    let [resource, price, rest @ ..] = words.as_slice() else {
        return Err(CommandError::Usage(ALERT_USAGE));
    };

    let resource_id = parse_int("resource_id", resource)?;
    let target_price = price
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidNumber {
            field: "target_price",
            value: price.to_string(),
        })?;

    let (quality_floor, label_words) = match rest.split_first() {
        Some((first, tail)) => match first.parse::<i64>() {
            Ok(quality) => (Some(quality), tail),
            Err(_) => (None, rest),
        },
        None => (None, rest),
    };
    let label = (!label_words.is_empty()).then(|| label_words.join(" "));

    let alert = NewAlert {
        owner: owner.to_string(),
        resource_id,
        quality_floor,
        target_price,
        label,
    };
    alert.validate()?;
    Ok(alert)
}

/// `<id> <field> <value...>`
pub fn parse_edit(args: &str) -> Result<(i64, AlertEdit), CommandError> {
    let words = words(args);
    let [id, field, value @ ..] = words.as_slice() else {
        return Err(CommandError::Usage(EDIT_USAGE));
    };
    if value.is_empty() {
        return Err(CommandError::Usage(EDIT_USAGE));
    }
    let id = parse_int("id", id)?;
    let edit = AlertEdit::parse(field, &value.join(" "))?;
    Ok((id, edit))
}

/// Whitespace- or comma-separated alert ids.
pub fn parse_ids(args: &str) -> Result<Vec<i64>, CommandError> {
    let ids = args
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_int("id", s))
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(CommandError::Usage(DELETE_USAGE));
    }
    Ok(ids)
}

/// `<resource_id> [quality]`
pub fn parse_price_query(args: &str) -> Result<(i64, Option<i64>), CommandError> {
    match words(args).as_slice() {
        [resource] => Ok((parse_int("resource_id", resource)?, None)),
        [resource, quality] => Ok((
            parse_int("resource_id", resource)?,
            Some(parse_int("quality", quality)?),
        )),
        _ => Err(CommandError::Usage(PRICE_USAGE)),
    }
}
