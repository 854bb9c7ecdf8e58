//! Plain-text messages sent by the bot

use crate::evaluator::{AlertState, CycleOutcome};
use crate::models::{Alert, Listing, PriceSummary};
use crate::traits::{DELETE_BATCH_LIMIT, DeleteReport};

pub const HELP: &str = "SimcoTools price alerts\n\n\
/alert <resource_id> <target_price> [quality] [label]\n\
  Notify me when the resource sells at or below the target price.\n\
  With a quality, only offers of that quality or better count.\n\
  Example: /alert 1 0.25 0 cheap wood\n\
/alerts - list your alerts\n\
/edit <id> <price|quality|label> <value> - change one field (quality any clears it)\n\
/delete <id> [id...] - delete up to 5 alerts\n\
/deleteall - delete all of your alerts\n\
/price <resource_id> [quality] - current market prices\n\
/status - bot status";

/// Precision follows magnitude so cheap resources keep their significant digits.
pub fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 100.0 {
        format!("${price:.2}")
    } else if abs >= 1.0 {
        format!("${price:.3}")
    } else {
        format!("${price:.4}")
    }
}

fn quality_floor_text(alert: &Alert) -> String {
    alert
        .quality_floor
        .map_or_else(|| "any quality".to_string(), |q| format!("Q{q}+"))
}

pub fn notification(alert: &Alert, offer: &Listing) -> String {
    let mut lines = vec![
        format!("🚨 Price alert: {}\n", alert.display_label()),
        format!("Resource: {}", alert.resource_id),
        format!("Quality: Q{} (wanted {})", offer.quality, quality_floor_text(alert)),
        format!(
            "Price: {} (target <= {})",
            format_price(offer.price),
            format_price(alert.target_price)
        ),
    ];
    if let Some(quantity) = offer.quantity {
        lines.push(format!("Quantity: {quantity}"));
    }
    if let Some(seller) = &offer.seller {
        lines.push(format!("Seller: {seller}"));
    }
    lines.push(format!("Market update: {}", offer.posted_at));
    lines.join("\n")
}

pub fn alert_created(alert: &Alert) -> String {
    format!(
        "Alert created with id {}.\nResource {} at {}, price <= {}.\nName: {}",
        alert.id,
        alert.resource_id,
        quality_floor_text(alert),
        format_price(alert.target_price),
        alert.display_label(),
    )
}

pub fn alert_updated(alert: &Alert) -> String {
    format!(
        "Alert {} updated: resource {} at {}, price <= {}, name: {}",
        alert.id,
        alert.resource_id,
        quality_floor_text(alert),
        format_price(alert.target_price),
        alert.display_label(),
    )
}

pub fn alert_list(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "You have no active alerts.".to_string();
    }
    let lines: Vec<String> = alerts
        .iter()
        .map(|alert| {
            format!(
                "{}: resource {}, {}, price <= {} ({})",
                alert.id,
                alert.resource_id,
                quality_floor_text(alert),
                format_price(alert.target_price),
                alert.display_label(),
            )
        })
        .collect();
    format!("Your active alerts:\n\n{}", lines.join("\n"))
}

pub fn delete_report(report: &DeleteReport) -> String {
    let mut lines = Vec::new();
    if !report.deleted.is_empty() {
        let ids: Vec<String> = report.deleted.iter().map(ToString::to_string).collect();
        lines.push(format!("Deleted: {}", ids.join(", ")));
    }
    for (id, reason) in &report.rejected {
        lines.push(format!("Not deleted {id}: {reason}"));
    }
    if lines.is_empty() {
        lines.push(format!(
            "Nothing to delete. Give between 1 and {DELETE_BATCH_LIMIT} alert ids."
        ));
    }
    lines.join("\n")
}

pub fn prices(resource_id: i64, quality: Option<i64>, found: &[PriceSummary]) -> String {
    if found.is_empty() {
        let quality = quality.map(|q| format!(" (Q{q})")).unwrap_or_default();
        return format!("No prices found for resource {resource_id}{quality}.");
    }
    let mut sorted = found.to_vec();
    sorted.sort_by_key(|p| p.quality);

    let lines: Vec<String> = sorted
        .iter()
        .map(|price| {
            format!(
                "Q{}: {} (updated {})",
                price.quality,
                format_price(price.price),
                price.updated_at.as_deref().unwrap_or("n/a"),
            )
        })
        .collect();
    format!("Current prices for resource {resource_id}:\n\n{}", lines.join("\n"))
}

pub fn status(total: i64, mine: usize) -> String {
    format!(
        "Bot is running and watching the market.\nActive alerts: {total} in total, {mine} of them yours."
    )
}

pub fn cycle_summary(outcomes: &[CycleOutcome]) -> String {
    let notified = outcomes.iter().filter(|o| o.notified()).count();
    let unpersisted = outcomes
        .iter()
        .filter(|o| o.state == AlertState::NotifiedUnpersisted)
        .count();
    let mut summary = format!(
        "Checked {} alerts, {} notification(s) sent.",
        outcomes.len(),
        notified
    );
    if unpersisted > 0 {
        summary.push_str(&format!(
            " {unpersisted} not recorded and may be sent again."
        ));
    }
    summary
}
