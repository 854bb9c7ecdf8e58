use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DeleteRejection, StoreError};
use crate::models::{Alert, AlertEdit, FiredMarker, MarkerKey, NewAlert, UpdateId};
use crate::traits::{AlertStore, DELETE_BATCH_LIMIT, DeleteReport, MarkerStore};

/// SQLite-backed alert and fired-marker store.
///
/// Mutations are serialized through `write_lock` and each one runs in its own
/// transaction, so a read-modify-persist never interleaves with another.
pub struct Database {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let filename = options.clone().get_filename();
        if !in_memory
            && let Some(parent) = filename.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(sqlx::Error::Io)?;
        }

        // Every connection to `:memory:` is a separate database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub async fn count_alerts(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM alerts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

const ALERT_COLUMNS: &str = "id, owner, resource_id, quality_floor, target_price, label, created_at";

fn alert_from_row(row: &SqliteRow) -> Result<Alert, sqlx::Error> {
    Ok(Alert {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        resource_id: row.try_get("resource_id")?,
        quality_floor: row.try_get("quality_floor")?,
        target_price: row.try_get("target_price")?,
        label: row.try_get("label")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Smallest positive integer absent from `used`.
fn smallest_free_id(used: &BTreeSet<i64>) -> i64 {
    let mut candidate = 1;
    for id in used.range(1..) {
        if *id != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

async fn find_alert(conn: &mut SqliteConnection, id: i64) -> Result<Option<Alert>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(alert_from_row).transpose()
}

async fn delete_markers_for_ids(conn: &mut SqliteConnection, ids: &[i64]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM fired_markers WHERE alert_id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    let result = query.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

async fn delete_markers_for_owner(conn: &mut SqliteConnection, owner: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r"
        DELETE FROM fired_markers
        WHERE owner = ? OR alert_id IN (SELECT id FROM alerts WHERE owner = ?)
        ",
    )
    .bind(owner)
    .bind(owner)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl AlertStore for Database {
    async fn list_all(&self) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {ALERT_COLUMNS} FROM alerts ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        let alerts = rows.iter().map(alert_from_row).collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(alerts)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE owner = ? ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        let alerts = rows.iter().map(alert_from_row).collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(alerts)
    }

    async fn insert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        alert.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        // Ids still referenced by a marker are not free either.
        let used: BTreeSet<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM alerts UNION SELECT alert_id FROM fired_markers",
        )
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        let stored = Alert {
            id: smallest_free_id(&used),
            owner: alert.owner,
            resource_id: alert.resource_id,
            quality_floor: alert.quality_floor,
            target_price: alert.target_price,
            label: alert.label,
            created_at: Utc::now(),
        };

        sqlx::query(
            r"
            INSERT INTO alerts (id, owner, resource_id, quality_floor, target_price, label, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(stored.id)
        .bind(&stored.owner)
        .bind(stored.resource_id)
        .bind(stored.quality_floor)
        .bind(stored.target_price)
        .bind(&stored.label)
        .bind(stored.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(alert_id = stored.id, owner = %stored.owner, "Alert stored");
        Ok(stored)
    }

    async fn update(
        &self,
        id: i64,
        owner: &str,
        elevated: bool,
        edit: AlertEdit,
    ) -> Result<Alert, StoreError> {
        edit.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut alert = match find_alert(&mut tx, id).await? {
            Some(alert) if elevated || alert.owner == owner => alert,
            _ => return Err(StoreError::NotFound(id)),
        };

        let resets_marker = edit.changes_condition();
        edit.apply(&mut alert);

        sqlx::query(
            "UPDATE alerts SET quality_floor = ?, target_price = ?, label = ? WHERE id = ?",
        )
        .bind(alert.quality_floor)
        .bind(alert.target_price)
        .bind(&alert.label)
        .bind(alert.id)
        .execute(&mut *tx)
        .await?;

        if resets_marker {
            delete_markers_for_ids(&mut tx, &[alert.id]).await?;
        }

        tx.commit().await?;
        Ok(alert)
    }

    async fn delete_many(
        &self,
        ids: &[i64],
        requester: &str,
        elevated: bool,
    ) -> Result<DeleteReport, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let mut report = DeleteReport::default();

        for (index, &id) in ids.iter().enumerate() {
            if index >= DELETE_BATCH_LIMIT {
                report
                    .rejected
                    .push((id, DeleteRejection::OverBatchLimit(DELETE_BATCH_LIMIT)));
                continue;
            }

            let Some(alert) = find_alert(&mut tx, id).await? else {
                report.rejected.push((id, DeleteRejection::NotFound));
                continue;
            };
            if alert.owner != requester && !elevated {
                report.rejected.push((id, DeleteRejection::NotOwner));
                continue;
            }

            sqlx::query("DELETE FROM alerts WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            delete_markers_for_ids(&mut tx, &[id]).await?;
            report.deleted.push(id);
        }

        tx.commit().await?;
        Ok(report)
    }

    async fn delete_all_for_owner(&self, owner: &str) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        delete_markers_for_owner(&mut tx, owner).await?;
        let result = sqlx::query("DELETE FROM alerts WHERE owner = ?")
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self, elevated: bool) -> Result<u64, StoreError> {
        if !elevated {
            return Err(StoreError::PermissionDenied);
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM fired_markers")
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM alerts").execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MarkerStore for Database {
    async fn get(&self, key: &MarkerKey) -> Result<Option<FiredMarker>, StoreError> {
        let row = sqlx::query(
            "SELECT update_id, notified_at FROM fired_markers WHERE owner = ? AND alert_id = ?",
        )
        .bind(&key.owner)
        .bind(key.alert_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let notified_at: DateTime<Utc> = row.try_get("notified_at")?;
        Ok(Some(FiredMarker {
            update_id: UpdateId(row.try_get("update_id")?),
            notified_at,
        }))
    }

    async fn set(&self, key: &MarkerKey, update_id: &UpdateId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            r"
            INSERT INTO fired_markers (owner, alert_id, update_id, notified_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(owner, alert_id)
            DO UPDATE SET update_id = excluded.update_id, notified_at = excluded.notified_at
            ",
        )
        .bind(&key.owner)
        .bind(key.alert_id)
        .bind(update_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_if_current(&self, alert: &Alert, update_id: &UpdateId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        // The WHERE clause also keeps SQLite from reading ON CONFLICT as a join constraint.
        let result = sqlx::query(
            r"
            INSERT INTO fired_markers (owner, alert_id, update_id, notified_at)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (
                SELECT 1 FROM alerts
                WHERE id = ? AND owner = ? AND resource_id = ?
                  AND target_price = ? AND quality_floor IS ?
            )
            ON CONFLICT(owner, alert_id)
            DO UPDATE SET update_id = excluded.update_id, notified_at = excluded.notified_at
            ",
        )
        .bind(&alert.owner)
        .bind(alert.id)
        .bind(update_id.as_str())
        .bind(Utc::now())
        .bind(alert.id)
        .bind(&alert.owner)
        .bind(alert.resource_id)
        .bind(alert.target_price)
        .bind(alert.quality_floor)
        .execute(&self.pool)
        .await?;

        let recorded = result.rows_affected() > 0;
        if !recorded {
            debug!(alert_id = alert.id, "Alert changed or deleted, fired-marker not recorded");
        }
        Ok(recorded)
    }

    async fn delete(&self, key: &MarkerKey) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("DELETE FROM fired_markers WHERE owner = ? AND alert_id = ?")
            .bind(&key.owner)
            .bind(key.alert_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_for_owner(&self, owner: &str) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.pool.acquire().await?;
        Ok(delete_markers_for_owner(&mut conn, owner).await?)
    }

    async fn delete_all_for_alert_ids(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.pool.acquire().await?;
        Ok(delete_markers_for_ids(&mut conn, ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_alert(owner: &str, resource_id: i64) -> NewAlert {
        NewAlert {
            owner: owner.to_string(),
            resource_id,
            quality_floor: None,
            target_price: 1.0,
            label: None,
        }
    }

    fn key(owner: &str, alert_id: i64) -> MarkerKey {
        MarkerKey {
            owner: owner.to_string(),
            alert_id,
        }
    }

    fn update(id: &str) -> UpdateId {
        UpdateId(id.to_string())
    }

    async fn memory_db() -> Database {
        Database::connect("sqlite::memory:").await.unwrap()
    }

    #[test]
    fn test_smallest_free_id() {
        assert_eq!(smallest_free_id(&BTreeSet::new()), 1);
        assert_eq!(smallest_free_id(&BTreeSet::from([1, 2, 3])), 4);
        assert_eq!(smallest_free_id(&BTreeSet::from([1, 3])), 2);
        assert_eq!(smallest_free_id(&BTreeSet::from([2, 3])), 1);
    }

    #[tokio::test]
    async fn test_insert_assigns_smallest_free_id() {
        let db = memory_db().await;
        let first = db.insert(new_alert("10", 1)).await.unwrap();
        let second = db.insert(new_alert("10", 2)).await.unwrap();
        let third = db.insert(new_alert("20", 3)).await.unwrap();
        assert_eq!((first.id, second.id, third.id), (1, 2, 3));

        db.delete_many(&[2], "10", false).await.unwrap();
        let refill = db.insert(new_alert("20", 4)).await.unwrap();
        assert_eq!(refill.id, 2);
    }

    #[tokio::test]
    async fn test_id_held_by_marker_is_not_reused() {
        let db = memory_db().await;
        db.set(&key("10", 1), &update("u1")).await.unwrap();

        let alert = db.insert(new_alert("10", 1)).await.unwrap();
        assert_eq!(alert.id, 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_alert() {
        let db = memory_db().await;
        let invalid = NewAlert {
            target_price: -1.0,
            ..new_alert("10", 1)
        };
        let result = db.insert(invalid).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(db.count_alerts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let db = memory_db().await;
        db.insert(new_alert("10", 1)).await.unwrap();
        db.insert(new_alert("20", 2)).await.unwrap();
        db.insert(new_alert("10", 3)).await.unwrap();

        let mine = db.list_by_owner("10").await.unwrap();
        let resources: Vec<i64> = mine.iter().map(|a| a.resource_id).collect();
        assert_eq!(resources, vec![1, 3]);
        assert_eq!(db.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_requires_ownership() {
        let db = memory_db().await;
        let alert = db.insert(new_alert("10", 1)).await.unwrap();

        let denied = db
            .update(alert.id, "20", false, AlertEdit::TargetPrice(2.0))
            .await;
        assert!(matches!(denied, Err(StoreError::NotFound(1))));

        let missing = db.update(99, "10", false, AlertEdit::TargetPrice(2.0)).await;
        assert!(matches!(missing, Err(StoreError::NotFound(99))));

        let elevated = db
            .update(alert.id, "20", true, AlertEdit::TargetPrice(2.0))
            .await
            .unwrap();
        assert_eq!(elevated.target_price, 2.0);
        assert_eq!(elevated.owner, "10");
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_value_and_keeps_store() {
        let db = memory_db().await;
        let alert = db.insert(new_alert("10", 1)).await.unwrap();

        let result = db
            .update(alert.id, "10", false, AlertEdit::QualityFloor(Some(20)))
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let stored = db.list_all().await.unwrap();
        assert_eq!(stored[0].quality_floor, None);
    }

    #[tokio::test]
    async fn test_condition_edit_clears_marker_but_label_edit_does_not() {
        let db = memory_db().await;
        let alert = db.insert(new_alert("10", 1)).await.unwrap();
        db.set(&alert.marker_key(), &update("u1")).await.unwrap();

        db.update(alert.id, "10", false, AlertEdit::Label(Some("wood".to_string())))
            .await
            .unwrap();
        assert!(db.get(&alert.marker_key()).await.unwrap().is_some());

        db.update(alert.id, "10", false, AlertEdit::TargetPrice(0.8))
            .await
            .unwrap();
        assert!(db.get(&alert.marker_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_batch_delete() {
        let db = memory_db().await;
        let mine = db.insert(new_alert("10", 1)).await.unwrap();
        let theirs = db.insert(new_alert("20", 1)).await.unwrap();

        let report = db.delete_many(&[mine.id, theirs.id, 999], "10", false).await.unwrap();

        assert_eq!(report.deleted, vec![mine.id]);
        assert_eq!(
            report.rejected,
            vec![
                (theirs.id, DeleteRejection::NotOwner),
                (999, DeleteRejection::NotFound),
            ]
        );
        assert_eq!(db.count_alerts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_delete_is_bounded() {
        let db = memory_db().await;
        for resource in 0..7 {
            db.insert(new_alert("10", resource)).await.unwrap();
        }

        let report = db
            .delete_many(&[1, 2, 3, 4, 5, 6, 7], "10", false)
            .await
            .unwrap();

        assert_eq!(report.deleted, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            report.rejected,
            vec![
                (6, DeleteRejection::OverBatchLimit(DELETE_BATCH_LIMIT)),
                (7, DeleteRejection::OverBatchLimit(DELETE_BATCH_LIMIT)),
            ]
        );
    }

    #[tokio::test]
    async fn test_elevated_delete_ignores_ownership() {
        let db = memory_db().await;
        let theirs = db.insert(new_alert("20", 1)).await.unwrap();
        let report = db.delete_many(&[theirs.id], "10", true).await.unwrap();
        assert_eq!(report.deleted, vec![theirs.id]);
    }

    #[tokio::test]
    async fn test_delete_removes_marker() {
        let db = memory_db().await;
        let alert = db.insert(new_alert("10", 1)).await.unwrap();
        db.set(&alert.marker_key(), &update("u1")).await.unwrap();

        db.delete_many(&[alert.id], "10", false).await.unwrap();
        assert!(db.get(&alert.marker_key()).await.unwrap().is_none());

        let fresh = db.insert(new_alert("10", 1)).await.unwrap();
        assert_eq!(fresh.id, alert.id);
        assert!(db.get(&fresh.marker_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_all_for_owner_removes_markers() {
        let db = memory_db().await;
        let mine = db.insert(new_alert("10", 1)).await.unwrap();
        let theirs = db.insert(new_alert("20", 1)).await.unwrap();
        db.set(&mine.marker_key(), &update("u1")).await.unwrap();
        db.set(&theirs.marker_key(), &update("u1")).await.unwrap();

        let deleted = AlertStore::delete_all_for_owner(&db, "10").await.unwrap();

        assert_eq!(deleted, 1);
        assert!(db.get(&mine.marker_key()).await.unwrap().is_none());
        assert!(db.get(&theirs.marker_key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_all_requires_elevation() {
        let db = memory_db().await;
        let alert = db.insert(new_alert("10", 1)).await.unwrap();
        db.set(&alert.marker_key(), &update("u1")).await.unwrap();

        assert!(matches!(
            db.delete_all(false).await,
            Err(StoreError::PermissionDenied)
        ));
        assert_eq!(db.count_alerts().await.unwrap(), 1);

        assert_eq!(db.delete_all(true).await.unwrap(), 1);
        assert_eq!(db.count_alerts().await.unwrap(), 0);
        assert!(db.get(&alert.marker_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_marker_set_overwrites() {
        let db = memory_db().await;
        let key = key("10", 1);
        assert!(db.get(&key).await.unwrap().is_none());

        db.set(&key, &update("u1")).await.unwrap();
        db.set(&key, &update("u2")).await.unwrap();
        let marker = db.get(&key).await.unwrap().unwrap();
        assert_eq!(marker.update_id, update("u2"));

        db.delete(&key).await.unwrap();
        assert!(db.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conditional_marker_write_follows_alert() {
        let db = memory_db().await;
        let alert = db.insert(new_alert("10", 1)).await.unwrap();

        assert!(db.set_if_current(&alert, &update("u1")).await.unwrap());
        assert_eq!(db.get(&alert.marker_key()).await.unwrap().unwrap().update_id, update("u1"));

        db.update(alert.id, "10", false, AlertEdit::Label(Some("renamed".to_string())))
            .await
            .unwrap();
        assert!(db.set_if_current(&alert, &update("u2")).await.unwrap());

        db.update(alert.id, "10", false, AlertEdit::QualityFloor(Some(4)))
            .await
            .unwrap();
        assert!(!db.set_if_current(&alert, &update("u3")).await.unwrap());
        assert!(db.get(&alert.marker_key()).await.unwrap().is_none());

        db.delete_many(&[alert.id], "10", false).await.unwrap();
        assert!(!db.set_if_current(&alert, &update("u4")).await.unwrap());
        assert!(db.get(&alert.marker_key()).await.unwrap().is_none());

        let successor = db.insert(new_alert("10", 1)).await.unwrap();
        assert_eq!(successor.id, alert.id);
    }

    #[tokio::test]
    async fn test_marker_bulk_deletes() {
        let db = memory_db().await;
        db.set(&key("10", 1), &update("a")).await.unwrap();
        db.set(&key("10", 2), &update("b")).await.unwrap();
        db.set(&key("20", 3), &update("c")).await.unwrap();

        assert_eq!(db.delete_all_for_alert_ids(&[1, 3]).await.unwrap(), 2);
        assert_eq!(db.delete_all_for_alert_ids(&[]).await.unwrap(), 0);
        assert_eq!(MarkerStore::delete_all_for_owner(&db, "10").await.unwrap(), 1);
        assert!(db.get(&key("10", 2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_alerts_survive_reconnect() {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let dir = std::env::temp_dir().join(format!("simco-alerts-{}-{nanos}", std::process::id()));
        let path = dir.join("nested").join("alerts.db");
        let url = format!("sqlite:{}", path.display());

        {
            let db = Database::connect(&url).await.unwrap();
            let alert = NewAlert {
                quality_floor: Some(3),
                label: Some("wood".to_string()),
                ..new_alert("10", 1)
            };
            db.insert(alert).await.unwrap();
            db.pool.close().await;
        }

        let db = Database::connect(&url).await.unwrap();
        let alerts = db.list_all().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].quality_floor, Some(3));
        assert_eq!(alerts[0].label.as_deref(), Some("wood"));
        db.pool.close().await;

        assert!(path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
