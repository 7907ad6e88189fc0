//! # Activity Repository
//!
//! The append-only audit trail.
//!
//! Mutating repository methods call [`record`] on their own transaction so
//! the audit row commits or rolls back together with the change it
//! describes. Events that change nothing else (logins, denied access) go
//! through [`ActivityRepository::append`].

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use koperasi_core::period::DateRange;
use koperasi_core::{ActivityLog, Module, NewActivity};

use super::push_range;
use crate::error::DbResult;

const ACTIVITY_SELECT: &str = r#"
    SELECT
        a.id,
        a.user_id,
        u.username,
        a.module,
        a.action,
        a.description,
        a.created_at
    FROM activity_logs a
    LEFT JOIN users u ON u.id = a.user_id
    WHERE 1 = 1
"#;

/// Filter for the activity screen.
#[derive(Debug, Clone)]
pub struct ActivityFilter {
    pub module: Option<Module>,
    pub user_id: Option<String>,
    pub range: DateRange,
    pub limit: i64,
}

impl Default for ActivityFilter {
    fn default() -> Self {
        ActivityFilter {
            module: None,
            user_id: None,
            range: DateRange::unbounded(),
            limit: 100,
        }
    }
}

/// Writes one activity row on an open connection or transaction.
pub(crate) async fn record(conn: &mut SqliteConnection, entry: &NewActivity) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, user_id, module, action, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&entry.user_id)
    .bind(entry.module)
    .bind(entry.action)
    .bind(&entry.description)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Appends a standalone event.
    pub async fn append(&self, entry: &NewActivity) -> DbResult<()> {
        debug!(module = %entry.module, action = ?entry.action, "Appending activity");
        let mut conn = self.pool.acquire().await?;
        record(&mut conn, entry).await
    }

    /// Most recent first.
    pub async fn list(&self, filter: &ActivityFilter) -> DbResult<Vec<ActivityLog>> {
        let mut qb = QueryBuilder::<Sqlite>::new(ACTIVITY_SELECT);
        if let Some(module) = filter.module {
            qb.push(" AND a.module = ").push_bind(module);
        }
        if let Some(user_id) = &filter.user_id {
            qb.push(" AND a.user_id = ").push_bind(user_id.clone());
        }
        push_range(&mut qb, "a.created_at", &filter.range);
        qb.push(" ORDER BY a.created_at DESC, a.rowid DESC LIMIT ")
            .push_bind(filter.limit.clamp(1, 1000));

        let rows = qb
            .build_query_as::<ActivityLog>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Total number of rows (diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{test_db, test_user};
    use koperasi_core::{ActivityAction, Role};

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let repo = db.activity();

        repo.append(&NewActivity::anonymous(
            Module::Auth,
            ActivityAction::LoginFailed,
            "Failed login for 'ghost'",
        ))
        .await
        .unwrap();
        repo.append(&NewActivity::new(
            &admin.id,
            Module::Financial,
            ActivityAction::Export,
            "Exported ledger",
        ))
        .await
        .unwrap();

        let all = repo.list(&ActivityFilter::default()).await.unwrap();
        assert_eq!(all[0].action, ActivityAction::Export);
        assert_eq!(all[0].username.as_deref(), Some("admin1"));

        let auth_only = repo
            .list(&ActivityFilter {
                module: Some(Module::Auth),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(auth_only.len(), 1);
        assert_eq!(auth_only[0].user_id, None);
    }

    #[tokio::test]
    async fn test_rows_cannot_be_changed() {
        let db = test_db().await;
        db.activity()
            .append(&NewActivity::anonymous(
                Module::Auth,
                ActivityAction::LoginFailed,
                "x",
            ))
            .await
            .unwrap();

        assert!(sqlx::query("UPDATE activity_logs SET description = 'y'")
            .execute(db.pool())
            .await
            .is_err());
        assert!(sqlx::query("DELETE FROM activity_logs")
            .execute(db.pool())
            .await
            .is_err());
    }
}
