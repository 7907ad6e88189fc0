//! # Category Repository
//!
//! Product categories. A category cannot be deleted while any product
//! (active or not) still points at it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use koperasi_core::input::CategoryInput;
use koperasi_core::{ActivityAction, Category, CoreError, Module, NewActivity};

use super::activity::record;
use super::clean;
use crate::error::{DbError, DbResult};

const CATEGORY_SELECT: &str = r#"
    SELECT
        c.id,
        c.name,
        c.description,
        (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count,
        c.created_at,
        c.updated_at
    FROM categories c
"#;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let sql = format!("{} ORDER BY c.name COLLATE NOCASE", CATEGORY_SELECT);
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let sql = format!("{} WHERE c.id = ?1", CATEGORY_SELECT);
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn create(&self, input: &CategoryInput, actor_id: &str) -> DbResult<Category> {
        input.validate()?;

        let id = Uuid::new_v4().to_string();
        let name = input.name.trim().to_string();
        let now = Utc::now();

        debug!(name = %name, "Creating category");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(clean(input.description.as_deref()))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&name))?;

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Inventory,
                ActivityAction::Create,
                format!("Created category '{}'", name),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(category_id = %id, "Category created");
        self.require(&id).await
    }

    pub async fn update(
        &self,
        id: &str,
        input: &CategoryInput,
        actor_id: &str,
    ) -> DbResult<Category> {
        input.validate()?;

        let name = input.name.trim().to_string();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE categories SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(clean(input.description.as_deref()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Inventory,
                ActivityAction::Update,
                format!("Updated category '{}'", name),
            ),
        )
        .await?;

        tx.commit().await?;
        self.require(id).await
    }

    /// Deletes a category that no product references.
    pub async fn delete(&self, id: &str, actor_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let name: Option<String> = sqlx::query_scalar("SELECT name FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(name) = name else {
            return Err(DbError::not_found("Category", id));
        };

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if products > 0 {
            return Err(CoreError::ReferentialIntegrityViolation {
                entity: "Category".to_string(),
                id: id.to_string(),
                reason: format!("{} product(s) still use this category", products),
            }
            .into());
        }

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Inventory,
                ActivityAction::Delete,
                format!("Deleted category '{}'", name),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    async fn require(&self, id: &str) -> DbResult<Category> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
