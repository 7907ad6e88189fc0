//! # Supplier Repository
//!
//! Goods suppliers. Listing carries the number of products each supplier
//! provides; deletion is refused while products or ledger rows reference it.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use koperasi_core::input::SupplierInput;
use koperasi_core::validation::validate_search_query;
use koperasi_core::{ActivityAction, CoreError, Module, NewActivity, Supplier};

use super::activity::record;
use super::clean;
use crate::error::{DbError, DbResult};

const SUPPLIER_SELECT: &str = r#"
    SELECT
        s.id,
        s.name,
        s.contact_person,
        s.phone,
        s.email,
        s.address,
        (SELECT COUNT(*) FROM products p WHERE p.supplier_id = s.id) AS product_count,
        s.created_at,
        s.updated_at
    FROM suppliers s
    WHERE 1 = 1
"#;

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Lists suppliers, optionally filtered by name or contact person.
    pub async fn list(&self, search: Option<&str>) -> DbResult<Vec<Supplier>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SUPPLIER_SELECT);
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", validate_search_query(search).map_err(CoreError::from)?);
            qb.push(" AND (s.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR s.contact_person LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY s.name COLLATE NOCASE");

        let suppliers = qb.build_query_as::<Supplier>().fetch_all(&self.pool).await?;
        Ok(suppliers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!("{} AND s.id = ?1", SUPPLIER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    pub async fn create(&self, input: &SupplierInput, actor_id: &str) -> DbResult<Supplier> {
        input.validate()?;

        let id = Uuid::new_v4().to_string();
        let name = input.name.trim().to_string();
        let now = Utc::now();

        debug!(name = %name, "Creating supplier");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_person, phone, email, address, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(clean(input.contact_person.as_deref()))
        .bind(clean(input.phone.as_deref()))
        .bind(clean(input.email.as_deref()))
        .bind(clean(input.address.as_deref()))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Suppliers,
                ActivityAction::Create,
                format!("Created supplier '{}'", name),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(supplier_id = %id, "Supplier created");
        self.require(&id).await
    }

    pub async fn update(
        &self,
        id: &str,
        input: &SupplierInput,
        actor_id: &str,
    ) -> DbResult<Supplier> {
        input.validate()?;

        let name = input.name.trim().to_string();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = ?2, contact_person = ?3, phone = ?4, email = ?5, address = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(clean(input.contact_person.as_deref()))
        .bind(clean(input.phone.as_deref()))
        .bind(clean(input.email.as_deref()))
        .bind(clean(input.address.as_deref()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Suppliers,
                ActivityAction::Update,
                format!("Updated supplier '{}'", name),
            ),
        )
        .await?;

        tx.commit().await?;
        self.require(id).await
    }

    /// Deletes a supplier nothing references.
    pub async fn delete(&self, id: &str, actor_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let name: Option<String> = sqlx::query_scalar("SELECT name FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(name) = name else {
            return Err(DbError::not_found("Supplier", id));
        };

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE supplier_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if products > 0 {
            return Err(referenced(id, format!("{} product(s) are supplied by it", products)));
        }

        let transactions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE supplier_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if transactions > 0 {
            return Err(referenced(
                id,
                format!("{} ledger transaction(s) reference it", transactions),
            ));
        }

        sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Suppliers,
                ActivityAction::Delete,
                format!("Deleted supplier '{}'", name),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }

    async fn require(&self, id: &str) -> DbResult<Supplier> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }
}

fn referenced(id: &str, reason: String) -> DbError {
    CoreError::ReferentialIntegrityViolation {
        entity: "Supplier".to_string(),
        id: id.to_string(),
        reason,
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::sample_product;
    use crate::repository::testing::{test_db, test_user};
    use koperasi_core::Role;

    fn supplier_input(name: &str) -> SupplierInput {
        SupplierInput {
            name: name.to_string(),
            contact_person: Some("Pak Budi".to_string()),
            phone: Some("0812-3456-7890".to_string()),
            email: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_list_carries_product_count() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let supplier = db
            .suppliers()
            .create(&supplier_input("CV Sumber Tani"), &admin.id)
            .await
            .unwrap();
        db.suppliers()
            .create(&supplier_input("UD Makmur"), &admin.id)
            .await
            .unwrap();

        for sku in ["BRS-5KG", "BRS-10KG"] {
            let mut product = sample_product(sku, 5);
            product.supplier_id = Some(supplier.id.clone());
            db.products().create(&product, &admin.id).await.unwrap();
        }

        let listed = db.suppliers().list(None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "CV Sumber Tani");
        assert_eq!(listed[0].product_count, 2);
        assert_eq!(listed[1].product_count, 0);

        let searched = db.suppliers().list(Some("makmur")).await.unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_refused_while_supplying() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let supplier = db
            .suppliers()
            .create(&supplier_input("CV Sumber Tani"), &admin.id)
            .await
            .unwrap();

        let mut product = sample_product("GULA-1KG", 5);
        product.supplier_id = Some(supplier.id.clone());
        db.products().create(&product, &admin.id).await.unwrap();

        let err = db.suppliers().delete(&supplier.id, &admin.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::ReferentialIntegrityViolation { .. })
        ));
        assert!(db.suppliers().get_by_id(&supplier.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_unreferenced() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let supplier = db
            .suppliers()
            .create(&supplier_input("UD Makmur"), &admin.id)
            .await
            .unwrap();

        db.suppliers().delete(&supplier.id, &admin.id).await.unwrap();
        assert!(db.suppliers().get_by_id(&supplier.id).await.unwrap().is_none());

        let err = db.suppliers().delete(&supplier.id, &admin.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
