use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Select,
};
use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    entity,
    error::{ProductError, ProductResult},
    models::{NewProduct, Product},
    repository::ProductRepository,
};

/// PostgreSQL implementation of ProductRepository backed by SeaORM
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn active() -> Select<entity::Entity> {
        entity::Entity::find()
            .filter(entity::Column::Active.eq(true))
            .order_by_asc(entity::Column::Id)
    }

    async fn fetch(&self, query: Select<entity::Entity>) -> ProductResult<Vec<Product>> {
        let models = query.all(&self.db).await.map_err(db_error)?;
        Ok(models.into_iter().map(Product::from).collect())
    }
}

fn db_error(e: DbErr) -> ProductError {
    ProductError::Database(format!("Database error: {}", e))
}

/// Escape `LIKE` metacharacters so the fragment matches literally.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn insert(&self, product: NewProduct) -> ProductResult<Product> {
        let now = self.clock.now().into();
        let model = entity::ActiveModel::for_insert(product, now)
            .insert(&self.db)
            .await
            .map_err(db_error)?;

        tracing::info!(product_id = model.id, "Inserted product");
        Ok(model.into())
    }

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let model = entity::Entity::find_by_id(id)
            .filter(entity::Column::Active.eq(true))
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(model.map(Product::from))
    }

    async fn find_all(&self) -> ProductResult<Vec<Product>> {
        self.fetch(Self::active()).await
    }

    async fn find_by_name_contains(&self, fragment: &str) -> ProductResult<Vec<Product>> {
        let pattern = format!("%{}%", escape_like(fragment));
        let query = Self::active().filter(Expr::cust_with_values(
            r"LOWER(name) LIKE LOWER($1) ESCAPE '\'",
            [pattern],
        ));

        self.fetch(query).await
    }

    async fn find_by_category(&self, category: &str) -> ProductResult<Vec<Product>> {
        self.fetch(Self::active().filter(entity::Column::Category.eq(category)))
            .await
    }

    async fn find_low_stock(&self) -> ProductResult<Vec<Product>> {
        self.fetch(Self::active().filter(Expr::cust("stock <= minimum_stock")))
            .await
    }

    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let found = Self::active()
            .filter(Expr::cust_with_values("LOWER(name) = LOWER($1)", [name]))
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(found.is_some())
    }

    async fn update(&self, product: Product) -> ProductResult<Product> {
        let id = product.id;
        let now = self.clock.now().into();

        let model = entity::ActiveModel::for_update(product, now)
            .update(&self.db)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => ProductError::NotFound(id),
                other => db_error(other),
            })?;

        tracing::info!(product_id = id, active = model.active, "Updated product");
        Ok(model.into())
    }

    async fn find_by_id_any(&self, id: i64) -> ProductResult<Option<Product>> {
        let model = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(model.map(Product::from))
    }

    async fn delete_all(&self) -> ProductResult<u64> {
        let result = entity::Entity::delete_many()
            .exec(&self.db)
            .await
            .map_err(db_error)?;

        tracing::warn!(rows = result.rows_affected, "Purged products table");
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

    fn model(id: i64, name: &str) -> entity::Model {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        entity::Model {
            id,
            name: name.to_string(),
            description: None,
            price: Decimal::new(50, 2),
            stock: 100,
            minimum_stock: 20,
            category: Some("hardware".to_string()),
            active: true,
            created_at: at.into(),
            updated_at: at.into(),
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), r"100\%");
        assert_eq!(escape_like("a_b"), r"a\_b");
        assert_eq!(escape_like(r"c:\tmp"), r"c:\\tmp");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_find_by_id_maps_model() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(1, "Bolt")]])
            .into_connection();
        let repo = PgProductRepository::new(db);

        let product = repo.find_by_id(1).await.unwrap().unwrap();

        assert_eq!(product.id, 1);
        assert_eq!(product.name, "Bolt");
        assert_eq!(product.price, Decimal::new(50, 2));
        assert!(product.active);
    }

    #[tokio::test]
    async fn test_find_by_name_contains_folds_case_in_sql_and_escapes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(1, "100% Cotton")]])
            .into_connection();
        let repo = PgProductRepository::new(db.clone());

        let found = repo.find_by_name_contains("100% COT").await.unwrap();
        assert_eq!(found.len(), 1);

        let log = db.into_transaction_log();
        let sql = format!("{:?}", log);
        assert!(
            sql.contains("LOWER(name) LIKE LOWER($1)"),
            "unexpected query: {sql}"
        );
        assert!(sql.contains(r"%100\\% COT%"), "unexpected pattern: {sql}");
    }

    #[tokio::test]
    async fn test_exists_by_name_false_when_no_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<entity::Model>::new()])
            .into_connection();
        let repo = PgProductRepository::new(db.clone());

        assert!(!repo.exists_by_name("Bolt").await.unwrap());

        let sql = format!("{:?}", db.into_transaction_log());
        assert!(
            sql.contains("LOWER(name) = LOWER($1)"),
            "unexpected query: {sql}"
        );
        assert!(sql.contains("\"Bolt\""), "unexpected value: {sql}");
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<entity::Model>::new()])
            .into_connection();
        let repo = PgProductRepository::new(db);

        let mut product: Product = model(7, "Bolt").into();
        product.stock = 1;

        let err = repo.update(product).await.unwrap_err();
        assert!(matches!(err, ProductError::NotFound(7)));
    }

    #[tokio::test]
    async fn test_insert_stamps_clock_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(1, "Bolt")]])
            .into_connection();
        let repo = PgProductRepository::with_clock(db.clone(), Arc::new(FixedClock::new(at)));

        let created = repo
            .insert(NewProduct {
                name: "Bolt".to_string(),
                description: None,
                price: Decimal::new(50, 2),
                stock: 100,
                minimum_stock: 20,
                category: Some("hardware".to_string()),
                active: true,
            })
            .await
            .unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.created_at, at);
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_reports_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();
        let repo = PgProductRepository::new(db.clone());

        assert_eq!(repo.delete_all().await.unwrap(), 3);
        assert_eq!(
            db.into_transaction_log(),
            vec![Transaction::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"DELETE FROM "products""#,
                []
            )]
        );
    }
}
