use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::error::{ProductError, ProductResult};
use crate::models::{NewProduct, Product};

/// Repository trait for Product persistence
///
/// Every lookup only sees active products unless its name says otherwise.
/// List results are ordered by ascending id. `insert` and `update` stamp
/// timestamps from the repository's clock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Store a new product and assign its id
    async fn insert(&self, product: NewProduct) -> ProductResult<Product>;

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>>;

    async fn find_all(&self) -> ProductResult<Vec<Product>>;

    /// Case-insensitive substring match on the name
    async fn find_by_name_contains(&self, fragment: &str) -> ProductResult<Vec<Product>>;

    /// Exact category match
    async fn find_by_category(&self, category: &str) -> ProductResult<Vec<Product>>;

    /// Products with `stock <= minimum_stock`
    async fn find_low_stock(&self) -> ProductResult<Vec<Product>>;

    /// Case-insensitive exact name match
    async fn exists_by_name(&self, name: &str) -> ProductResult<bool>;

    /// Persist every field except `created_at` and refresh `updated_at`.
    ///
    /// Works on inactive products too; fails with `NotFound` if the id is absent.
    async fn update(&self, product: Product) -> ProductResult<Product>;

    /// Lookup that ignores the active flag
    async fn find_by_id_any(&self, id: i64) -> ProductResult<Option<Product>>;

    /// Remove every product, active or not. Returns the number removed.
    async fn delete_all(&self) -> ProductResult<u64>;
}

#[derive(Debug, Default)]
struct Store {
    products: BTreeMap<i64, Product>,
    last_id: i64,
}

impl Store {
    fn active(&self) -> impl Iterator<Item = &Product> {
        self.products.values().filter(|p| p.active)
    }
}

/// In-memory implementation of ProductRepository (for development/testing)
///
/// Ids start at 1 and are never reused, even after `delete_all`.
#[derive(Debug, Clone)]
pub struct InMemoryProductRepository {
    store: Arc<RwLock<Store>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            clock,
        }
    }

    async fn collect_active(&self, predicate: impl Fn(&Product) -> bool) -> Vec<Product> {
        let store = self.store.read().await;
        store.active().filter(|p| predicate(p)).cloned().collect()
    }
}

impl Default for InMemoryProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, product: NewProduct) -> ProductResult<Product> {
        let mut store = self.store.write().await;
        let now = self.clock.now();

        store.last_id += 1;
        let product = Product {
            id: store.last_id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            minimum_stock: product.minimum_stock,
            category: product.category,
            active: product.active,
            created_at: now,
            updated_at: now,
        };
        store.products.insert(product.id, product.clone());

        Ok(product)
    }

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.get(&id).filter(|p| p.active).cloned())
    }

    async fn find_all(&self) -> ProductResult<Vec<Product>> {
        Ok(self.collect_active(|_| true).await)
    }

    async fn find_by_name_contains(&self, fragment: &str) -> ProductResult<Vec<Product>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .collect_active(|p| p.name.to_lowercase().contains(&needle))
            .await)
    }

    async fn find_by_category(&self, category: &str) -> ProductResult<Vec<Product>> {
        Ok(self
            .collect_active(|p| p.category.as_deref() == Some(category))
            .await)
    }

    async fn find_low_stock(&self) -> ProductResult<Vec<Product>> {
        Ok(self.collect_active(Product::needs_restock).await)
    }

    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let name = name.to_lowercase();
        let store = self.store.read().await;
        Ok(store.active().any(|p| p.name.to_lowercase() == name))
    }

    async fn update(&self, mut product: Product) -> ProductResult<Product> {
        let mut store = self.store.write().await;
        let existing = store
            .products
            .get_mut(&product.id)
            .ok_or(ProductError::NotFound(product.id))?;

        product.created_at = existing.created_at;
        product.updated_at = self.clock.now();
        *existing = product.clone();

        Ok(product)
    }

    async fn find_by_id_any(&self, id: i64) -> ProductResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.get(&id).cloned())
    }

    async fn delete_all(&self) -> ProductResult<u64> {
        let mut store = self.store.write().await;
        let removed = store.products.len() as u64;
        store.products.clear();
        Ok(removed)
    }
}
