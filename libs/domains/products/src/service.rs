//! Product Service - lifecycle rules over a [`ProductRepository`]

use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{NewProduct, Product, ProductRequest, ProductResponse};
use crate::repository::ProductRepository;

/// Product lifecycle service
///
/// Enforces name uniqueness among active products on create and existence on
/// read, update and delete. Every result is returned as a [`ProductResponse`].
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

fn project(products: Vec<Product>) -> Vec<ProductResponse> {
    products.into_iter().map(ProductResponse::from).collect()
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a product, rejecting names already used by an active product
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: ProductRequest) -> ProductResult<ProductResponse> {
        input.validate()?;

        if self.repository.exists_by_name(&input.name).await? {
            return Err(ProductError::DuplicateName(input.name));
        }

        let product = self.repository.insert(NewProduct::from(input)).await?;

        tracing::info!(product_id = product.id, "Created product");
        Ok(product.into())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i64) -> ProductResult<ProductResponse> {
        self.find_active(id).await.map(ProductResponse::from)
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self) -> ProductResult<Vec<ProductResponse>> {
        self.repository.find_all().await.map(project)
    }

    /// Replace every mutable field of an active product.
    ///
    /// The new name is not checked against other products.
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn update_product(
        &self,
        id: i64,
        input: ProductRequest,
    ) -> ProductResult<ProductResponse> {
        input.validate()?;

        let mut product = self.find_active(id).await?;
        product.apply_request(input);
        let product = self.repository.update(product).await?;

        tracing::info!(product_id = id, "Updated product");
        Ok(product.into())
    }

    /// Soft delete: the product stays stored with `active = false`.
    ///
    /// Looks the product up regardless of its active flag, so deleting an
    /// already deleted product succeeds.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> ProductResult<()> {
        let mut product = self
            .repository
            .find_by_id_any(id)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        product.active = false;
        self.repository.update(product).await?;

        tracing::info!(product_id = id, "Deactivated product");
        Ok(())
    }

    /// Case-insensitive substring search; an empty fragment matches every active product
    #[instrument(skip(self))]
    pub async fn search_by_name(&self, fragment: &str) -> ProductResult<Vec<ProductResponse>> {
        self.repository
            .find_by_name_contains(fragment)
            .await
            .map(project)
    }

    #[instrument(skip(self))]
    pub async fn list_by_category(&self, category: &str) -> ProductResult<Vec<ProductResponse>> {
        self.repository.find_by_category(category).await.map(project)
    }

    /// Active products at or below their reorder threshold
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> ProductResult<Vec<ProductResponse>> {
        self.repository.find_low_stock().await.map(project)
    }

    /// Hard-delete every product, active or not. Irreversible.
    #[instrument(skip(self))]
    pub async fn purge_all(&self) -> ProductResult<u64> {
        let removed = self.repository.delete_all().await?;
        tracing::warn!(removed, "Purged all products");
        Ok(removed)
    }

    async fn find_active(&self, id: i64) -> ProductResult<Product> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}
