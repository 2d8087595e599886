use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::{ProductError, ProductResult};

/// Largest accepted price, exclusive: eight integer digits.
const PRICE_LIMIT: i64 = 100_000_000;

/// Fractional digits of a stored price, matching the `DECIMAL(10,2)` column.
const PRICE_SCALE: u32 = 2;

/// Bring a validated price to the stored scale, so `0.5` and `1.50000`
/// become `0.50` and `1.50`.
fn to_stored_price(mut price: Decimal) -> Decimal {
    price.rescale(PRICE_SCALE);
    price
}

/// Product record as persisted by a [`ProductRepository`](crate::repository::ProductRepository)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Store-assigned identifier
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// On-hand quantity, never negative
    pub stock: i32,
    /// Reorder threshold
    pub minimum_stock: i32,
    pub category: Option<String>,
    /// `false` once soft-deleted
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn has_sufficient_stock(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }

    /// Take `quantity` units out of stock.
    ///
    /// A negative quantity is rejected like an oversized one. Leaves
    /// `updated_at` alone; the store refreshes it when the record is persisted.
    pub fn reduce_stock(&mut self, quantity: i32) -> ProductResult<()> {
        if quantity < 0 || !self.has_sufficient_stock(quantity) {
            return Err(ProductError::InsufficientStock {
                available: self.stock,
                requested: quantity,
            });
        }

        self.stock -= quantity;
        Ok(())
    }

    pub fn needs_restock(&self) -> bool {
        self.stock <= self.minimum_stock
    }

    /// Overwrite every mutable field from `request`, absent optionals included.
    pub fn apply_request(&mut self, request: ProductRequest) {
        self.name = request.name;
        self.description = request.description;
        self.price = to_stored_price(request.price);
        self.stock = request.stock;
        self.minimum_stock = request.minimum_stock;
        self.category = request.category;
    }
}

/// Record that has not been stored yet: no id, no timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub minimum_stock: i32,
    pub category: Option<String>,
    pub active: bool,
}

impl From<ProductRequest> for NewProduct {
    fn from(request: ProductRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: to_stored_price(request.price),
            stock: request.stock,
            minimum_stock: request.minimum_stock,
            category: request.category,
            active: true,
        }
    }
}

/// Body of create and update requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductRequest {
    #[validate(
        length(
            min = 3,
            max = 100,
            message = "name must be between 3 and 100 characters"
        ),
        custom(function = "validate_not_blank")
    )]
    #[schema(example = "Bolt")]
    pub name: String,

    #[validate(length(
        max = 500,
        message = "description must be at most 500 characters"
    ))]
    #[serde(default)]
    pub description: Option<String>,

    /// Positive, at most 8 integer and 2 fractional digits. Accepted as a JSON number or string.
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = String, example = "0.50")]
    pub price: Decimal,

    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i32,

    #[validate(range(min = 0, message = "minimum_stock cannot be negative"))]
    pub minimum_stock: i32,

    #[validate(length(
        max = 50,
        message = "category must be at most 50 characters"
    ))]
    #[serde(default)]
    pub category: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(
            ValidationError::new("blank").with_message(Cow::Borrowed("name must not be blank")),
        );
    }
    Ok(())
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::new("price_positive")
            .with_message(Cow::Borrowed("price must be greater than zero")));
    }

    if price.normalize().scale() > 2 {
        return Err(ValidationError::new("price_digits")
            .with_message(Cow::Borrowed("price allows at most 2 decimal places")));
    }

    if price.trunc() >= Decimal::from(PRICE_LIMIT) {
        return Err(ValidationError::new("price_digits")
            .with_message(Cow::Borrowed("price allows at most 8 integer digits")));
    }

    Ok(())
}

/// Read-only projection returned by every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "0.50")]
    pub price: Decimal,
    pub stock: i32,
    pub minimum_stock: i32,
    pub category: Option<String>,
    /// `stock <= minimum_stock`
    pub needs_restock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let needs_restock = product.needs_restock();
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            minimum_stock: product.minimum_stock,
            category: product.category,
            needs_restock,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Query string of the name search endpoint
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring; absent or empty matches every active product
    pub name: Option<String>,
}
