use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::{NewProduct, Product};

/// Sea-ORM Entity for the products table
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub stock: i32,
    pub minimum_stock: i32,
    pub category: Option<String>,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            minimum_stock: model.minimum_stock,
            category: model.category,
            active: model.active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl ActiveModel {
    /// Insert model for `product`; the id comes from the BIGSERIAL sequence.
    pub fn for_insert(product: NewProduct, now: DateTimeWithTimeZone) -> Self {
        Self {
            id: NotSet,
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            stock: Set(product.stock),
            minimum_stock: Set(product.minimum_stock),
            category: Set(product.category),
            active: Set(product.active),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    /// Update model for `product`. `created_at` is left untouched.
    pub fn for_update(product: Product, now: DateTimeWithTimeZone) -> Self {
        Self {
            id: Set(product.id),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            stock: Set(product.stock),
            minimum_stock: Set(product.minimum_stock),
            category: Set(product.category),
            active: Set(product.active),
            created_at: NotSet,
            updated_at: Set(now),
        }
    }
}
