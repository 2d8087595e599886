use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product with id {0} not found")]
    NotFound(i64),

    #[error("Product with name '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Database error: {0}")]
    Database(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(_) => AppError::NotFound(err.to_string()),
            ProductError::DuplicateName(_) => AppError::Conflict(err.to_string()),
            ProductError::Validation(errors) => AppError::ValidationError(errors),
            ProductError::InsufficientStock { .. } => {
                AppError::UnprocessableEntity(err.to_string())
            }
            ProductError::Database(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<sea_orm::DbErr> for ProductError {
    fn from(err: sea_orm::DbErr) -> Self {
        ProductError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ProductError::NotFound(9), StatusCode::NOT_FOUND),
            (ProductError::DuplicateName("Bolt".into()), StatusCode::CONFLICT),
            (
                ProductError::Validation(ValidationErrors::new()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProductError::InsufficientStock {
                    available: 1,
                    requested: 2,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ProductError::Database("connection reset".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_messages_identify_the_resource() {
        assert_eq!(ProductError::NotFound(42).to_string(), "Product with id 42 not found");
        assert_eq!(
            ProductError::DuplicateName("Bolt".into()).to_string(),
            "Product with name 'Bolt' already exists"
        );
    }
}
