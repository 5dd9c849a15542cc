//! Public catalog routes.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use sweetshop_core::ProductId;

use crate::app::dto::{self, ProductResponse};
use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/sweets", get(list_products))
        .route("/sweets/:id", get(get_product))
}

/// GET /sweets
pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.storefront.products().await {
        Ok(products) => {
            Json(products.iter().map(ProductResponse::from).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::storefront_error_to_response(e),
    }
}

/// GET /sweets/:id
pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storefront.product(product_id).await {
        Ok(product) => Json(ProductResponse::from(&product)).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}
