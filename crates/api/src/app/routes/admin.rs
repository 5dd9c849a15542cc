//! Admin console routes.
//!
//! Every handler requires an `admin.*` permission, which only the ADMIN role
//! holds (through the wildcard grant).

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use sweetshop_auth::Permission;
use sweetshop_core::ProductId;

use crate::app::dto::{self, OrderResponse, ProductResponse, RestockRequest};
use crate::app::extract::ApiJson;
use crate::app::routes::common::CmdAuth;
use crate::app::{errors, services::AppServices};
use crate::authz::authorize_command;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/inventory/:id/restock", post(restock))
}

/// GET /admin/orders - every order, newest first
pub async fn list_all_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let cmd = CmdAuth::new((), [Permission::ORDERS_READ_ALL]);
    if let Err(e) = authorize_command(&principal, &cmd) {
        return errors::forbidden(e);
    }

    match services.storefront.all_orders().await {
        Ok(orders) => Json(orders.iter().map(OrderResponse::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}

/// POST /admin/inventory/:id/restock
pub async fn restock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RestockRequest>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(body, [Permission::INVENTORY_RESTOCK]);
    if let Err(e) = authorize_command(&principal, &cmd) {
        return errors::forbidden(e);
    }

    let product_id: ProductId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storefront.restock(product_id, cmd.inner.quantity).await {
        Ok(product) => Json(ProductResponse::from(&product)).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}
