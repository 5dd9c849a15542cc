use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use sweetshop_auth::Permission;
use sweetshop_core::ProductId;

use crate::app::dto::{self, OrderResponse, PlaceOrderRequest};
use crate::app::extract::ApiJson;
use crate::app::routes::common::CmdAuth;
use crate::app::{errors, services::AppServices};
use crate::authz::authorize_command;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/order", post(place_order))
        .route("/orders", get(list_orders))
}

/// POST /order - buy now, one product
pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(body, [Permission::ORDERS_PLACE]);
    if let Err(e) = authorize_command(&principal, &cmd) {
        return errors::forbidden(e);
    }
    let body = cmd.inner;

    let product_id: ProductId = match dto::parse_id(&body.product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .storefront
        .place_order(principal.user_id(), product_id, body.quantity)
        .await
    {
        Ok(order) => (StatusCode::CREATED, Json(OrderResponse::from(&order))).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}

/// GET /orders - the caller's orders, newest first
pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let cmd = CmdAuth::new((), [Permission::ORDERS_READ]);
    if let Err(e) = authorize_command(&principal, &cmd) {
        return errors::forbidden(e);
    }

    match services.storefront.orders_for(principal.user_id()).await {
        Ok(orders) => Json(orders.iter().map(OrderResponse::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}
