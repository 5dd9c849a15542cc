//! Cart routes. Every mutation reserves or returns stock in the same
//! transaction as the cart write.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};

use sweetshop_auth::Permission;
use sweetshop_core::{CartItemId, ProductId};

use crate::app::dto::{
    self, AddToCartRequest, CartLineResponse, CartResponse, RemoveResponse, UpdateCartRequest,
};
use crate::app::extract::ApiJson;
use crate::app::routes::common::CmdAuth;
use crate::app::{errors, services::AppServices};
use crate::authz::authorize_command;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/update", put(update_quantity))
        .route("/cart/remove/:id", delete(remove_from_cart))
}

/// GET /cart - never creates a cart
pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let cmd = CmdAuth::new((), [Permission::CART_WRITE]);
    if let Err(e) = authorize_command(&principal, &cmd) {
        return errors::forbidden(e);
    }

    let cart = match services.storefront.cart(principal.user_id()).await {
        Ok(cart) => cart,
        Err(e) => return errors::storefront_error_to_response(e),
    };

    match cart {
        None => Json(CartResponse::empty()).into_response(),
        Some(cart) => match CartResponse::from_cart(&cart) {
            Ok(body) => Json(body).into_response(),
            Err(e) => errors::storefront_error_to_response(e),
        },
    }
}

/// POST /cart/add
pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(body, [Permission::CART_WRITE]);
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
        .add_to_cart(principal.user_id(), product_id, body.quantity)
        .await
    {
        Ok(line) => Json(CartLineResponse::from(&line)).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}

/// PUT /cart/update - set an absolute quantity
pub async fn update_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<UpdateCartRequest>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(body, [Permission::CART_WRITE]);
    if let Err(e) = authorize_command(&principal, &cmd) {
        return errors::forbidden(e);
    }
    let body = cmd.inner;

    let cart_item_id: CartItemId = match dto::parse_id(&body.cart_item_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .storefront
        .update_quantity(principal.user_id(), cart_item_id, body.quantity)
        .await
    {
        Ok(line) => Json(CartLineResponse::from(&line)).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}

/// DELETE /cart/remove/:id
pub async fn remove_from_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(id, [Permission::CART_WRITE]);
    if let Err(e) = authorize_command(&principal, &cmd) {
        return errors::forbidden(e);
    }

    let cart_item_id: CartItemId = match dto::parse_id(&cmd.inner) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .storefront
        .remove_from_cart(principal.user_id(), cart_item_id)
        .await
    {
        Ok(removed) => Json(RemoveResponse::from(&removed)).into_response(),
        Err(e) => errors::storefront_error_to_response(e),
    }
}
