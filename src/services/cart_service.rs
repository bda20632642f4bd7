use chrono::Utc;
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    checkout::{Cart, CartLine, MAX_LINE_QUANTITY, pricing, vouchers::eligible_vouchers},
    dto::cart::{AddToCartRequest, CartQuery, CartView, UpdateCartLineRequest},
    entity::products::Entity as Products,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::voucher_service::load_active_vouchers,
    state::AppState,
};

pub async fn view_cart(
    state: &AppState,
    user: &AuthUser,
    query: CartQuery,
) -> AppResult<ApiResponse<CartView>> {
    let cart = state.carts.load(user.user_id);
    let view = price_cart(state, cart, query.voucher_id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    check_line_quantity(payload.quantity)?;

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;

    let mut cart = state.carts.load(user.user_id);
    if let Some(existing) = cart.lines().iter().find(|line| line.product_id == product.id) {
        check_line_quantity(existing.quantity.saturating_add(payload.quantity))?;
    }
    cart.add(CartLine {
        product_id: product.id,
        seller_id: product.seller_id,
        title: product.title,
        unit_price: product.price,
        quantity: payload.quantity,
        image_ref: product.image_ref,
    });
    state.carts.save(user.user_id, cart.clone());
    tracing::debug!(buyer_id = %user.user_id, product_id = %payload.product_id, "cart line added");

    let view = price_cart(state, cart, None).await?;
    Ok(ApiResponse::success("OK", view, None))
}

pub async fn update_line(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartLineRequest,
) -> AppResult<ApiResponse<CartView>> {
    check_line_quantity(payload.quantity)?;
    let mut cart = state.carts.load(user.user_id);
    if !cart.set_quantity(product_id, payload.quantity) {
        return Err(AppError::NotFound);
    }
    state.carts.save(user.user_id, cart.clone());

    let view = price_cart(state, cart, None).await?;
    Ok(ApiResponse::success("OK", view, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let mut cart = state.carts.load(user.user_id);
    if !cart.remove(product_id) {
        return Err(AppError::NotFound);
    }
    state.carts.save(user.user_id, cart.clone());

    let view = price_cart(state, cart, None).await?;
    Ok(ApiResponse::success("Removed from cart", view, Some(Meta::empty())))
}

fn check_line_quantity(quantity: i32) -> AppResult<()> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY} per product"
        )));
    }
    Ok(())
}

/// Prices the cart with the requested voucher when it is currently eligible;
/// an ineligible voucher id is ignored here and rejected at checkout.
async fn price_cart(state: &AppState, cart: Cart, voucher_id: Option<Uuid>) -> AppResult<CartView> {
    let voucher = match voucher_id {
        None => None,
        Some(voucher_id) => {
            let vouchers = load_active_vouchers(&state.orm).await?;
            eligible_vouchers(vouchers, Utc::now(), cart.seller_id())
                .into_iter()
                .find(|voucher| voucher.id == voucher_id)
        }
    };
    let pricing = pricing::price(cart.lines(), voucher.as_ref());

    Ok(CartView {
        item_count: cart.item_count(),
        voucher_id: voucher.map(|voucher| voucher.id),
        pricing,
        items: cart.lines().to_vec(),
    })
}
