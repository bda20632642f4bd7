use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    checkout::{
        CartLine, CheckoutOutcome, CheckoutState, DiscountType, PaymentMethod, PaymentOutcome,
        PricingResult, Voucher,
    },
    dto::{
        cart::{AddToCartRequest, CartView, UpdateCartLineRequest},
        orders::{CheckoutRequest, OrderList, OrderWithItems},
        vouchers::VoucherList,
    },
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::{admin, cart, health, orders, params, vouchers},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness_check,
        cart::view_cart,
        cart::add_to_cart,
        cart::update_cart_line,
        cart::remove_from_cart,
        vouchers::list_eligible,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::track_order,
        admin::list_orphan_orders,
        admin::update_order_status,
        admin::update_item_status
    ),
    components(
        schemas(
            Order,
            OrderItem,
            CartLine,
            CartView,
            AddToCartRequest,
            UpdateCartLineRequest,
            PricingResult,
            Voucher,
            VoucherList,
            DiscountType,
            PaymentMethod,
            PaymentOutcome,
            CheckoutState,
            CheckoutRequest,
            CheckoutOutcome,
            OrderList,
            OrderWithItems,
            admin::UpdateStatusRequest,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<VoucherList>,
            ApiResponse<CheckoutOutcome>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Order>,
            ApiResponse<OrderItem>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Vouchers", description = "Voucher endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Admin", description = "Seller and admin order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
