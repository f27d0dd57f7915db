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
    dto::{
        orders::{OrderLineRequest, OrderList, OrderWithItems, PayOrderRequest, PlaceOrderRequest},
        products::{
            AdminProductList, AdminProductPatch, CatalogList, CreateProductRequest,
            SellerProductList, UpdateMyProductRequest,
        },
        sellers::{ProductCounts, SellerDetail, SellerList, SellerOverview, SweepOutcome,
                  UpdateSellerRequest},
    },
    models::{AdminProduct, CatalogProduct, Order, OrderItem, SellerProduct},
    response::{ApiResponse, Meta},
    routes::{admin, cron, health, orders, params, products, seller},
    visibility::VisibilityState,
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
        products::list_products,
        products::get_product,
        seller::list_my_products,
        seller::create_product,
        seller::update_product,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::pay_order,
        admin::list_all_products,
        admin::patch_product,
        admin::delete_product,
        admin::list_sellers,
        admin::update_seller,
        admin::list_all_orders,
        admin::update_order_status,
        cron::subscription_sweep
    ),
    components(
        schemas(
            VisibilityState,
            CatalogProduct,
            SellerProduct,
            AdminProduct,
            Order,
            OrderItem,
            CatalogList,
            SellerProductList,
            AdminProductList,
            CreateProductRequest,
            UpdateMyProductRequest,
            AdminProductPatch,
            SellerList,
            SellerOverview,
            SellerDetail,
            ProductCounts,
            UpdateSellerRequest,
            SweepOutcome,
            OrderLineRequest,
            PlaceOrderRequest,
            PayOrderRequest,
            OrderWithItems,
            OrderList,
            admin::UpdateOrderStatusRequest,
            params::Pagination,
            params::CatalogQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<CatalogProduct>,
            ApiResponse<CatalogList>,
            ApiResponse<SellerProductList>,
            ApiResponse<AdminProductList>,
            ApiResponse<SellerList>,
            ApiResponse<SellerDetail>,
            ApiResponse<SweepOutcome>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Buyer-facing product listing"),
        (name = "Seller", description = "Seller self-service"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin management endpoints"),
        (name = "Cron", description = "Scheduler entry points"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
