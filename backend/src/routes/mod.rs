//! Route definitions for the point-of-sale API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes. Everything except login and logout needs a session.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/session", get(handlers::session))
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/customers", customer_routes())
        .nest("/purchases", purchase_routes())
        .nest("/sales", sale_routes())
        .route(
            "/inventory-movements",
            get(handlers::list_movements).post(handlers::create_movement),
        )
        .route("/inventory/report", get(handlers::inventory_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .merge(protected)
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:id/can-delete", get(handlers::can_delete_product))
        .route("/:id/reactivate", put(handlers::reactivate_product))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_categories).post(handlers::create_category))
        .route(
            "/:id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
}

fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route(
            "/:id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .delete(handlers::void_purchase),
        )
}

/// Static segments are matched before `/:id`
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/stats", get(handlers::sales_stats))
        .route("/reports", get(handlers::sales_reports))
        .route("/products", get(handlers::search_pos_products))
        .route(
            "/:id",
            get(handlers::get_sale)
                .put(handlers::update_sale)
                .delete(handlers::void_sale),
        )
}
