use crate::{
    AppState,
    handler::{
        admin::admin_handler, auth::auth_handler, favorite::favorite_handler,
        order::order_handler, product::product_handler, review::review_handler,
        upload::upload_handler,
    },
};
use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler(app_state.clone()))
        .nest("/product", product_handler(app_state.clone()))
        .nest("/order", order_handler(app_state.clone()))
        .nest("/review", review_handler(app_state.clone()))
        .nest("/favorite", favorite_handler(app_state.clone()))
        .nest("/admin", admin_handler(app_state.clone()))
        .nest("/upload", upload_handler(app_state.clone()));

    Router::new()
        .nest("/api", api_route)
        .nest_service("/uploads", ServeDir::new(&app_state.env.upload_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
