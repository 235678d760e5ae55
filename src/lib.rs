pub mod api;
pub mod domain;
pub mod models;
pub mod platform;
pub mod routes;
pub mod schema;

use axum::Router;

use crate::platform::{app_state::AppState, swagger};

/// Assembles the full application: API routes plus Swagger UI.
pub fn build_app(state: AppState) -> Router {
    let (router, mut openapi) = routes::routes_with_openapi(state.clone()).split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Atelier OrderService API")
        .version("1.0.0")
        .build();

    router
        .merge(swagger::create_swagger_ui(openapi))
        .with_state(state)
}
