use utoipa_axum::router::OpenApiRouter;

use crate::platform::app_state::AppState;

pub mod auth;
pub mod feedback;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod return_orders;
pub mod users;

/// Every HTTP route of the service with its OpenAPI description.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    health::routes_with_openapi()
        .merge(auth::routes_with_openapi(state.clone()))
        .merge(users::routes_with_openapi(state.clone()))
        .merge(products::routes_with_openapi(state.clone()))
        .merge(orders::routes_with_openapi(state.clone()))
        .merge(return_orders::routes_with_openapi(state.clone()))
        .merge(feedback::routes_with_openapi(state.clone()))
        .merge(payments::routes_with_openapi(state))
}
