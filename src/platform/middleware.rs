use axum::{
    RequestPartsExt,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::platform::{app_error::AppError, app_state::AppState, auth::TokenService};

/// Rejects requests without a valid bearer token and attaches the session's
/// `AuthUser` (and the full `SessionClaims`) as request extensions.
pub async fn authorization(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::Unauthorized("Access token required".into()))?;

    let claims = TokenService::new(&state.config.auth).verify(bearer.token())?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(claims.user.clone());
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
