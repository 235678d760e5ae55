use anyhow::Context;
use axum::{Extension, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::roles::Role,
    models::{CreateUserEntity, PublicUser, UserEntity},
    platform::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::{
            AuthError, AuthUser, SessionClaims, TokenService, hash_password,
            match_builtin_account, verify_password,
        },
        extractors::AppJson,
        middleware,
    },
    schema::users,
};

/// Registration and login are public; token verification sits behind the guard.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(verify))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::authorization,
        ));

    OpenApiRouter::new()
        .nest(
            "/auth",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(login))
                .routes(utoipa_axum::routes!(register_alias))
                .merge(protected),
        )
        .routes(utoipa_axum::routes!(register))
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginRes {
    pub token: String,
    pub user: AuthUser,
}

/// Exchange email and password for a session token.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Auth"],
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = LoginRes),
        (status = 401, description = "Invalid email or password")
    )
)]
async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginReq>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AppError::BadRequest("Email and password are required".into()));
    };
    let email = email.trim().to_lowercase();
    let tokens = TokenService::new(&state.config.auth);

    if let Some(user) = match_builtin_account(&state.config.auth, &email, &password) {
        tracing::info!(role = %user.role, "Built-in account logged in");
        let token = tokens.issue(user.clone())?;
        return Ok(StdResponse::ok(LoginRes { token, user }, "Login successful"));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table
        .filter(users::email.eq(&email))
        .select(UserEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to look up user")?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&password, &user.password).await? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let role = Role::from_code(user.role)
        .with_context(|| format!("User #{} has unknown role {}", user.id, user.role))?;

    let user = AuthUser {
        id: Some(user.id),
        email: user.email,
        role,
        name: Some(user.name),
    };
    let token = tokens.issue(user.clone())?;

    tracing::info!(user_id = ?user.id, "User logged in");

    Ok(StdResponse::ok(LoginRes { token, user }, "Login successful"))
}

#[derive(Serialize, ToSchema)]
pub struct VerifyRes {
    pub user: SessionClaims,
}

/// Return the claims embedded in the presented token.
#[utoipa::path(
    get,
    path = "/verify",
    tags = ["Auth"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Token is valid", body = VerifyRes),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
async fn verify(Extension(claims): Extension<SessionClaims>) -> Result<impl IntoResponse, AppError> {
    Ok(StdResponse::ok(VerifyRes { user: claims }, "Token is valid"))
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    /// 1 = designer, 2 = buyer (default), 3 = delivery.
    pub role: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterRes {
    pub user: PublicUser,
}

impl RegisterReq {
    fn validate(self) -> Result<CreateUserEntity, AppError> {
        let field = |v: Option<String>| v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(name), Some(email), Some(phone), Some(password)) = (
            field(self.name),
            field(self.email),
            field(self.phone),
            self.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::BadRequest(
                "Name, email, phone and password are required".into(),
            ));
        };

        if !email.contains('@') {
            return Err(AppError::BadRequest("Email address is invalid".into()));
        }

        let role = self.role.unwrap_or(2);
        if Role::from_code(role).is_none() {
            return Err(AppError::BadRequest(
                "Role must be 1 (designer), 2 (buyer) or 3 (delivery)".into(),
            ));
        }

        Ok(CreateUserEntity {
            name,
            email: email.to_lowercase(),
            phone,
            password,
            role,
        })
    }
}

const DUPLICATE_EMAIL: &str = "User already exists with this email";

async fn register_user(state: AppState, body: RegisterReq) -> Result<impl IntoResponse, AppError> {
    let mut new_user = body.validate()?;

    let auth = &state.config.auth;
    if [&auth.admin.email, &auth.owner.email]
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&new_user.email))
    {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let existing: i64 = users::table
        .filter(users::email.eq(&new_user.email))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check existing users")?;
    if existing > 0 {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.into()));
    }

    new_user.password = hash_password(&new_user.password).await?;

    let user: UserEntity = diesel::insert_into(users::table)
        .values(new_user)
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| AppError::from_insert(err, DUPLICATE_EMAIL))?;

    tracing::info!(user_id = user.id, role = user.role, "User registered");

    Ok(StdResponse::ok(
        RegisterRes { user: user.into() },
        "User registered successfully",
    ))
}

/// Register a designer, buyer or delivery account.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Auth"],
    request_body = RegisterReq,
    responses(
        (status = 200, description = "Registered", body = RegisterRes),
        (status = 400, description = "Validation failed or email already taken")
    )
)]
async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterReq>,
) -> Result<impl IntoResponse, AppError> {
    register_user(state, body).await
}

/// Same as `POST /register`.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Auth"],
    request_body = RegisterReq,
    responses(
        (status = 200, description = "Registered", body = RegisterRes)
    )
)]
async fn register_alias(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterReq>,
) -> Result<impl IntoResponse, AppError> {
    register_user(state, body).await
}
