use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::roles::Role,
    models::{PublicUser, UpdateUserEntity, UserEntity},
    platform::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::{AuthUser, hash_password},
        extractors::AppJson,
        guards, middleware,
    },
    schema::users,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_users))
            .routes(utoipa_axum::routes!(get_me, update_me))
            .routes(utoipa_axum::routes!(update_user, delete_user))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::authorization,
            )),
    )
}

const DUPLICATE_EMAIL: &str = "Email is already in use";

fn non_blank(value: Option<String>, field: &str) -> Result<Option<String>, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(AppError::BadRequest(format!("{} cannot be empty", field))),
        other => Ok(other),
    }
}

#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum Profile {
    Stored(PublicUser),
    /// Built-in accounts have no record; their session claims are returned instead.
    Builtin(AuthUser),
}

#[derive(Serialize, ToSchema)]
pub struct ProfileRes {
    pub user: Profile,
}

#[derive(Serialize, ToSchema)]
pub struct UserRes {
    pub user: PublicUser,
}

#[derive(Serialize, ToSchema)]
pub struct UsersRes {
    pub count: usize,
    pub users: Vec<PublicUser>,
}

/// Fetch the caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Own profile", body = ProfileRes)
    )
)]
async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let Some(user_id) = auth.id else {
        return Ok(StdResponse::ok(
            ProfileRes {
                user: Profile::Builtin(auth),
            },
            "Get profile successfully",
        ));
    };

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table
        .find(user_id)
        .select(UserEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get user")?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(StdResponse::ok(
        ProfileRes {
            user: Profile::Stored(user.into()),
        },
        "Get profile successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Update the caller's own name, email, phone or password.
#[utoipa::path(
    put,
    path = "/me",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Profile updated", body = UserRes)
    )
)]
async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<UpdateProfileReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;

    let mut changes = UpdateUserEntity {
        name: non_blank(body.name, "Name")?,
        email: non_blank(body.email, "Email")?.map(|e| e.to_lowercase()),
        phone: non_blank(body.phone, "Phone")?,
        password: None,
        role: None,
    };
    if changes.email.as_deref().is_some_and(|email| !email.contains('@')) {
        return Err(AppError::BadRequest("Email address is invalid".into()));
    }
    if let Some(password) = body.password.filter(|p| !p.is_empty()) {
        changes.password = Some(hash_password(&password).await?);
    }
    if changes.name.is_none()
        && changes.email.is_none()
        && changes.phone.is_none()
        && changes.password.is_none()
    {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    if let Some(email) = &changes.email {
        let taken: i64 = users::table
            .filter(users::email.eq(email))
            .filter(users::id.ne(user_id))
            .count()
            .get_result(conn)
            .await
            .context("Failed to check email")?;
        if taken > 0 {
            return Err(AppError::Conflict(DUPLICATE_EMAIL.into()));
        }
    }

    let user: UserEntity = diesel::update(users::table.find(user_id))
        .set(&changes)
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| AppError::from_insert(err, DUPLICATE_EMAIL))?;

    Ok(StdResponse::ok(
        UserRes { user: user.into() },
        "Profile updated successfully",
    ))
}

#[derive(Deserialize, IntoParams)]
pub struct UsersQuery {
    /// Only users with this role code.
    pub role: Option<i32>,
}

/// List every persisted user. Built-in accounts never appear here.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    params(UsersQuery),
    responses(
        (status = 200, description = "List users", body = UsersRes)
    )
)]
async fn get_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut statement = users::table
        .select(UserEntity::as_select())
        .order_by(users::created_at.desc())
        .into_boxed();
    if let Some(role) = query.role {
        statement = statement.filter(users::role.eq(role));
    }

    let users: Vec<PublicUser> = statement
        .load::<UserEntity>(conn)
        .await
        .context("Failed to get users")?
        .into_iter()
        .map(PublicUser::from)
        .collect();

    Ok(StdResponse::ok(
        UsersRes {
            count: users.len(),
            users,
        },
        "Get users successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct AdminUpdateUserReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<i32>,
    /// New password; the old one is not required.
    pub password: Option<String>,
}

/// Change a user's details or role, or reset their password.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "User ID to update")
    ),
    request_body = AdminUpdateUserReq,
    responses(
        (status = 200, description = "User updated", body = UserRes)
    )
)]
async fn update_user(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<AdminUpdateUserReq>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    if body.role.is_some_and(|role| Role::from_code(role).is_none()) {
        return Err(AppError::BadRequest(
            "Role must be 1 (designer), 2 (buyer) or 3 (delivery)".into(),
        ));
    }

    let mut changes = UpdateUserEntity {
        name: non_blank(body.name, "Name")?,
        email: non_blank(body.email, "Email")?.map(|e| e.to_lowercase()),
        phone: non_blank(body.phone, "Phone")?,
        password: None,
        role: body.role,
    };
    if let Some(password) = body.password.filter(|p| !p.is_empty()) {
        changes.password = Some(hash_password(&password).await?);
    }
    if changes.name.is_none()
        && changes.email.is_none()
        && changes.phone.is_none()
        && changes.password.is_none()
        && changes.role.is_none()
    {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = diesel::update(users::table.find(id))
        .set(&changes)
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .map_err(|err| AppError::from_insert(err, DUPLICATE_EMAIL))?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    tracing::info!(user_id = id, by = %auth.email, "User updated");

    Ok(StdResponse::ok(
        UserRes { user: user.into() },
        "User updated successfully",
    ))
}

/// Delete a user. Their orders and feedback are left in place.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "User ID to delete")
    ),
    responses(
        (status = 200, description = "User deleted", body = UserRes)
    )
)]
async fn delete_user(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = diesel::delete(users::table.find(id))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to delete user")?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    tracing::info!(user_id = id, by = %auth.email, "User deleted");

    Ok(StdResponse::ok(
        UserRes { user: user.into() },
        "User deleted successfully",
    ))
}
