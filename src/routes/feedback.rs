use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::feedback::{FeedbackReq, PUBLIC_FEEDBACK_LIMIT, ValidatedFeedback},
    models::{CreateFeedbackEntity, FeedbackEntity, PublicFeedback},
    platform::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::AuthUser,
        extractors::AppJson,
        guards, middleware,
    },
    schema::feedback,
};

/// `GET /feedback/public` is open; everything else needs a session.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_all_feedback, create_feedback))
        .routes(utoipa_axum::routes!(get_my_feedback))
        .routes(utoipa_axum::routes!(get_feedback, update_feedback, delete_feedback))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::authorization,
        ));

    utoipa_axum::router::OpenApiRouter::new().nest(
        "/feedback",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_public_feedback))
            .merge(protected),
    )
}

const FEEDBACK_NOT_FOUND: &str = "Feedback not found";

impl From<ValidatedFeedback> for CreateFeedbackEntity {
    fn from(value: ValidatedFeedback) -> Self {
        Self {
            customer_name: value.customer_name,
            email: value.email,
            mobile_number: value.mobile_number,
            comment: value.feedback,
            rating: value.rating,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FeedbackRes {
    pub feedback: FeedbackEntity,
}

#[derive(Serialize, ToSchema)]
pub struct FeedbackListRes {
    pub count: usize,
    pub feedback: Vec<FeedbackEntity>,
}

impl From<Vec<FeedbackEntity>> for FeedbackListRes {
    fn from(feedback: Vec<FeedbackEntity>) -> Self {
        Self {
            count: feedback.len(),
            feedback,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PublicFeedbackRes {
    pub count: usize,
    pub feedback: Vec<PublicFeedback>,
}

/// Loads a feedback entry the actor may read or change.
async fn find_accessible(
    conn: &mut AsyncPgConnection,
    id: i32,
    actor: &AuthUser,
) -> Result<FeedbackEntity, AppError> {
    let entry: FeedbackEntity = feedback::table
        .find(id)
        .select(FeedbackEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get feedback")?
        .ok_or_else(|| AppError::NotFound(FEEDBACK_NOT_FOUND.into()))?;

    guards::require_owner_or_privileged(entry.user_id, actor)?;
    Ok(entry)
}

/// Latest feedback for display on the landing page.
#[utoipa::path(
    get,
    path = "/public",
    tags = ["Feedback"],
    responses(
        (status = 200, description = "Latest feedback", body = PublicFeedbackRes)
    )
)]
async fn get_public_feedback(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entries: Vec<PublicFeedback> = feedback::table
        .select(PublicFeedback::as_select())
        .order_by(feedback::submitted_at.desc())
        .limit(PUBLIC_FEEDBACK_LIMIT)
        .load(conn)
        .await
        .context("Failed to get public feedback")?;

    Ok(StdResponse::ok(
        PublicFeedbackRes {
            count: entries.len(),
            feedback: entries,
        },
        "Get public feedback successfully",
    ))
}

/// Submit feedback with a rating from 1 to 5.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Feedback"],
    security(("bearerAuth" = [])),
    request_body = FeedbackReq,
    responses(
        (status = 200, description = "Feedback submitted", body = FeedbackRes),
        (status = 400, description = "Missing fields or rating out of range")
    )
)]
async fn create_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<FeedbackReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;
    let new_entry: CreateFeedbackEntity = body.validate().map_err(AppError::BadRequest)?.into();

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entry: FeedbackEntity = diesel::insert_into(feedback::table)
        .values((&new_entry, feedback::user_id.eq(user_id)))
        .returning(FeedbackEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to submit feedback")?;

    tracing::info!(feedback_id = entry.id, user_id, rating = entry.rating, "Feedback submitted");

    Ok(StdResponse::ok(
        FeedbackRes { feedback: entry },
        "Feedback submitted successfully",
    ))
}

/// List all feedback.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Feedback"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List feedback", body = FeedbackListRes)
    )
)]
async fn get_all_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entries: Vec<FeedbackEntity> = feedback::table
        .select(FeedbackEntity::as_select())
        .order_by(feedback::submitted_at.desc())
        .load(conn)
        .await
        .context("Failed to get feedback")?;

    Ok(StdResponse::ok(
        FeedbackListRes::from(entries),
        "Get feedback successfully",
    ))
}

/// List the caller's own feedback.
#[utoipa::path(
    get,
    path = "/user/my",
    tags = ["Feedback"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my feedback", body = FeedbackListRes)
    )
)]
async fn get_my_feedback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entries: Vec<FeedbackEntity> = feedback::table
        .filter(feedback::user_id.eq(user_id))
        .select(FeedbackEntity::as_select())
        .order_by(feedback::submitted_at.desc())
        .load(conn)
        .await
        .context("Failed to get my feedback")?;

    Ok(StdResponse::ok(
        FeedbackListRes::from(entries),
        "Get my feedback successfully",
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Feedback"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Feedback ID")
    ),
    responses(
        (status = 200, description = "Get feedback", body = FeedbackRes)
    )
)]
async fn get_feedback(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entry = find_accessible(conn, id, &auth).await?;

    Ok(StdResponse::ok(
        FeedbackRes { feedback: entry },
        "Get feedback successfully",
    ))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Feedback"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Feedback ID")
    ),
    request_body = FeedbackReq,
    responses(
        (status = 200, description = "Feedback updated", body = FeedbackRes)
    )
)]
async fn update_feedback(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<FeedbackReq>,
) -> Result<impl IntoResponse, AppError> {
    let changes: CreateFeedbackEntity = body.validate().map_err(AppError::BadRequest)?.into();

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_accessible(conn, id, &auth).await?;

    let entry: FeedbackEntity = diesel::update(feedback::table.find(id))
        .set(&changes)
        .returning(FeedbackEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to update feedback")?
        .ok_or_else(|| AppError::NotFound(FEEDBACK_NOT_FOUND.into()))?;

    Ok(StdResponse::ok(
        FeedbackRes { feedback: entry },
        "Feedback updated successfully",
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Feedback"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Feedback ID")
    ),
    responses(
        (status = 200, description = "Feedback deleted", body = FeedbackRes)
    )
)]
async fn delete_feedback(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_accessible(conn, id, &auth).await?;

    let entry: FeedbackEntity = diesel::delete(feedback::table.find(id))
        .returning(FeedbackEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to delete feedback")?
        .ok_or_else(|| AppError::NotFound(FEEDBACK_NOT_FOUND.into()))?;

    tracing::info!(feedback_id = id, by = %auth.email, "Feedback deleted");

    Ok(StdResponse::ok(
        FeedbackRes { feedback: entry },
        "Feedback deleted successfully",
    ))
}
