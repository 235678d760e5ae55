use std::str::FromStr;

use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, dsl::count_star};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::returns::{ReturnEligibility, ReturnStatus},
    models::{CreateReturnOrderEntity, ReturnOrderEntity, UpdateReturnStatusEntity},
    platform::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::AuthUser,
        extractors::AppJson,
        guards, middleware,
    },
    schema::{orders, return_orders},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/return-orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_return_orders, create_return_order))
            .routes(utoipa_axum::routes!(get_my_returns))
            .routes(utoipa_axum::routes!(
                get_return_order,
                update_return_order,
                delete_return_order
            ))
            .routes(utoipa_axum::routes!(update_return_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::authorization,
            )),
    )
}

const RETURN_NOT_FOUND: &str = "Return order not found";

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOrderRes {
    pub return_order: ReturnOrderEntity,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOrdersRes {
    pub count: usize,
    pub return_orders: Vec<ReturnOrderEntity>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOrderReq {
    /// ID of the delivered order being returned.
    pub order_number: Option<i32>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub reason_for_return: Option<String>,
}

impl ReturnOrderReq {
    fn validate(self) -> Result<CreateReturnOrderEntity, AppError> {
        let field = |v: Option<String>| v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(order_id), Some(customer_name), Some(customer_phone), Some(reason_for_return)) = (
            self.order_number,
            field(self.customer_name),
            field(self.customer_phone),
            field(self.reason_for_return),
        ) else {
            return Err(AppError::BadRequest(
                "Order number, customer name, customer phone and reason for return are required"
                    .into(),
            ));
        };

        Ok(CreateReturnOrderEntity {
            order_id,
            customer_name,
            customer_phone,
            reason_for_return,
        })
    }
}

/// The order must belong to `user_id`, be delivered, and have no other return.
/// `editing` excludes the return being edited from the duplicate check.
async fn ensure_returnable(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    user_id: i32,
    editing: Option<i32>,
) -> Result<(), AppError> {
    let order_status: String = orders::table
        .find(order_id)
        .filter(orders::user_id.eq(user_id))
        .select(orders::status)
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let mut existing = return_orders::table
        .select(count_star())
        .filter(return_orders::order_id.eq(order_id))
        .into_boxed();
    if let Some(id) = editing {
        existing = existing.filter(return_orders::id.ne(id));
    }
    let existing: i64 = existing
        .get_result(conn)
        .await
        .context("Failed to check existing return orders")?;

    match ReturnEligibility::check(&order_status, existing > 0) {
        ReturnEligibility::Eligible => Ok(()),
        ReturnEligibility::NotDelivered => Err(AppError::InvalidState(
            ReturnEligibility::NOT_DELIVERED.into(),
        )),
        ReturnEligibility::AlreadyRequested => Err(AppError::Conflict(
            ReturnEligibility::ALREADY_REQUESTED.into(),
        )),
    }
}

/// Request a return for one of the caller's delivered orders.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Return orders"],
    security(("bearerAuth" = [])),
    request_body = ReturnOrderReq,
    responses(
        (status = 200, description = "Return order created", body = ReturnOrderRes),
        (status = 400, description = "Order not delivered or already has a return"),
        (status = 404, description = "Order not found")
    )
)]
async fn create_return_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<ReturnOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;
    let new_return = body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let return_order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                ensure_returnable(conn, new_return.order_id, user_id, None).await?;

                let return_order = diesel::insert_into(return_orders::table)
                    .values((&new_return, return_orders::user_id.eq(user_id)))
                    .returning(ReturnOrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|err| {
                        AppError::from_insert(err, ReturnEligibility::ALREADY_REQUESTED)
                    })?;

                Ok::<ReturnOrderEntity, AppError>(return_order)
            })
        })
        .await?;

    tracing::info!(
        return_id = return_order.id,
        order_id = return_order.order_id,
        user_id,
        "Return order created"
    );

    Ok(StdResponse::ok(
        ReturnOrderRes { return_order },
        "Return order created successfully",
    ))
}

/// Fetch the caller's return requests, newest first.
#[utoipa::path(
    get,
    path = "/my-returns",
    tags = ["Return orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my return orders", body = ReturnOrdersRes)
    )
)]
async fn get_my_returns(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let return_orders: Vec<ReturnOrderEntity> = return_orders::table
        .filter(return_orders::user_id.eq(user_id))
        .select(ReturnOrderEntity::as_select())
        .order_by(return_orders::created_at.desc())
        .load(conn)
        .await
        .context("Failed to get my return orders")?;

    Ok(StdResponse::ok(
        ReturnOrdersRes {
            count: return_orders.len(),
            return_orders,
        },
        "Get my return orders successfully",
    ))
}

/// List every return request.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Return orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List return orders", body = ReturnOrdersRes)
    )
)]
async fn get_return_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let return_orders: Vec<ReturnOrderEntity> = return_orders::table
        .select(ReturnOrderEntity::as_select())
        .order_by(return_orders::created_at.desc())
        .load(conn)
        .await
        .context("Failed to get return orders")?;

    Ok(StdResponse::ok(
        ReturnOrdersRes {
            count: return_orders.len(),
            return_orders,
        },
        "Get return orders successfully",
    ))
}

/// Fetch a single return request.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Return orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Return order ID")
    ),
    responses(
        (status = 200, description = "Get return order", body = ReturnOrderRes),
        (status = 404, description = "Return order not found")
    )
)]
async fn get_return_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let return_order: ReturnOrderEntity = return_orders::table
        .find(id)
        .select(ReturnOrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get return order")?
        .filter(|r| guards::is_owner(r.user_id, &auth) || guards::is_privileged(&auth))
        .ok_or_else(|| AppError::NotFound(RETURN_NOT_FOUND.into()))?;

    Ok(StdResponse::ok(
        ReturnOrderRes { return_order },
        "Get return order successfully",
    ))
}

/// Edit a return request. The target order is re-checked as on creation.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Return orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Return order ID")
    ),
    request_body = ReturnOrderReq,
    responses(
        (status = 200, description = "Return order updated", body = ReturnOrderRes)
    )
)]
async fn update_return_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<ReturnOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;
    let changes = body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let return_order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let owned: i64 = return_orders::table
                    .find(id)
                    .filter(return_orders::user_id.eq(user_id))
                    .count()
                    .get_result(conn)
                    .await
                    .context("Failed to get return order")?;
                if owned == 0 {
                    return Err(AppError::NotFound(RETURN_NOT_FOUND.into()));
                }

                ensure_returnable(conn, changes.order_id, user_id, Some(id)).await?;

                let return_order = diesel::update(return_orders::table.find(id))
                    .set(&changes)
                    .returning(ReturnOrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|err| {
                        AppError::from_insert(err, ReturnEligibility::ALREADY_REQUESTED)
                    })?;

                Ok::<ReturnOrderEntity, AppError>(return_order)
            })
        })
        .await?;

    Ok(StdResponse::ok(
        ReturnOrderRes { return_order },
        "Return order updated successfully",
    ))
}

/// Withdraw a return request.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Return orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Return order ID")
    ),
    responses(
        (status = 200, description = "Return order deleted", body = ReturnOrderRes)
    )
)]
async fn delete_return_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let return_order: ReturnOrderEntity = diesel::delete(
        return_orders::table
            .find(id)
            .filter(return_orders::user_id.eq(user_id)),
    )
    .returning(ReturnOrderEntity::as_returning())
    .get_result(conn)
    .await
    .optional()
    .context("Failed to delete return order")?
    .ok_or_else(|| AppError::NotFound(RETURN_NOT_FOUND.into()))?;

    Ok(StdResponse::ok(
        ReturnOrderRes { return_order },
        "Return order deleted successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStatusReq {
    /// One of `pending`, `approved`, `rejected`, `processing`, `completed`.
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

/// Set a return request's status and notes. Any status may follow any other.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Return orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Return order ID")
    ),
    request_body = ReturnStatusReq,
    responses(
        (status = 200, description = "Return status updated", body = ReturnOrderRes)
    )
)]
async fn update_return_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<ReturnStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;
    let status = body
        .status
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Status is required".into()))
        .and_then(|s| ReturnStatus::from_str(s).map_err(AppError::BadRequest))?;

    let changes = UpdateReturnStatusEntity {
        status: status.as_str().to_string(),
        admin_notes: body.admin_notes,
    };

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let return_order: ReturnOrderEntity = diesel::update(return_orders::table.find(id))
        .set(&changes)
        .returning(ReturnOrderEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to update return status")?
        .ok_or_else(|| AppError::NotFound(RETURN_NOT_FOUND.into()))?;

    tracing::info!(return_id = id, status = status.as_str(), by = %auth.email, "Return status updated");

    Ok(StdResponse::ok(
        ReturnOrderRes { return_order },
        "Return order status updated successfully",
    ))
}
