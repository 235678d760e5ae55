use std::{collections::HashMap, str::FromStr};

use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::{
        garment::OrderReq,
        lifecycle::{OrderStatus, PaymentStatus},
        roles::Role,
        stats::OrderStats,
    },
    models::{OrderDetailsEntity, OrderEntity, OrderWithParties},
    platform::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::AuthUser,
        extractors::AppJson,
        guards, middleware,
    },
    schema::{orders, users},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders, create_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(get_delivery_orders))
            .routes(utoipa_axum::routes!(get_designer_orders))
            .routes(utoipa_axum::routes!(get_stats))
            .routes(utoipa_axum::routes!(get_order, update_order, delete_order))
            .routes(utoipa_axum::routes!(update_order_status))
            .routes(utoipa_axum::routes!(assign_designer))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::authorization,
            )),
    )
}

const ORDER_NOT_FOUND: &str = "Order not found";
const ONLY_PENDING: &str = "Only pending orders can be modified";

#[derive(Serialize, ToSchema)]
pub struct OrderRes {
    pub order: OrderEntity,
}

#[derive(Serialize, ToSchema)]
pub struct OrdersRes {
    pub count: usize,
    pub orders: Vec<OrderEntity>,
}

#[derive(Serialize, ToSchema)]
pub struct StaffOrdersRes {
    pub count: usize,
    pub orders: Vec<OrderWithParties>,
}

impl From<Vec<OrderWithParties>> for StaffOrdersRes {
    fn from(orders: Vec<OrderWithParties>) -> Self {
        Self {
            count: orders.len(),
            orders,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatsRes {
    pub stats: OrderStats,
}

/// Attaches owner and designer names with a single lookup.
async fn with_parties(
    conn: &mut AsyncPgConnection,
    orders: Vec<OrderEntity>,
) -> Result<Vec<OrderWithParties>, AppError> {
    let mut ids: Vec<i32> = orders
        .iter()
        .flat_map(|order| std::iter::once(order.user_id).chain(order.designer_id))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let names: HashMap<i32, String> = users::table
        .filter(users::id.eq_any(&ids))
        .select((users::id, users::name))
        .load::<(i32, String)>(conn)
        .await
        .context("Failed to resolve user names")?
        .into_iter()
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| OrderWithParties {
            owner_name: names.get(&order.user_id).cloned(),
            designer_name: order.designer_id.and_then(|id| names.get(&id).cloned()),
            order,
        })
        .collect())
}

fn parse_status(value: Option<&str>) -> Result<OrderStatus, AppError> {
    let value = value.ok_or_else(|| AppError::BadRequest("Status is required".into()))?;
    OrderStatus::from_str(value).map_err(AppError::BadRequest)
}

fn stored_status(order: &OrderEntity) -> Result<OrderStatus, AppError> {
    OrderStatus::from_str(&order.status)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Order #{} has a corrupt status", order.id))
        .map_err(AppError::from)
}

/// Loads an order owned by `user_id` that may still be edited by its buyer.
async fn find_own_pending(
    conn: &mut AsyncPgConnection,
    id: i32,
    user_id: i32,
) -> Result<OrderEntity, AppError> {
    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::user_id.eq(user_id))
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.into()))?;

    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::InvalidState(ONLY_PENDING.into()));
    }
    Ok(order)
}

/// List every order with owner and designer names.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all orders", body = StaffOrdersRes),
        (status = 403, description = "Admin or owner access required")
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .select(OrderEntity::as_select())
        .order_by(orders::order_date.desc())
        .load(conn)
        .await
        .context("Failed to get orders")?;
    let orders = with_parties(conn, orders).await?;

    Ok(StdResponse::ok(
        StaffOrdersRes::from(orders),
        "Get orders successfully",
    ))
}

/// Place a new order. Only the attribute group matching `gender` is stored.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = OrderReq,
    responses(
        (status = 200, description = "Order created", body = OrderRes),
        (status = 400, description = "Missing or invalid fields")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<OrderReq>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_role(&auth, &[Role::Buyer])?;
    let user_id = guards::require_identity(&auth)?;
    let details: OrderDetailsEntity = body.validate().map_err(AppError::BadRequest)?.into();

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = diesel::insert_into(orders::table)
        .values((
            &details,
            orders::user_id.eq(user_id),
            orders::status.eq(OrderStatus::Pending.as_str()),
            orders::payment_status.eq(PaymentStatus::Pending.as_str()),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create order")?;

    tracing::info!(order_id = order.id, user_id, gender = %order.gender, "Order created");

    Ok(StdResponse::ok(OrderRes { order }, "Order created successfully"))
}

/// Fetch the caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = OrdersRes)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::user_id.eq(user_id))
        .select(OrderEntity::as_select())
        .order_by(orders::order_date.desc())
        .load(conn)
        .await
        .context("Failed to get my orders")?;

    Ok(StdResponse::ok(
        OrdersRes {
            count: orders.len(),
            orders,
        },
        "Get my orders successfully",
    ))
}

/// Orders that are ready for delivery or already delivered.
#[utoipa::path(
    get,
    path = "/delivery",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List delivery orders", body = StaffOrdersRes)
    )
)]
async fn get_delivery_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_role(&auth, &[Role::Delivery, Role::Admin, Role::Owner])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let statuses = OrderStatus::delivery_visible().map(OrderStatus::as_str);
    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::status.eq_any(statuses))
        .select(OrderEntity::as_select())
        .order_by(orders::order_date.desc())
        .load(conn)
        .await
        .context("Failed to get delivery orders")?;
    let orders = with_parties(conn, orders).await?;

    Ok(StdResponse::ok(
        StaffOrdersRes::from(orders),
        "Get delivery orders successfully",
    ))
}

/// Orders assigned to a designer that are in production or awaiting delivery.
#[utoipa::path(
    get,
    path = "/designer/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Designer user ID")
    ),
    responses(
        (status = 200, description = "List designer orders", body = StaffOrdersRes)
    )
)]
async fn get_designer_orders(
    Path(designer_id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let is_that_designer =
        guards::has_role(&auth, &[Role::Designer]) && guards::is_owner(designer_id, &auth);
    if !is_that_designer {
        guards::require_privileged(&auth)?;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let statuses = OrderStatus::designer_visible().map(OrderStatus::as_str);
    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::designer_id.eq(designer_id))
        .filter(orders::status.eq_any(statuses))
        .select(OrderEntity::as_select())
        .order_by(orders::order_date.desc())
        .load(conn)
        .await
        .context("Failed to get designer orders")?;
    let orders = with_parties(conn, orders).await?;

    Ok(StdResponse::ok(
        StaffOrdersRes::from(orders),
        "Get designer orders successfully",
    ))
}

/// Order counts by status, gender and garment attribute.
#[utoipa::path(
    get,
    path = "/stats/overview",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Order statistics", body = StatsRes)
    )
)]
async fn get_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .select(OrderEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get orders")?;

    Ok(StdResponse::ok(
        StatsRes {
            stats: OrderStats::collect(&orders),
        },
        "Get order statistics successfully",
    ))
}

/// Fetch a single order. Buyers only see their own.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order", body = OrderRes),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .filter(|order| guards::is_owner(order.user_id, &auth) || guards::is_privileged(&auth))
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.into()))?;

    Ok(StdResponse::ok(OrderRes { order }, "Get order successfully"))
}

/// Edit a pending order. The body is validated exactly as on creation.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = OrderReq,
    responses(
        (status = 200, description = "Order updated", body = OrderRes),
        (status = 400, description = "Invalid fields or order is no longer pending")
    )
)]
async fn update_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<OrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;
    let details: OrderDetailsEntity = body.validate().map_err(AppError::BadRequest)?.into();

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_own_pending(conn, id, user_id).await?;

    let order: OrderEntity = diesel::update(
        orders::table
            .find(id)
            .filter(orders::status.eq(OrderStatus::Pending.as_str())),
    )
    .set(&details)
    .returning(OrderEntity::as_returning())
    .get_result(conn)
    .await
    .optional()
    .context("Failed to update order")?
    .ok_or_else(|| AppError::InvalidState(ONLY_PENDING.into()))?;

    Ok(StdResponse::ok(OrderRes { order }, "Order updated successfully"))
}

/// Delete a pending order.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to delete")
    ),
    responses(
        (status = 200, description = "Order deleted", body = OrderRes)
    )
)]
async fn delete_order(
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

    find_own_pending(conn, id, user_id).await?;

    let order: OrderEntity = diesel::delete(
        orders::table
            .find(id)
            .filter(orders::status.eq(OrderStatus::Pending.as_str())),
    )
    .returning(OrderEntity::as_returning())
    .get_result(conn)
    .await
    .optional()
    .context("Failed to delete order")?
    .ok_or_else(|| AppError::InvalidState(ONLY_PENDING.into()))?;

    tracing::info!(order_id = id, user_id, "Order deleted");

    Ok(StdResponse::ok(OrderRes { order }, "Order deleted successfully"))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    /// Target status, e.g. `confirmed` or `delivered`.
    pub status: Option<String>,
}

/// Move an order along the status graph. Repeating the current status is a no-op write.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID")
    ),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status updated", body = OrderRes),
        (status = 400, description = "Unknown status or transition not allowed")
    )
)]
async fn update_order_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;
    let next = parse_status(body.status.as_deref())?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.into()))?;

    let current = stored_status(&order)?;
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Cannot change order status from {} to {}",
            current, next
        )));
    }

    let order: OrderEntity = diesel::update(
        orders::table
            .find(id)
            .filter(orders::status.eq(current.as_str())),
    )
    .set(orders::status.eq(next.as_str()))
    .returning(OrderEntity::as_returning())
    .get_result(conn)
    .await
    .optional()
    .context("Failed to update order status")?
    .ok_or_else(|| {
        AppError::Conflict("Order status was changed by another request, please retry".into())
    })?;

    tracing::info!(order_id = id, from = %current, to = %next, by = %auth.email, "Order status updated");

    Ok(StdResponse::ok(
        OrderRes { order },
        "Order status updated successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignDesignerReq {
    pub designer_id: Option<i32>,
    /// Defaults to `in_production`.
    pub status: Option<String>,
}

/// Assign a designer to an order and move it into production.
#[utoipa::path(
    patch,
    path = "/{id}/assign",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID")
    ),
    request_body = AssignDesignerReq,
    responses(
        (status = 200, description = "Designer assigned", body = OrderRes),
        (status = 400, description = "Invalid designer ID or transition not allowed")
    )
)]
async fn assign_designer(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<AssignDesignerReq>,
) -> Result<impl IntoResponse, AppError> {
    guards::require_privileged(&auth)?;
    let designer_id = body
        .designer_id
        .ok_or_else(|| AppError::BadRequest("Designer ID is required".into()))?;
    let next = match body.status.as_deref() {
        Some(status) => parse_status(Some(status))?,
        None => OrderStatus::InProduction,
    };

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let designer_role: Option<i32> = users::table
        .find(designer_id)
        .select(users::role)
        .first(conn)
        .await
        .optional()
        .context("Failed to look up designer")?;
    if designer_role.and_then(Role::from_code) != Some(Role::Designer) {
        return Err(AppError::BadRequest("Invalid designer ID".into()));
    }

    let order: OrderEntity = orders::table
        .find(id)
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.into()))?;

    let current = stored_status(&order)?;
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Cannot assign a designer to a {} order",
            current
        )));
    }

    let order: OrderEntity = diesel::update(
        orders::table
            .find(id)
            .filter(orders::status.eq(current.as_str())),
    )
    .set((
        orders::designer_id.eq(designer_id),
        orders::status.eq(next.as_str()),
    ))
    .returning(OrderEntity::as_returning())
    .get_result(conn)
    .await
    .optional()
    .context("Failed to assign designer")?
    .ok_or_else(|| {
        AppError::Conflict("Order status was changed by another request, please retry".into())
    })?;

    tracing::info!(order_id = id, designer_id, status = %next, "Designer assigned");

    Ok(StdResponse::ok(
        OrderRes { order },
        "Designer assigned successfully",
    ))
}
