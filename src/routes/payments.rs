use anyhow::Context;
use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::payment_gateway::{self, DEMO_PREFIX},
    domain::lifecycle::{PaymentMethod, PaymentStatus},
    models::OrderEntity,
    platform::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::AuthUser,
        extractors::AppJson,
        guards, middleware,
    },
    schema::orders,
};

/// Payment intents go through the external gateway when a secret key is
/// configured. Without one, demo intents are issued and trusted on confirmation.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_payment_intent))
            .routes(utoipa_axum::routes!(confirm_payment))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::authorization,
            )),
    )
}

async fn find_own_order(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    user_id: i32,
) -> Result<OrderEntity, AppError> {
    orders::table
        .find(order_id)
        .filter(orders::user_id.eq(user_id))
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentReq {
    pub order_id: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRes {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    /// True when no gateway is configured and the intent is simulated.
    pub demo: bool,
}

/// Start paying for an order.
#[utoipa::path(
    post,
    path = "/create-payment-intent",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = CreateIntentReq,
    responses(
        (status = 200, description = "Payment intent created", body = CreateIntentRes),
        (status = 400, description = "Order already paid"),
        (status = 404, description = "Order not found")
    )
)]
async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<CreateIntentReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;
    let order_id = body
        .order_id
        .ok_or_else(|| AppError::BadRequest("Order ID is required".into()))?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = find_own_order(conn, order_id, user_id).await?;
    if order.payment_status == PaymentStatus::Paid.as_str() {
        return Err(AppError::InvalidState("Order is already paid".into()));
    }

    let payments = &state.config.payments;
    let res = match payments.gateway_secret_key.as_deref() {
        Some(secret_key) => {
            let intent = payment_gateway::create_payment_intent(
                state.http_client.clone(),
                payments,
                secret_key,
                order.id,
                order.price,
            )
            .await?;
            CreateIntentRes {
                client_secret: intent.client_secret,
                payment_intent_id: intent.id,
                demo: false,
            }
        }
        None => {
            let id = format!(
                "{}{}_{}",
                DEMO_PREFIX,
                order.id,
                Utc::now().timestamp_millis()
            );
            CreateIntentRes {
                client_secret: Some(format!("{}_secret_demo", id)),
                payment_intent_id: id,
                demo: true,
            }
        }
    };

    diesel::update(orders::table.find(order.id))
        .set(orders::payment_intent_id.eq(&res.payment_intent_id))
        .execute(conn)
        .await
        .context("Failed to record payment intent")?;

    tracing::info!(order_id = order.id, demo = res.demo, "Payment intent created");

    Ok(StdResponse::ok(res, "Payment intent created successfully"))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentReq {
    pub order_id: Option<i32>,
    pub payment_intent_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ConfirmPaymentRes {
    pub order: OrderEntity,
}

/// Mark an order as paid. Gateway intents are checked remotely first and must
/// have been created for this order; demo intents are trusted.
#[utoipa::path(
    post,
    path = "/confirm-payment",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = ConfirmPaymentReq,
    responses(
        (status = 200, description = "Payment confirmed", body = ConfirmPaymentRes),
        (status = 400, description = "Payment did not succeed")
    )
)]
async fn confirm_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<ConfirmPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guards::require_identity(&auth)?;
    let (Some(order_id), Some(intent_id)) = (body.order_id, body.payment_intent_id) else {
        return Err(AppError::BadRequest(
            "Order ID and payment intent ID are required".into(),
        ));
    };

    let payments = &state.config.payments;
    let gateway_key = match payments.gateway_secret_key.as_deref() {
        Some(_) if payment_gateway::is_demo_intent(&intent_id) => None,
        Some(key) if !payment_gateway::is_gateway_intent_id(&intent_id) => {
            return Err(AppError::BadRequest("Invalid payment intent ID".into()));
        }
        key => key,
    };

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = find_own_order(conn, order_id, user_id).await?;

    if let Some(secret_key) = gateway_key {
        let intent = payment_gateway::retrieve_payment_intent(
            state.http_client.clone(),
            payments,
            secret_key,
            &intent_id,
        )
        .await?;
        intent.ensure_for_order(&intent_id, order.id)?;

        if intent.status != "succeeded" {
            diesel::update(orders::table.find(order.id))
                .set(orders::payment_status.eq(PaymentStatus::Failed.as_str()))
                .execute(conn)
                .await
                .context("Failed to record failed payment")?;

            tracing::warn!(order_id = order.id, status = %intent.status, "Payment not successful");
            return Err(AppError::BadRequest(format!(
                "Payment has not succeeded (status: {})",
                intent.status
            )));
        }
    }

    let order: OrderEntity = diesel::update(orders::table.find(order.id))
        .set((
            orders::payment_status.eq(PaymentStatus::Paid.as_str()),
            orders::payment_method.eq(PaymentMethod::Paynow.as_str()),
            orders::payment_intent_id.eq(&intent_id),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to mark order as paid")?;

    tracing::info!(order_id = order.id, "Payment confirmed");

    Ok(StdResponse::ok(
        ConfirmPaymentRes { order },
        "Payment confirmed successfully",
    ))
}
