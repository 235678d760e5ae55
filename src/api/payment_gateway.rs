use std::collections::HashMap;

use anyhow::Context;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::platform::{app_error::AppError, config::PaymentsConfig};

/// Prefix of intent ids handed out when no gateway key is configured.
pub const DEMO_PREFIX: &str = "demo_";

#[derive(Deserialize, Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// Fails unless this is the intent the caller named and it was created for `order_id`.
    pub fn ensure_for_order(&self, intent_id: &str, order_id: i32) -> Result<(), AppError> {
        let order_matches = self
            .metadata
            .get("orderId")
            .is_some_and(|id| *id == order_id.to_string());

        if self.id != intent_id || !order_matches {
            tracing::warn!(
                order_id,
                intent_id,
                returned_id = %self.id,
                "Payment intent does not match order"
            );
            return Err(AppError::BadRequest(
                "Payment intent does not belong to this order".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Deserialize)]
struct GatewayErrorDetail {
    message: String,
}

/// Converts a decimal price into the gateway's minor units.
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

pub fn is_demo_intent(intent_id: &str) -> bool {
    intent_id.starts_with(DEMO_PREFIX)
}

/// Gateway intent ids look like `pi_3NabcXYZ`.
pub fn is_gateway_intent_id(intent_id: &str) -> bool {
    intent_id.strip_prefix("pi_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

fn intent_url(api_base: &str, intent_id: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(api_base).context("Invalid payment gateway base URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Payment gateway base URL cannot have a path"))?
        .pop_if_empty()
        .extend(["v1", "payment_intents", intent_id]);
    Ok(url)
}

async fn read_intent(response: reqwest::Response) -> Result<PaymentIntent, AppError> {
    if response.status().is_success() {
        let intent = response
            .json()
            .await
            .context("Failed to parse payment intent")?;
        return Ok(intent);
    }

    let status = response.status();
    let message = response
        .json::<GatewayErrorBody>()
        .await
        .map(|body| body.error.message)
        .unwrap_or_else(|_| format!("gateway responded with {}", status));

    Err(AppError::UpstreamFailure(format!(
        "Payment gateway error: {}",
        message
    )))
}

pub async fn create_payment_intent(
    client: Client,
    config: &PaymentsConfig,
    secret_key: &str,
    order_id: i32,
    price: f64,
) -> Result<PaymentIntent, AppError> {
    let amount = to_minor_units(price).to_string();
    let order_id = order_id.to_string();

    let response = client
        .post(format!("{}/v1/payment_intents", config.api_base))
        .bearer_auth(secret_key)
        .form(&[
            ("amount", amount.as_str()),
            ("currency", config.currency.as_str()),
            ("metadata[orderId]", order_id.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
        ])
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("PaymentGateway".into()))?;

    read_intent(response).await
}

pub async fn retrieve_payment_intent(
    client: Client,
    config: &PaymentsConfig,
    secret_key: &str,
    intent_id: &str,
) -> Result<PaymentIntent, AppError> {
    let response = client
        .get(intent_url(&config.api_base, intent_id)?)
        .bearer_auth(secret_key)
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("PaymentGateway".into()))?;

    read_intent(response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_round_to_nearest_cent() {
        assert_eq!(to_minor_units(49.99), 4999);
        assert_eq!(to_minor_units(0.0), 0);
        assert_eq!(to_minor_units(19.5), 1950);
        assert_eq!(to_minor_units(120.0), 12000);
    }

    #[test]
    fn demo_intents_are_recognised_by_prefix() {
        assert!(is_demo_intent("demo_12_1700000000"));
        assert!(!is_demo_intent("pi_3Nabc"));
    }

    #[test]
    fn gateway_intent_ids_are_restricted_to_a_single_segment() {
        assert!(is_gateway_intent_id("pi_3Nabc_XYZ9"));
        assert!(!is_gateway_intent_id("pi_"));
        assert!(!is_gateway_intent_id("../customers/cus_123?expand=x"));
        assert!(!is_gateway_intent_id("pi_1/../../customers"));
        assert!(!is_gateway_intent_id("cus_123"));
    }

    #[test]
    fn intent_url_escapes_the_id() {
        let url = intent_url("https://gateway.test", "a/b?c").unwrap();
        assert_eq!(url.path(), "/v1/payment_intents/a%2Fb%3Fc");
        assert!(url.query().is_none());
    }

    fn intent(id: &str, order_id: Option<&str>) -> PaymentIntent {
        PaymentIntent {
            id: id.into(),
            client_secret: None,
            status: "succeeded".into(),
            metadata: order_id
                .map(|o| HashMap::from([("orderId".to_string(), o.to_string())]))
                .unwrap_or_default(),
        }
    }

    #[test]
    fn intent_must_match_requested_id_and_order() {
        assert!(intent("pi_a", Some("12")).ensure_for_order("pi_a", 12).is_ok());

        let err = intent("pi_other", Some("12"))
            .ensure_for_order("pi_a", 12)
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert!(intent("pi_a", Some("11")).ensure_for_order("pi_a", 12).is_err());
        assert!(intent("pi_a", None).ensure_for_order("pi_a", 12).is_err());
    }

    #[tokio::test]
    async fn retrieves_intent_from_gateway() {
        use axum::{Json, Router, extract::Path, routing::get};
        use serde_json::json;

        let gateway = Router::new().route(
            "/v1/payment_intents/{id}",
            get(|Path(id): Path<String>| async move {
                Json(json!({
                    "id": id,
                    "status": "succeeded",
                    "client_secret": null,
                    "metadata": { "orderId": "12" }
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, gateway).await });

        let config = PaymentsConfig {
            gateway_secret_key: Some("sk_test".into()),
            currency: "usd".into(),
            api_base: format!("http://{}", addr),
        };
        let intent = retrieve_payment_intent(Client::new(), &config, "sk_test", "pi_abc")
            .await
            .unwrap();

        assert_eq!(intent.id, "pi_abc");
        assert_eq!(intent.status, "succeeded");
        assert!(intent.ensure_for_order("pi_abc", 12).is_ok());
    }
}
