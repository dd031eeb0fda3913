use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{msg, AppError, Result};
use crate::models::ScreeningOrder;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Create a checkout session for a screening order.
    ///
    /// Uses ad-hoc price_data since screening totals vary per order (tier +
    /// addons + service level). The order/application/landlord ids travel in
    /// session metadata so webhook events can be correlated back.
    pub async fn create_checkout_session(
        &self,
        order: &ScreeningOrder,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String)> {
        let amount = order.total_amount_cents.to_string();
        let description = format!("Tenant screening ({})", order.screening_tier);
        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", "payment"),
                ("success_url", success_url),
                ("cancel_url", cancel_url),
                ("line_items[0][price_data][currency]", order.currency.as_str()),
                ("line_items[0][price_data][unit_amount]", amount.as_str()),
                (
                    "line_items[0][price_data][product_data][name]",
                    description.as_str(),
                ),
                ("line_items[0][quantity]", "1"),
                ("metadata[order_id]", order.id.as_str()),
                ("metadata[application_id]", order.application_id.as_str()),
                ("metadata[landlord_id]", order.landlord_id.as_str()),
                ("payment_intent_data[metadata][order_id]", order.id.as_str()),
                (
                    "payment_intent_data[metadata][application_id]",
                    order.application_id.as_str(),
                ),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))?;

        Ok((session.id, session.url))
    }

    /// Retrieve a checkout session by id (manual confirmation fallback).
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionObject> {
        let response = self
            .client
            .get(format!(
                "https://api.stripe.com/v1/checkout/sessions/{}",
                session_id
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))
    }

    /// List checkout sessions for a payment intent.
    ///
    /// Best-effort secondary lookup for `payment_intent.succeeded` events
    /// whose metadata does not carry our order id.
    pub async fn sessions_for_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Vec<CheckoutSessionObject>> {
        #[derive(Debug, Deserialize)]
        struct SessionList {
            data: Vec<CheckoutSessionObject>,
        }

        let response = self
            .client
            .get("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("payment_intent", payment_intent_id), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let list: SessionList = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(list.data)
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Signature format: t=timestamp,v1=signature
        let parts: Vec<&str> = signature.split(',').collect();

        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in parts {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        // Parse and validate timestamp to prevent replay attacks.
        // Reject webhooks older than WEBHOOK_TIMESTAMP_TOLERANCE_SECS.
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Also reject timestamps from the future (clock skew tolerance: 60 seconds)
        if age < -60 {
            tracing::warn!("Webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison to prevent timing attacks.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        // Length check is not constant-time, but signature length is not
        // secret (always 64 hex chars for SHA-256)
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Generic gateway event envelope - object is parsed based on event type
#[derive(Debug, Deserialize)]
pub struct GatewayEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayEventData {
    pub object: serde_json::Value,
}

/// Correlation ids carried in session/payment-intent metadata.
#[derive(Debug, Default, Deserialize)]
pub struct OrderMetadata {
    pub order_id: Option<String>,
    pub application_id: Option<String>,
    pub landlord_id: Option<String>,
}

// ============ checkout.session.completed / async_payment_succeeded ============

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: OrderMetadata,
}

// ============ payment_intent.succeeded ============

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: OrderMetadata,
}

// ============ customer.subscription.* ============

#[derive(Debug, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub metadata: PlanMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanMetadata {
    pub plan: Option<String>,
}
