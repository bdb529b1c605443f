//! Payment gateway adapter: a thin wrapper over the card processor's
//! payment-intent API plus webhook signature verification.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure (timeout, DNS, connection reset).
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned an error response.
    #[error("Gateway error: {0}")]
    Api(String),

    /// Webhook signature did not verify.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Webhook payload could not be parsed.
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    /// Amount in major units (pounds); converted to minor units (× 100) on
    /// the wire.
    pub amount: f64,
    pub currency: String,
    pub order_id: String,
    pub customer_email: String,
    pub description: Option<String>,
}

/// A freshly created payment intent.
#[derive(Debug, Clone)]
pub struct IntentCreated {
    pub client_secret: String,
    pub payment_intent_id: String,
}

/// The current state of a payment intent at the gateway.
#[derive(Debug, Clone)]
pub struct IntentStatus {
    pub id: String,
    /// Raw gateway status string, e.g. `"succeeded"`.
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Payment-intent create/retrieve operations.
///
/// No implementation mutates local order state; handlers own that.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, req: CreateIntentRequest) -> Result<IntentCreated, GatewayError>;

    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<IntentStatus, GatewayError>;
}

/// Converts a major-unit amount to the gateway's minor-unit integer.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

// -- Stripe over HTTPS --

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Upper bound on any single gateway call.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Stripe payment-intent client.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Deserialize)]
struct StripeIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
    amount: i64,
    currency: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    /// Creates a gateway client with a bounded request timeout.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(GATEWAY_TIMEOUT)
                .build()
                .unwrap_or_default(),
            secret_key: secret_key.into(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    /// Points the client at a different API base (test servers).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn parse_intent(response: reqwest::Response) -> Result<StripeIntent, GatewayError> {
        if response.status().is_success() {
            Ok(response.json::<StripeIntent>().await?)
        } else {
            let status = response.status();
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            Err(GatewayError::Api(message))
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self, req), fields(order_id = %req.order_id))]
    async fn create_intent(&self, req: CreateIntentRequest) -> Result<IntentCreated, GatewayError> {
        let description = req
            .description
            .unwrap_or_else(|| format!("Payment for order {}", req.order_id));
        let amount = to_minor_units(req.amount).to_string();
        let currency = req.currency.to_lowercase();

        let form: Vec<(&str, &str)> = vec![
            ("amount", &amount),
            ("currency", &currency),
            ("metadata[orderId]", &req.order_id),
            ("receipt_email", &req.customer_email),
            ("description", &description),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        let response = self
            .client
            .post(format!("{}/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        let intent = Self::parse_intent(response).await?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::Api("Intent missing client secret".to_string()))?;

        Ok(IntentCreated {
            client_secret,
            payment_intent_id: intent.id,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<IntentStatus, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/payment_intents/{payment_intent_id}",
                self.api_base
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        let intent = Self::parse_intent(response).await?;
        Ok(IntentStatus {
            id: intent.id,
            status: intent.status,
            amount_minor: intent.amount,
            currency: intent.currency,
        })
    }
}

// -- Webhooks --

/// A webhook event the order flow cares about.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_type: String,
    pub payment_intent_id: String,
    pub order_id: Option<String>,
}

/// Verifies a `t=...,v1=...` webhook signature header against the raw
/// payload.
///
/// The signed payload is `"{timestamp}.{body}"`; any of the `v1` entries may
/// match. Comparison is constant-time via the HMAC primitive.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> Result<(), GatewayError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(GatewayError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(GatewayError::InvalidSignature);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| GatewayError::InvalidSignature)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(GatewayError::InvalidSignature)
}

/// Parses a verified webhook payload into the fields the order flow needs.
pub fn parse_webhook_event(payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
    let value: serde_json::Value = serde_json::from_slice(payload)
        .map_err(|e| GatewayError::MalformedEvent(e.to_string()))?;

    let event_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| GatewayError::MalformedEvent("missing event type".to_string()))?
        .to_string();
    let object = value
        .pointer("/data/object")
        .ok_or_else(|| GatewayError::MalformedEvent("missing data.object".to_string()))?;
    let payment_intent_id = object
        .get("id")
        .and_then(|id| id.as_str())
        .ok_or_else(|| GatewayError::MalformedEvent("missing intent id".to_string()))?
        .to_string();
    let order_id = object
        .pointer("/metadata/orderId")
        .and_then(|o| o.as_str())
        .map(str::to_string);

    Ok(WebhookEvent {
        event_type,
        payment_intent_id,
        order_id,
    })
}

// -- Test double --

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, IntentStatus>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory gateway for tests: issues synthetic intents whose status can
/// be flipped by the test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent create call fail with a gateway error.
    pub fn fail_on_create(&self, fail: bool) {
        self.state.write().expect("gateway lock").fail_on_create = fail;
    }

    /// Marks an intent as succeeded.
    pub fn succeed(&self, payment_intent_id: &str) {
        if let Some(intent) = self
            .state
            .write()
            .expect("gateway lock")
            .intents
            .get_mut(payment_intent_id)
        {
            intent.status = "succeeded".to_string();
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_intent(&self, req: CreateIntentRequest) -> Result<IntentCreated, GatewayError> {
        let mut state = self.state.write().expect("gateway lock");
        if state.fail_on_create {
            return Err(GatewayError::Api("card processor unavailable".to_string()));
        }
        state.next_id += 1;
        let id = format!("pi_test_{}", state.next_id);
        let client_secret = format!("{id}_secret");
        state.intents.insert(
            id.clone(),
            IntentStatus {
                id: id.clone(),
                status: "requires_payment_method".to_string(),
                amount_minor: to_minor_units(req.amount),
                currency: req.currency.to_lowercase(),
            },
        );
        Ok(IntentCreated {
            client_secret,
            payment_intent_id: id,
        })
    }

    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<IntentStatus, GatewayError> {
        self.state
            .read()
            .expect("gateway lock")
            .intents
            .get(payment_intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api(format!("No such intent: {payment_intent_id}")))
    }
}
