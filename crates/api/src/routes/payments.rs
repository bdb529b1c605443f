//! Payment endpoints: card payment intents, webhook ingestion, and the
//! mocked PayPal flow.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use domain::{OrderStatus, PaymentStatus};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{ApiError, AppJson};
use crate::gateway::{CreateIntentRequest, parse_webhook_event, verify_webhook_signature};
use crate::routes::orders::fetch_order;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentBody {
    pub order_number: String,
}

/// POST /api/payments/create-payment-intent — opens a card payment for an
/// order's total.
///
/// The order itself is untouched here; its payment record only changes
/// once the gateway reports an outcome (confirm or webhook).
#[tracing::instrument(skip(state, body), fields(order_number = %body.order_number))]
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<CreateIntentBody>,
) -> Result<Json<Value>, ApiError> {
    let order = fetch_order(&state, &body.order_number).await?;

    let intent = state
        .gateway
        .create_intent(CreateIntentRequest {
            amount: order.order_summary.total,
            currency: order.order_summary.currency.clone(),
            order_id: order.order_number.clone(),
            customer_email: order.customer.email.clone(),
            description: None,
        })
        .await?;

    metrics::counter!("payment_intents_created_total").increment(1);

    Ok(Json(json!({
        "success": true,
        "clientSecret": intent.client_secret,
        "paymentIntentId": intent.payment_intent_id,
        "amount": order.order_summary.total,
        "currency": order.order_summary.currency,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentBody {
    pub order_number: String,
    pub payment_intent_id: String,
}

/// POST /api/payments/confirm-payment — checks the intent's state at the
/// gateway and completes the order's payment if it succeeded.
#[tracing::instrument(skip(state, body), fields(order_number = %body.order_number))]
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<ConfirmPaymentBody>,
) -> Result<Json<Value>, ApiError> {
    let mut order = fetch_order(&state, &body.order_number).await?;

    let intent = state.gateway.retrieve_intent(&body.payment_intent_id).await?;
    if intent.status != "succeeded" {
        // Not an error: the charge is simply not finished at the gateway.
        return Ok(Json(json!({
            "success": false,
            "message": "Payment not completed",
            "status": intent.status,
        })));
    }

    order.set_payment_status(PaymentStatus::Completed, Some(intent.id));
    order.payment.gateway = Some("stripe".to_string());
    order.set_status(OrderStatus::Confirmed);
    state.store.update_order(&order).await?;

    metrics::counter!("payments_completed_total").increment(1);
    tracing::info!(order_number = %order.order_number, "payment confirmed");

    Ok(Json(json!({
        "success": true,
        "message": "Payment confirmed",
        "order": order,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCreateBody {
    pub order_number: String,
}

/// POST /api/payments/paypal-create-order — mocked PayPal order creation.
///
/// No PayPal credentials are wired up; this issues a synthetic order id so
/// the frontend flow can be exercised end to end.
#[tracing::instrument(skip(state, body), fields(order_number = %body.order_number))]
pub async fn paypal_create_order(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<PaypalCreateBody>,
) -> Result<Json<Value>, ApiError> {
    let order = fetch_order(&state, &body.order_number).await?;

    let paypal_order_id = format!(
        "PAYPAL_{}_{:06}",
        Utc::now().timestamp_millis(),
        rand::rng().random_range(0..1_000_000)
    );

    Ok(Json(json!({
        "success": true,
        "paypalOrderId": paypal_order_id,
        "status": "CREATED",
        "amount": order.order_summary.total,
        "currency": order.order_summary.currency,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCaptureBody {
    pub order_number: String,
    pub paypal_order_id: String,
}

/// POST /api/payments/paypal-capture — mocked capture; completes the
/// order's payment with the synthetic PayPal id as transaction reference.
#[tracing::instrument(skip(state, body), fields(order_number = %body.order_number))]
pub async fn paypal_capture(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<PaypalCaptureBody>,
) -> Result<Json<Value>, ApiError> {
    let mut order = fetch_order(&state, &body.order_number).await?;

    order.set_payment_status(PaymentStatus::Completed, Some(body.paypal_order_id));
    order.payment.gateway = Some("paypal".to_string());
    order.set_status(OrderStatus::Confirmed);
    state.store.update_order(&order).await?;

    metrics::counter!("payments_completed_total").increment(1);

    Ok(Json(json!({
        "success": true,
        "message": "PayPal payment captured",
        "order": order,
    })))
}

/// POST /api/payments/webhook/stripe — ingests gateway events over the raw
/// body, verifying the signature before parsing.
///
/// `payment_intent.succeeded` completes the order named in the intent's
/// metadata; `payment_intent.payment_failed` marks its payment failed.
/// Events for unknown orders are acknowledged and logged, not retried.
#[tracing::instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing webhook signature".to_string()))?;

    verify_webhook_signature(&body, signature, &state.config.stripe_webhook_secret)
        .map_err(|_| ApiError::BadRequest("Invalid webhook signature".to_string()))?;

    let event = parse_webhook_event(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed webhook event: {e}")))?;

    let outcome = match event.event_type.as_str() {
        "payment_intent.succeeded" => Some((PaymentStatus::Completed, Some(OrderStatus::Confirmed))),
        "payment_intent.payment_failed" => Some((PaymentStatus::Failed, None)),
        other => {
            tracing::debug!(event_type = other, "ignoring webhook event");
            None
        }
    };

    if let Some((payment_status, order_status)) = outcome {
        let Some(order_number) = event.order_id else {
            tracing::warn!(
                intent = %event.payment_intent_id,
                "webhook event carries no order reference"
            );
            return Ok(Json(json!({ "success": true, "received": true })));
        };

        match state.store.get_order(&order_number).await? {
            Some(mut order) => {
                order.set_payment_status(payment_status, Some(event.payment_intent_id));
                if let Some(status) = order_status {
                    order.set_status(status);
                }
                state.store.update_order(&order).await?;
                tracing::info!(
                    order_number = %order.order_number,
                    event_type = %event.event_type,
                    "order updated from webhook"
                );
            }
            None => {
                tracing::warn!(order_number = %order_number, "webhook for unknown order");
            }
        }
    }

    Ok(Json(json!({ "success": true, "received": true })))
}

/// GET /api/payments/methods — static capability listing for the checkout
/// page.
pub async fn methods() -> Json<Value> {
    Json(json!({
        "success": true,
        "methods": [
            { "id": "stripe", "name": "Credit/Debit Card", "enabled": true },
            { "id": "paypal", "name": "PayPal", "enabled": true },
            { "id": "bank_transfer", "name": "Bank Transfer", "enabled": true },
            { "id": "invoice", "name": "Invoice", "enabled": true },
        ],
    }))
}
