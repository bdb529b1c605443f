//! Order endpoints: creation with VAT totals, listing, status and payment
//! updates, and the guarded cancel path.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{
    BookingDetails, CustomerDetails, Order, OrderLine, OrderNotes, OrderStatus, PaymentMethod,
    PaymentStatus,
};
use serde::Deserialize;
use serde_json::{Value, json};
use store::{OrderQuery, OrderSort, Page, SortOrder};

use crate::AppState;
use crate::error::{ApiError, AppJson};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub customer_email: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// GET /api/orders — filterable listing, newest first by default.
///
/// A status filter that names no known status matches nothing rather than
/// erroring.
#[tracing::instrument(skip(state, params))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let defaults = OrderQuery::default();
    let page_number = params.page.unwrap_or(defaults.page).max(1);
    let limit = params.limit.unwrap_or(defaults.limit).clamp(1, 100);

    let status = match &params.status {
        Some(raw) => match serde_json::from_value::<OrderStatus>(Value::String(raw.clone())) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                let empty: Page<Order> = Page::new(vec![], page_number, limit, 0);
                return Ok(Json(json!({
                    "success": true,
                    "count": 0,
                    "pagination": empty,
                    "orders": [],
                })));
            }
        },
        None => None,
    };

    let query = OrderQuery {
        status,
        customer_email: params.customer_email.map(|e| e.to_lowercase()),
        page: page_number,
        limit,
        sort_by: params
            .sort_by
            .as_deref()
            .map(OrderSort::parse)
            .unwrap_or(defaults.sort_by),
        sort_order: params
            .sort_order
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or(defaults.sort_order),
    };

    let mut page = state.store.list_orders(query).await?;
    let orders = std::mem::take(&mut page.items);

    Ok(Json(json!({
        "success": true,
        "count": orders.len(),
        "pagination": page,
        "orders": orders,
    })))
}

/// GET /api/orders/{orderNumber} — single order lookup.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = fetch_order(&state, &order_number).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer: CustomerDetails,
    pub courses: Vec<OrderLine>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub booking_details: Option<BookingDetails>,
    #[serde(default)]
    pub notes: Option<OrderNotes>,
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Stripe
}

/// POST /api/orders — creates a Pending order with computed VAT totals.
#[tracing::instrument(skip(state, request), fields(email = %request.customer.email))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut order = Order::create(request.customer, request.courses, request.payment_method)?;
    order.booking_details = request.booking_details;
    order.notes = request.notes;

    let order = state.store.insert_order(order).await?;

    metrics::counter!("orders_created_total").increment(1);
    tracing::info!(order_number = %order.order_number, total = order.order_summary.total, "order created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Order created successfully",
            "order": order,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// PUT /api/orders/{orderNumber}/status — administrative status change.
#[tracing::instrument(skip(state, request))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
    AppJson(request): AppJson<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut order = fetch_order(&state, &order_number).await?;
    order.set_status(request.status);
    state.store.update_order(&order).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Order status updated",
        "order": order,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// PUT /api/orders/{orderNumber}/payment — records a payment outcome.
///
/// Moving to Completed stamps the payment date.
#[tracing::instrument(skip(state, request))]
pub async fn update_payment(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
    AppJson(request): AppJson<UpdatePaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut order = fetch_order(&state, &order_number).await?;
    order.set_payment_status(request.payment_status, request.transaction_id);
    state.store.update_order(&order).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment status updated",
        "order": order,
    })))
}

/// DELETE /api/orders/{orderNumber} — cancels an order.
///
/// Only Pending and Confirmed orders can be cancelled; anything further
/// along is a 400.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut order = fetch_order(&state, &order_number).await?;
    order.cancel()?;
    state.store.update_order(&order).await?;

    metrics::counter!("orders_cancelled_total").increment(1);
    tracing::info!(order_number = %order.order_number, "order cancelled");

    Ok(Json(json!({
        "success": true,
        "message": "Order cancelled successfully",
        "order": order,
    })))
}

pub(crate) async fn fetch_order(state: &AppState, order_number: &str) -> Result<Order, ApiError> {
    state
        .store
        .get_order(order_number)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
}
