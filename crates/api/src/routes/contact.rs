//! Contact and quote-request forms.
//!
//! Each submission triggers two emails: a notification to the company
//! inbox and a confirmation back to the sender.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::AppState;
use crate::error::{ApiError, AppJson};
use crate::mailer::OutboundEmail;

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[validate(length(min = 10, max = 2000, message = "Message must be 10-2000 characters"))]
    pub message: String,
}

/// POST /api/contact — general enquiry form.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn submit(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<ContactRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;

    let subject = request
        .subject
        .clone()
        .unwrap_or_else(|| "Website enquiry".to_string());

    state
        .mailer
        .send(OutboundEmail {
            to: state.config.contact_email.clone(),
            subject: format!("New contact form submission: {subject}"),
            html: contact_notification_html(&request),
        })
        .await?;

    state
        .mailer
        .send(OutboundEmail {
            to: request.email.clone(),
            subject: "We have received your enquiry".to_string(),
            html: contact_confirmation_html(&request.name),
        })
        .await?;

    metrics::counter!("contact_submissions_total").increment(1);
    tracing::info!("contact form submitted");

    Ok(Json(json!({
        "success": true,
        "message": "Your message has been sent successfully",
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[serde(default)]
    pub company: Option<String>,
    #[validate(length(min = 1, message = "Course is required"))]
    pub course: String,
    #[validate(range(min = 1, message = "Number of participants must be at least 1"))]
    #[serde(default = "default_participants")]
    pub participants: u32,
    #[serde(default)]
    pub preferred_date: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

fn default_participants() -> u32 {
    1
}

/// POST /api/contact/quote — group-training quote request.
#[tracing::instrument(skip(state, request), fields(email = %request.email, course = %request.course))]
pub async fn quote(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<QuoteRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;

    state
        .mailer
        .send(OutboundEmail {
            to: state.config.contact_email.clone(),
            subject: format!("New quote request: {}", request.course),
            html: quote_notification_html(&request),
        })
        .await?;

    state
        .mailer
        .send(OutboundEmail {
            to: request.email.clone(),
            subject: "Your quote request has been received".to_string(),
            html: quote_confirmation_html(&request.name, &request.course),
        })
        .await?;

    metrics::counter!("quote_requests_total").increment(1);
    tracing::info!("quote request submitted");

    Ok(Json(json!({
        "success": true,
        "message": "Quote request submitted successfully",
    })))
}

fn contact_notification_html(request: &ContactRequest) -> String {
    format!(
        "<h2>New contact form submission</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Phone:</strong> {}</p>\
         <p><strong>Subject:</strong> {}</p>\
         <p><strong>Message:</strong></p><p>{}</p>",
        request.name,
        request.email,
        request.phone.as_deref().unwrap_or("Not provided"),
        request.subject.as_deref().unwrap_or("Website enquiry"),
        request.message,
    )
}

fn contact_confirmation_html(name: &str) -> String {
    format!(
        "<h2>Thank you for getting in touch, {name}</h2>\
         <p>We have received your enquiry and will respond within one \
         working day.</p>"
    )
}

fn quote_notification_html(request: &QuoteRequest) -> String {
    format!(
        "<h2>New quote request</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Phone:</strong> {}</p>\
         <p><strong>Company:</strong> {}</p>\
         <p><strong>Course:</strong> {}</p>\
         <p><strong>Participants:</strong> {}</p>\
         <p><strong>Preferred date:</strong> {}</p>\
         <p><strong>Message:</strong></p><p>{}</p>",
        request.name,
        request.email,
        request.phone,
        request.company.as_deref().unwrap_or("Not provided"),
        request.course,
        request.participants,
        request.preferred_date.as_deref().unwrap_or("Flexible"),
        request.message.as_deref().unwrap_or(""),
    )
}

fn quote_confirmation_html(name: &str, course: &str) -> String {
    format!(
        "<h2>Thank you for your quote request, {name}</h2>\
         <p>We have received your request for <strong>{course}</strong> \
         training and will send a tailored quote within one working day.</p>"
    )
}
