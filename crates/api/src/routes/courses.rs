//! Course catalogue endpoints: listing, lookup, search and reviews.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::{Category, Course, Level, Review};
use serde::Deserialize;
use serde_json::{Value, json};
use store::{CourseQuery, CourseSort, SortOrder};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::{ApiError, AppJson};

/// Raw listing query parameters; every field is optional and unknown values
/// fall back to defaults rather than erroring.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub category: Option<String>,
    pub level: Option<String>,
    pub is_online: Option<bool>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListParams {
    fn into_query(self) -> CourseQuery {
        let defaults = CourseQuery::default();
        CourseQuery {
            category: self.category.as_deref().and_then(Category::parse),
            level: self
                .level
                .and_then(|l| serde_json::from_value::<Level>(Value::String(l)).ok()),
            is_online: self.is_online,
            search: self.search,
            min_price: self.min_price,
            max_price: self.max_price,
            page: self.page.unwrap_or(defaults.page).max(1),
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, 100),
            sort_by: self
                .sort_by
                .as_deref()
                .map(CourseSort::parse)
                .unwrap_or(defaults.sort_by),
            sort_order: self
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or(defaults.sort_order),
        }
    }
}

/// GET /api/courses — paginated, filterable catalogue listing.
#[tracing::instrument(skip(state, params))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let mut page = state.store.list_courses(params.into_query()).await?;
    let courses = std::mem::take(&mut page.items);

    Ok(Json(json!({
        "success": true,
        "count": courses.len(),
        "pagination": page,
        "courses": courses,
    })))
}

/// GET /api/courses/{slug} — single course by slug.
#[tracing::instrument(skip(state))]
pub async fn get_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course = state
        .store
        .get_course_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(json!({ "success": true, "course": course })))
}

/// GET /api/courses/category/{category} — all active courses in a category.
///
/// An unknown category is not an error; it returns an empty list.
#[tracing::instrument(skip(state))]
pub async fn by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let courses: Vec<Course> = match Category::parse(&category) {
        Some(parsed) => state.store.list_courses_by_category(parsed).await?,
        None => vec![],
    };

    Ok(Json(json!({
        "success": true,
        "category": category,
        "count": courses.len(),
        "courses": courses,
    })))
}

/// GET /api/courses/search/{query} — free-text search, echoing the query.
#[tracing::instrument(skip(state))]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let courses = state.store.search_courses(&query).await?;

    Ok(Json(json!({
        "success": true,
        "searchQuery": query,
        "count": courses.len(),
        "courses": courses,
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
    #[validate(length(min = 10, max = 500, message = "Comment must be 10-500 characters"))]
    pub comment: String,
    #[serde(default)]
    pub user: Option<Uuid>,
}

/// POST /api/courses/{id}/review — appends a review and returns the course
/// with its recomputed average rating.
#[tracing::instrument(skip(state, request), fields(course_id = %id))]
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<ReviewRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;

    let review = Review::new(request.user, request.rating, request.comment)?;
    let course = state
        .store
        .add_review(id, review)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    metrics::counter!("course_reviews_total").increment(1);

    Ok(Json(json!({
        "success": true,
        "message": "Review added successfully",
        "course": course,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::slugify;

    #[test]
    fn list_params_default_to_catalogue_defaults() {
        let query = ListParams::default().into_query();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 12);
        assert_eq!(query.sort_by, CourseSort::Title);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    #[test]
    fn list_params_clamp_page_and_limit() {
        let params = ListParams {
            page: Some(0),
            limit: Some(5000),
            ..Default::default()
        };
        let query = params.into_query();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn unknown_category_and_level_fall_back_to_none() {
        let params = ListParams {
            category: Some("Scuba Diving".to_string()),
            level: Some("Galactic".to_string()),
            ..Default::default()
        };
        let query = params.into_query();
        assert!(query.category.is_none());
        assert!(query.level.is_none());
    }

    #[test]
    fn slug_helper_matches_catalogue_slugs() {
        assert_eq!(slugify("Fire Safety & You"), "fire-safety-you");
    }
}
