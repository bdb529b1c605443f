//! Course catalogue entries with embedded reviews and derived ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Course category.
///
/// A closed set matching the accreditation bodies and course families the
/// training provider offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "CITB")]
    Citb,
    #[serde(rename = "IOSH")]
    Iosh,
    #[serde(rename = "NEBOSH")]
    Nebosh,
    #[serde(rename = "First Aid")]
    FirstAid,
    #[serde(rename = "Fire Safety")]
    FireSafety,
    #[serde(rename = "Traffic Marshal")]
    TrafficMarshal,
    #[serde(rename = "CSCS")]
    Cscs,
    Online,
}

impl Category {
    /// Returns the category name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Citb => "CITB",
            Category::Iosh => "IOSH",
            Category::Nebosh => "NEBOSH",
            Category::FirstAid => "First Aid",
            Category::FireSafety => "Fire Safety",
            Category::TrafficMarshal => "Traffic Marshal",
            Category::Cscs => "CSCS",
            Category::Online => "Online",
        }
    }

    /// Parses a category from its wire name. Returns None for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CITB" => Some(Category::Citb),
            "IOSH" => Some(Category::Iosh),
            "NEBOSH" => Some(Category::Nebosh),
            "First Aid" => Some(Category::FirstAid),
            "Fire Safety" => Some(Category::FireSafety),
            "Traffic Marshal" => Some(Category::TrafficMarshal),
            "CSCS" => Some(Category::Cscs),
            "Online" => Some(Category::Online),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Course difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::Professional => "Professional",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a course syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusEntry {
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
}

/// Instructor details shown on a course page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// A customer review embedded in a course document.
///
/// The user reference is weak: it identifies the reviewer without tying the
/// review's lifecycle to the user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user: Option<Uuid>,
    pub rating: u8,
    pub comment: String,
    pub date: DateTime<Utc>,
}

impl Review {
    /// Creates a review dated now. Rating must be in 1..=5.
    pub fn new(user: Option<Uuid>, rating: u8, comment: impl Into<String>) -> Result<Self, DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::InvalidRating { rating });
        }
        Ok(Self {
            user,
            rating,
            comment: comment.into(),
            date: Utc::now(),
        })
    }
}

/// A purchasable training course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    /// URL-safe unique identifier derived from the title.
    pub slug: String,
    pub description: String,
    #[serde(default)]
    pub short_description: Option<String>,
    pub price: f64,
    pub duration: String,
    pub category: Category,
    pub level: Level,
    pub accreditation: String,
    pub image: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub syllabus: Vec<SyllabusEntry>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub assessment: String,
    pub certificate: String,
    pub validity: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_max_students")]
    pub max_students: u32,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub instructor: Option<Instructor>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Mean of review ratings; 0 when no reviews exist.
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn default_max_students() -> u32 {
    20
}

fn default_location() -> String {
    "London, UK".to_string()
}

impl Course {
    /// Appends a review and recomputes the derived rating fields.
    pub fn push_review(&mut self, review: Review) {
        self.reviews.push(review);
        self.recalculate_rating();
        self.updated_at = Utc::now();
    }

    /// Recomputes `average_rating` and `total_reviews` from the review list.
    pub fn recalculate_rating(&mut self) {
        if self.reviews.is_empty() {
            self.average_rating = 0.0;
            self.total_reviews = 0;
        } else {
            let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            self.average_rating = f64::from(total) / self.reviews.len() as f64;
            self.total_reviews = self.reviews.len() as u32;
        }
    }

    /// Returns true if the free-text query matches this course.
    ///
    /// Case-insensitive substring match over title, description and short
    /// description.
    pub fn matches_search(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.title.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
            || self
                .short_description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&q))
    }
}

/// Derives a URL-safe slug from a course title.
///
/// Lowercases the title, collapses every run of non-alphanumeric characters
/// into a single hyphen and strips leading/trailing hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_course() -> Course {
        let now = Utc::now();
        Course {
            id: Uuid::new_v4(),
            title: "Emergency First Aid at Work".to_string(),
            slug: slugify("Emergency First Aid at Work"),
            description: "One-day emergency first aid training.".to_string(),
            short_description: Some("EFAW one-day course".to_string()),
            price: 95.0,
            duration: "1 day".to_string(),
            category: Category::FirstAid,
            level: Level::Beginner,
            accreditation: "HSE".to_string(),
            image: "/images/efaw.jpg".to_string(),
            gallery: vec![],
            syllabus: vec![],
            learning_outcomes: vec![],
            prerequisites: vec![],
            assessment: "Practical".to_string(),
            certificate: "EFAW Certificate".to_string(),
            validity: "3 years".to_string(),
            is_online: false,
            is_active: true,
            max_students: 20,
            start_dates: vec![],
            location: "London, UK".to_string(),
            instructor: None,
            reviews: vec![],
            average_rating: 0.0,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn slugify_collapses_non_alphanumeric_runs() {
        assert_eq!(
            slugify("CITB Health & Safety Awareness Course!"),
            "citb-health-safety-awareness-course"
        );
    }

    #[test]
    fn slugify_strips_leading_and_trailing_hyphens() {
        assert_eq!(slugify("  --Fire Marshal--  "), "fire-marshal");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_is_lowercase() {
        assert_eq!(slugify("IOSH Managing Safely"), "iosh-managing-safely");
    }

    #[test]
    fn new_course_has_zero_rating() {
        let course = sample_course();
        assert_eq!(course.average_rating, 0.0);
        assert_eq!(course.total_reviews, 0);
    }

    #[test]
    fn push_review_recomputes_mean() {
        let mut course = sample_course();
        course.push_review(Review::new(None, 4, "Clear and practical").unwrap());
        course.push_review(Review::new(None, 5, "Excellent trainer").unwrap());
        course.push_review(Review::new(None, 3, "Venue was cramped").unwrap());

        assert_eq!(course.total_reviews, 3);
        assert!((course.average_rating - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn review_rejects_out_of_range_rating() {
        assert!(Review::new(None, 0, "too low").is_err());
        assert!(Review::new(None, 6, "too high").is_err());
        assert!(Review::new(None, 1, "fine").is_ok());
        assert!(Review::new(None, 5, "fine").is_ok());
    }

    #[test]
    fn search_matches_are_case_insensitive() {
        let course = sample_course();
        assert!(course.matches_search("first aid"));
        assert!(course.matches_search("EMERGENCY"));
        assert!(course.matches_search("efaw"));
        assert!(!course.matches_search("scaffolding"));
    }

    #[test]
    fn category_round_trips_through_wire_names() {
        for c in [
            Category::Citb,
            Category::Iosh,
            Category::Nebosh,
            Category::FirstAid,
            Category::FireSafety,
            Category::TrafficMarshal,
            Category::Cscs,
            Category::Online,
        ] {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
        assert_eq!(Category::parse("Scuba"), None);
    }

    #[test]
    fn category_serializes_to_wire_name() {
        let json = serde_json::to_string(&Category::FirstAid).unwrap();
        assert_eq!(json, "\"First Aid\"");
    }

    #[test]
    fn course_serializes_with_camel_case_fields() {
        let course = sample_course();
        let value = serde_json::to_value(&course).unwrap();
        assert!(value.get("shortDescription").is_some());
        assert!(value.get("isActive").is_some());
        assert!(value.get("averageRating").is_some());
    }
}
