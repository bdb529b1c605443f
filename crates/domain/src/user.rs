//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
///
/// `password_hash` holds the bcrypt hash, never the plaintext. API response
/// types must not expose it; it is serialized here only so the store can
/// persist the full document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Stored lowercase; uniqueness enforced by the store.
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_roles() -> Vec<String> {
    vec!["customer".to_string()]
}

impl User {
    /// Creates a new customer account. The email is lowercased on the way in.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into().to_lowercase(),
            password_hash: password_hash.into(),
            phone,
            roles: default_roles(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the user holds the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults_to_customer_role() {
        let user = User::new("Dana", "Obi", "dana@example.com", "hash", None);
        assert_eq!(user.roles, vec!["customer".to_string()]);
        assert!(user.has_role("customer"));
        assert!(!user.has_role("admin"));
    }

    #[test]
    fn new_user_lowercases_email() {
        let user = User::new("Dana", "Obi", "Dana@Example.COM", "hash", None);
        assert_eq!(user.email, "dana@example.com");
    }

    #[test]
    fn missing_roles_deserialize_to_customer() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "firstName": "Dana",
            "lastName": "Obi",
            "email": "dana@example.com",
            "passwordHash": "hash",
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.roles, vec!["customer".to_string()]);
    }
}
