//! Record types held by a session's object stores.
//!
//! Field names on the wire follow the RealWorld API (`createdAt`, `tagList`),
//! while foreign keys keep their snake_case spelling (`author_id`,
//! `article_id`) as the persisted snapshot format expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A value an object store can hold.
///
/// The store owns id assignment: it calls [`Record::set_id`] exactly once,
/// on insertion.
pub trait Record {
    /// The id assigned by the owning store (empty until inserted).
    fn id(&self) -> &str;

    /// Assign the store-generated id.
    fn set_id(&mut self, id: String);
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub username: String,
    /// Hex SHA-256 of the password, see [`hash_password`].
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user from an already hashed password.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        hashed_password: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            email: email.into(),
            username: username.into(),
            password: hashed_password.into(),
            bio: String::new(),
            image: None,
            created_at: Utc::now(),
        }
    }

    /// Set the bio.
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    /// Set the avatar image URL.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Whether this user matches a login attempt.
    pub fn has_credentials(&self, email: &str, hashed_password: &str) -> bool {
        self.email == email && self.password == hashed_password
    }
}

/// A published article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "tagList", default)]
    pub tag_list: Vec<String>,
    pub author_id: String,
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A comment on an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub body: String,
    pub article_id: String,
    pub author_id: String,
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn set_id(&mut self, id: String) {
                    self.id = id;
                }
            }
        )*
    };
}

impl_record!(User, Article, Comment);

/// Hash a password the way stored users expect: lowercase hex SHA-256.
///
/// Not a password KDF. Demo credentials only.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_hex_sha256() {
        assert_eq!(
            hash_password("password123"),
            "ef92b778bafe771e89245b89ecbc08a44a4e166c06659911881f383d4473e94f"
        );
    }

    #[test]
    fn test_user_credentials() {
        let user = User::new("a@example.com", "alice", hash_password("secret"));
        assert!(user.has_credentials("a@example.com", &hash_password("secret")));
        assert!(!user.has_credentials("a@example.com", &hash_password("other")));
        assert!(!user.has_credentials("b@example.com", &hash_password("secret")));
    }

    #[test]
    fn test_wire_field_names() {
        let user = User::new("a@example.com", "alice", "hash");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());

        let comment: Comment = serde_json::from_value(serde_json::json!({
            "id": "1",
            "body": "hi",
            "article_id": "2",
            "author_id": "3",
        }))
        .unwrap();
        assert_eq!(comment.article_id, "2");
    }
}
