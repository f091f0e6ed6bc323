//! Records as seen by the query engine
//!
//! The engine never looks at a record's concrete shape. It asks for a stable
//! identifier, for the value behind a logical column id and, for `user`
//! filters, for a user sub-object exposing a display name and a handle.

use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Borrowed view of a user sub-object (display name and handle)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRef<'a> {
    pub name: &'a str,
    pub username: &'a str,
}

/// An item of the backing record set
pub trait Record: Clone + Send + Sync + 'static {
    /// Stable unique identifier, used for row selection
    fn id(&self) -> String;

    /// Resolve a logical column id to a value
    ///
    /// Column ids may name derived values rather than literal fields. Unknown
    /// columns resolve to [`FieldValue::Null`].
    fn field(&self, column_id: &str) -> FieldValue;

    /// The user sub-object matched by `user` filters on `column_id`
    fn user(&self, _column_id: &str) -> Option<UserRef<'_>> {
        None
    }
}

// =============================================================================
// Post
// =============================================================================

/// Author of a [`Post`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub username: String,
}

/// A blog post, the record shape of the bundled posts table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub category: String,
    pub author: Option<Author>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        title: impl Into<String>,
        status: impl Into<String>,
        category: impl Into<String>,
        author: Option<Author>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            status: status.into(),
            category: category.into(),
            author,
            created_at,
            updated_at: created_at,
        }
    }
}

impl Record for Post {
    fn id(&self) -> String {
        self.id.to_string()
    }

    fn field(&self, column_id: &str) -> FieldValue {
        match column_id {
            "id" => FieldValue::Uuid(self.id),
            "title" => self.title.as_str().into(),
            "status" => self.status.as_str().into(),
            "category" => self.category.as_str().into(),
            // The author column displays, filters and sorts by name
            "author" => self.author.as_ref().map(|a| a.name.as_str()).into(),
            "createdAt" => self.created_at.into(),
            "updatedAt" => self.updated_at.into(),
            _ => FieldValue::Null,
        }
    }

    fn user(&self, _column_id: &str) -> Option<UserRef<'_>> {
        self.author.as_ref().map(|a| UserRef {
            name: &a.name,
            username: &a.username,
        })
    }
}

// =============================================================================
// JsonRecord
// =============================================================================

/// A record backed by an arbitrary JSON object
///
/// Column ids are looked up as top-level keys or dotted paths
/// (`author.username`). A column holding an object with a `name` key resolves
/// to that name, so `author` behaves like a derived display column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonRecord(pub Value);

impl JsonRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    fn lookup(&self, column_id: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(column_id) {
            return Some(value);
        }
        column_id
            .split('.')
            .try_fold(&self.0, |current, segment| current.get(segment))
    }
}

impl Record for JsonRecord {
    fn id(&self) -> String {
        match self.0.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => FieldValue::from_json(other).coerce_to_string().into_owned(),
            None => String::new(),
        }
    }

    fn field(&self, column_id: &str) -> FieldValue {
        match self.lookup(column_id) {
            Some(Value::Object(map)) => map
                .get("name")
                .map(FieldValue::from_json)
                .unwrap_or(FieldValue::Null),
            Some(value) => FieldValue::from_json(value),
            None => FieldValue::Null,
        }
    }

    fn user(&self, column_id: &str) -> Option<UserRef<'_>> {
        let object = self.lookup(column_id)?.as_object()?;
        Some(UserRef {
            name: object.get("name")?.as_str()?,
            username: object.get("username")?.as_str()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn post() -> Post {
        Post::new(
            "Hello",
            "draft",
            "news",
            Some(Author {
                name: "Ada Lovelace".to_string(),
                username: "ada".to_string(),
            }),
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        )
    }

    #[test]
    fn test_post_fields() {
        let post = post();
        assert_eq!(post.field("title"), FieldValue::from("Hello"));
        assert_eq!(post.field("author"), FieldValue::from("Ada Lovelace"));
        assert!(matches!(post.field("createdAt"), FieldValue::DateTime(_)));
        assert!(post.field("unknown").is_null());
        assert_eq!(post.id(), post.id.to_string());
    }

    #[test]
    fn test_post_without_author() {
        let mut post = post();
        post.author = None;
        assert!(post.field("author").is_null());
        assert!(post.user("author").is_none());
    }

    #[test]
    fn test_post_serializes_camel_case() {
        let json = serde_json::to_value(post()).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_json_record_lookup() {
        let record = JsonRecord::new(json!({
            "id": 17,
            "status": "published",
            "author": {"name": "Grace", "username": "hopper"}
        }));

        assert_eq!(record.id(), "17");
        assert_eq!(record.field("status"), FieldValue::from("published"));
        assert_eq!(record.field("author"), FieldValue::from("Grace"));
        assert_eq!(record.field("author.username"), FieldValue::from("hopper"));

        let user = record.user("author").unwrap();
        assert_eq!(user.name, "Grace");
        assert_eq!(user.username, "hopper");
    }

    #[test]
    fn test_json_record_missing_user() {
        let record = JsonRecord::new(json!({"id": "a", "author": "plain string"}));
        assert!(record.user("author").is_none());
        assert!(record.user("missing").is_none());
    }
}
