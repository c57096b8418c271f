use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

/// A user row, joined with its role name when loaded from the store.
///
/// `password` holds the Argon2id digest, never the clear text. `phone` is
/// optional and stored as NULL when absent so the unique index ignores
/// missing values.
///
/// Serializing a `User` produces the replication event payload: every column
/// of the row, timestamps in RFC 3339. `role_name` is a join artifact, not a
/// column, and is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role_id: String,
    #[serde(skip)]
    pub role_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            phone: row.try_get("phone")?,
            role_id: row.try_get("role_id")?,
            role_name: row.try_get("role_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A role row. Users reference roles by id without a foreign key, so a role
/// lookup can miss even for a stored user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}

impl<'r> FromRow<'r, PgRow> for Role {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "3f6c2a9e-1d54-4f6b-9c1e-8a2b5d7e0f13".to_string(),
            name: "Jane Doe".to_string(),
            username: "jane".to_string(),
            email: "jane@example.com".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            phone: Some("6281234567890".to_string()),
            role_id: "role-1".to_string(),
            role_name: Some("admin".to_string()),
            created_at: "2024-01-15T10:00:00Z".parse().unwrap(),
            updated_at: "2024-01-15T10:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_event_payload_covers_all_columns() {
        let value = serde_json::to_value(sample_user()).unwrap();
        let obj = value.as_object().unwrap();

        for key in [
            "id",
            "name",
            "username",
            "email",
            "password",
            "phone",
            "role_id",
            "created_at",
            "updated_at",
        ] {
            assert!(obj.contains_key(key), "payload missing {key}");
        }

        // role_name comes from the join, it is not part of the row
        assert!(!obj.contains_key("role_name"));
    }

    #[test]
    fn test_missing_phone_serializes_as_null() {
        let mut user = sample_user();
        user.phone = None;

        let value = serde_json::to_value(user).unwrap();
        assert!(value.get("phone").unwrap().is_null());
    }

    #[test]
    fn test_timestamps_serialize_as_rfc3339() {
        let value = serde_json::to_value(sample_user()).unwrap();
        let created = value.get("created_at").and_then(|v| v.as_str()).unwrap();

        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }
}
