use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Fixed role set. Stored as TEXT, exchanged on the wire in kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseRoleError(value)),
        }
    }
}

/// User record. The password hash and reset-token fields never serialize;
/// queries that need the hash load it explicitly like everything else,
/// serialization is where the line is drawn.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip_serializing)]
    pub active: bool,
    #[serde(skip_serializing)]
    pub password_reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::User,
            active: true,
            password_reset_token_hash: Some("deadbeef".into()),
            password_reset_expires: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn password_and_reset_fields_never_serialize() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(json.contains("a@b.com"));
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("deadbeef"));
        assert!(!json.contains("active"));
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::User, Role::Guide, Role::LeadGuide, Role::Admin] {
            assert_eq!(Role::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert!(Role::try_from("superuser".to_string()).is_err());
    }

    #[test]
    fn role_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Role::LeadGuide).unwrap(),
            "\"lead-guide\""
        );
    }
}
