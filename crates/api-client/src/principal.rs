//! Authenticated user profile

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Application role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// System administrator
    Admin,
    /// Developer with diagnostic tools
    Developer,
    /// Ambulance/transport driver
    Driver,
    /// Community volunteer registering patients
    #[default]
    Community,
    /// Radio dispatch centre
    RadioCenter,
    /// Office staff
    Officer,
    /// Executive dashboards only
    Executive,
}

impl UserRole {
    /// Normalise a role string from the server
    ///
    /// Case-insensitive. The legacy `radio` role maps to [`UserRole::RadioCenter`];
    /// anything unknown maps to [`UserRole::Community`].
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "ADMIN" => Self::Admin,
            "DEVELOPER" => Self::Developer,
            "DRIVER" => Self::Driver,
            "RADIO" | "RADIO_CENTER" => Self::RadioCenter,
            "OFFICER" => Self::Officer,
            "EXECUTIVE" => Self::Executive,
            _ => Self::Community,
        }
    }

    /// Wire name of the role
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Developer => "DEVELOPER",
            Self::Driver => "DRIVER",
            Self::Community => "COMMUNITY",
            Self::RadioCenter => "RADIO_CENTER",
            Self::Officer => "OFFICER",
            Self::Executive => "EXECUTIVE",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user a session belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Server-side identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Normalised role
    pub role: UserRole,
}

impl Principal {
    /// Build a principal from a server (or persisted) user object
    ///
    /// Returns `None` unless `user` is a JSON object. `fallback_email` fills in
    /// missing email and name fields.
    #[must_use]
    pub fn from_value(user: &Value, fallback_email: &str) -> Option<Self> {
        let object = user.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let id = match object.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let email = text("email").unwrap_or_else(|| fallback_email.to_string());
        let name = text("full_name")
            .or_else(|| text("name"))
            .unwrap_or_else(|| email.clone());
        let role = text("role").map_or_else(UserRole::default, |r| UserRole::normalize(&r));

        Some(Self {
            id,
            name,
            email,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_normalization() {
        assert_eq!(UserRole::normalize("admin"), UserRole::Admin);
        assert_eq!(UserRole::normalize(" Driver "), UserRole::Driver);
        assert_eq!(UserRole::normalize("radio"), UserRole::RadioCenter);
        assert_eq!(UserRole::normalize("radio_center"), UserRole::RadioCenter);
        assert_eq!(UserRole::normalize("superuser"), UserRole::Community);
        assert_eq!(UserRole::normalize(""), UserRole::Community);
    }

    #[test]
    fn test_from_server_user() {
        let user = json!({
            "id": 42,
            "full_name": "Somchai Jaidee",
            "email": "somchai@wecare.ems",
            "role": "officer"
        });

        let principal = Principal::from_value(&user, "ignored@x").unwrap();
        assert_eq!(principal.id.as_deref(), Some("42"));
        assert_eq!(principal.name, "Somchai Jaidee");
        assert_eq!(principal.role, UserRole::Officer);
    }

    #[test]
    fn test_name_falls_back_to_email() {
        let principal = Principal::from_value(&json!({"role": "DRIVER"}), "d@wecare.dev").unwrap();
        assert_eq!(principal.email, "d@wecare.dev");
        assert_eq!(principal.name, "d@wecare.dev");
        assert!(principal.id.is_none());
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(Principal::from_value(&json!("user"), "a@b.com").is_none());
        assert!(Principal::from_value(&Value::Null, "a@b.com").is_none());
    }

    #[test]
    fn test_persisted_roundtrip_upgrades_legacy_role() {
        let persisted = json!({"id": "7", "name": "Radio Desk", "email": "r@w", "role": "radio"});
        let principal = Principal::from_value(&persisted, "").unwrap();

        assert_eq!(principal.role, UserRole::RadioCenter);
        let stored = serde_json::to_value(&principal).unwrap();
        assert_eq!(stored["role"], "RADIO_CENTER");
    }
}
