//! Authenticated identity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duka_core::{Email, Role, UserId};

/// Initials shown when no display name is available.
pub const PLACEHOLDER_INITIAL: &str = "U";

/// The signed-in account, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account ID.
    pub id: UserId,
    /// Login email.
    pub email: Email,
    /// Display name.
    pub full_name: String,
    /// Account role.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Up to two uppercase initials of the display name.
    #[must_use]
    pub fn initials(&self) -> String {
        initials(&self.full_name)
    }

    /// Merge the fields present in `patch` into this identity.
    pub fn apply(&mut self, patch: IdentityPatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(full_name) = patch.full_name {
            self.full_name = full_name;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Partial update of an [`Identity`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityPatch {
    pub email: Option<Email>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Initials of a display name: first letter of each word, uppercased,
/// capped at two characters. Falls back to [`PLACEHOLDER_INITIAL`].
#[must_use]
pub fn initials(full_name: &str) -> String {
    let letters: String = full_name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();

    if letters.is_empty() {
        PLACEHOLDER_INITIAL.to_string()
    } else {
        letters
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        serde_json::from_str(
            r#"{
                "id": "0b6f3a3e-54a4-4a55-9d3c-3d3f0c1a2b4c",
                "email": "amina@duka.co.ke",
                "full_name": "Amina Wanjiru Otieno",
                "role": "customer",
                "created_at": "2025-01-05T09:30:00Z",
                "updated_at": "2025-01-05T09:30:00Z"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("amina wanjiru otieno"), "AW");
        assert_eq!(initials("  juma  "), "J");
        assert_eq!(initials(""), "U");
        assert_eq!(initials("   "), "U");
        assert_eq!(identity().initials(), "AW");
    }

    #[test]
    fn test_apply_patch() {
        let mut identity = identity();
        let before = identity.clone();

        identity.apply(IdentityPatch::default());
        assert_eq!(identity, before);

        identity.apply(IdentityPatch {
            full_name: Some("Amina Otieno".to_string()),
            ..Default::default()
        });
        assert_eq!(identity.full_name, "Amina Otieno");
        assert_eq!(identity.email, before.email);
        assert_eq!(identity.role, Role::Customer);
    }

    #[test]
    fn test_rejects_unknown_role() {
        let json = r#"{
            "id": "0b6f3a3e-54a4-4a55-9d3c-3d3f0c1a2b4c",
            "email": "amina@duka.co.ke",
            "full_name": "Amina",
            "role": "owner",
            "created_at": "2025-01-05T09:30:00Z",
            "updated_at": "2025-01-05T09:30:00Z"
        }"#;
        assert!(serde_json::from_str::<Identity>(json).is_err());
    }
}
