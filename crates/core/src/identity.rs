//! Signed-in user identity and the token pair issued at login

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the signed-in user as returned by the login endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl UserIdentity {
    /// Name to show in the UI, falling back to the login name
    pub fn display(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// True when at least one of `permissions` is granted
    pub fn has_any_permission<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        permissions.into_iter().any(|p| self.has_permission(p))
    }
}

/// Access/refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Absolute expiry of the access token, when the server reported one
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Build credentials from a token response, turning `expires_in` seconds
    /// into an absolute timestamp
    ///
    /// A lifetime too large to represent is treated as no expiry.
    pub fn issued_now(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime)),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_from_login_payload() {
        let user: UserIdentity = serde_json::from_value(json!({
            "userId": "u-1",
            "username": "alice",
            "displayName": "Alice Zhang",
            "email": "alice@example.com",
            "roles": ["DEVELOPER"],
            "permissions": ["process:read", "process:write"],
            "rolesWithSources": [{"roleCode": "DEVELOPER", "source": "DIRECT"}]
        }))
        .unwrap();

        assert_eq!(user.user_id, "u-1");
        assert_eq!(user.display(), "Alice Zhang");
        assert!(user.has_role("DEVELOPER"));
        assert!(user.has_permission("process:write"));
        assert!(!user.has_permission("user:delete"));
        assert!(user.has_any_permission(["user:delete", "process:read"]));
    }

    #[test]
    fn test_display_falls_back_to_username() {
        let user = UserIdentity {
            user_id: "u-2".into(),
            username: "bob".into(),
            display_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(user.display(), "bob");
    }

    #[test]
    fn test_credentials_expiry() {
        let creds = Credentials::issued_now("t", None, Some(60));
        let now = Utc::now();
        assert!(!creds.is_expired_at(now));
        assert!(creds.is_expired_at(now + Duration::seconds(120)));

        let forever = Credentials::issued_now("t", None, None);
        assert!(!forever.is_expired_at(now + Duration::days(365)));
    }

    #[test]
    fn test_unrepresentable_lifetime_means_no_expiry() {
        for secs in [i64::MAX, i64::MIN] {
            let creds = Credentials::issued_now("t", None, Some(secs));
            assert_eq!(creds.expires_at, None);
            assert!(!creds.is_expired());
        }
    }
}
