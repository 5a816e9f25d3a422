//! Local user records and the identity asserted by the upstream provider.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identity returned by the upstream provider's profile endpoint.
///
/// Field names follow Google's v2 userinfo response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Stable subject identifier at the upstream provider.
    #[serde(rename = "id")]
    pub subject: String,

    /// Email address.
    #[serde(default)]
    pub email: String,

    /// Whether the provider has verified the email address.
    #[serde(default, rename = "verified_email")]
    pub email_verified: bool,

    /// Full display name.
    #[serde(default)]
    pub name: String,

    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Profile picture URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// A local user, created on first federated login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Local user id; the `sub` claim of issued tokens.
    pub id: String,

    /// Email address.
    pub email: String,

    /// Whether the email address is verified.
    pub email_verified: bool,

    /// Full display name.
    pub name: String,

    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Profile picture URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Subject identifier at the upstream provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// When the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Builds a new user from an upstream identity.
    #[must_use]
    pub fn from_identity(id: impl Into<String>, identity: &ExternalIdentity) -> Self {
        let now = OffsetDateTime::now_utc();
        let mut user = Self {
            id: id.into(),
            email: String::new(),
            email_verified: false,
            name: String::new(),
            given_name: None,
            family_name: None,
            picture: None,
            external_id: None,
            created_at: now,
            updated_at: now,
        };
        user.apply_identity(identity);
        user
    }

    /// Overwrites profile fields with the values asserted upstream.
    pub fn apply_identity(&mut self, identity: &ExternalIdentity) {
        self.email = identity.email.clone();
        self.email_verified = identity.email_verified;
        self.name = identity.name.clone();
        self.given_name = identity.given_name.clone();
        self.family_name = identity.family_name.clone();
        self.picture = identity.picture.clone();
        self.external_id = Some(identity.subject.clone());
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_google_userinfo() {
        let json = r#"{
            "id": "1090001",
            "email": "ada@example.com",
            "verified_email": true,
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://example.com/ada.png",
            "locale": "en"
        }"#;
        let identity: ExternalIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.subject, "1090001");
        assert!(identity.email_verified);
        assert_eq!(identity.given_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_from_identity() {
        let identity = ExternalIdentity {
            subject: "g-1".to_string(),
            email: "a@example.com".to_string(),
            email_verified: true,
            name: "A".to_string(),
            given_name: None,
            family_name: None,
            picture: None,
        };
        let user = User::from_identity("u-1", &identity);
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.external_id.as_deref(), Some("g-1"));
    }
}
