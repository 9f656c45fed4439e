//! Typed claim map shared by the identity manager, the user-info payload and the
//! client principal.
//!
//! A claim is one `type -> value` fact about an identity. Types are validated
//! when a claim enters the map, so anything holding a [`Claims`] can hand it to
//! the wire or to UI code without re-checking.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Account identifier issued by the identity manager.
pub const SUBJECT: &str = "sub";
/// Display name of the identity.
pub const NAME: &str = "name";
/// Role membership, checked by `is_in_role` on the client.
pub const ROLE: &str = "role";

const MAX_CLAIM_TYPE_LEN: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("claim type must not be empty")]
    EmptyType,
    #[error("claim type is longer than {MAX_CLAIM_TYPE_LEN} characters")]
    TypeTooLong,
    #[error("claim type {0:?} contains whitespace or control characters")]
    InvalidType(String),
    #[error("claim value for {0:?} contains control characters")]
    InvalidValue(String),
}

/// Validated claim type name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimType(String);

impl ClaimType {
    /// # Errors
    /// Returns an error if the type is empty, too long, or contains whitespace
    /// or control characters.
    pub fn new(claim_type: impl Into<String>) -> Result<Self, ClaimError> {
        let claim_type = claim_type.into();
        if claim_type.is_empty() {
            return Err(ClaimError::EmptyType);
        }
        if claim_type.chars().count() > MAX_CLAIM_TYPE_LEN {
            return Err(ClaimError::TypeTooLong);
        }
        if claim_type
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ClaimError::InvalidType(claim_type));
        }
        Ok(Self(claim_type))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClaimType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One value per claim type, ordered by type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Claims(BTreeMap<ClaimType, String>);

impl Claims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a claim, returning the previous value.
    ///
    /// # Errors
    /// Returns an error if the type or the value fails validation.
    pub fn insert(
        &mut self,
        claim_type: &str,
        value: impl Into<String>,
    ) -> Result<Option<String>, ClaimError> {
        let claim_type = ClaimType::new(claim_type)?;
        let value = value.into();
        if value.chars().any(char::is_control) {
            return Err(ClaimError::InvalidValue(claim_type.0));
        }
        Ok(self.0.insert(claim_type, value))
    }

    /// Builder form of [`Claims::insert`].
    ///
    /// # Errors
    /// Returns an error if the type or the value fails validation.
    pub fn with(mut self, claim_type: &str, value: impl Into<String>) -> Result<Self, ClaimError> {
        self.insert(claim_type, value)?;
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, claim_type: &str) -> Option<&str> {
        self.0.get(claim_type).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of these claims keeping only the listed types.
    #[must_use]
    pub fn only(&self, allowed: &BTreeSet<String>) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| allowed.contains(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

impl TryFrom<BTreeMap<String, String>> for Claims {
    type Error = ClaimError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut claims = Self::new();
        for (claim_type, value) in map {
            claims.insert(&claim_type, value)?;
        }
        Ok(claims)
    }
}

impl From<Claims> for BTreeMap<String, String> {
    fn from(claims: Claims) -> Self {
        claims
            .0
            .into_iter()
            .map(|(key, value)| (key.0, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn claim_type_rejects_empty_and_whitespace() {
        assert_eq!(ClaimType::new(""), Err(ClaimError::EmptyType));
        assert!(matches!(
            ClaimType::new("with space"),
            Err(ClaimError::InvalidType(_))
        ));
        assert!(matches!(
            ClaimType::new("tab\there"),
            Err(ClaimError::InvalidType(_))
        ));
        assert_eq!(
            ClaimType::new("x".repeat(MAX_CLAIM_TYPE_LEN + 1)),
            Err(ClaimError::TypeTooLong)
        );
        assert!(ClaimType::new("http://schemas.example/role").is_ok());
    }

    #[test]
    fn insert_replaces_and_returns_previous() -> Result<()> {
        let mut claims = Claims::new();
        assert_eq!(claims.insert(ROLE, "reader")?, None);
        assert_eq!(claims.insert(ROLE, "admin")?, Some("reader".to_string()));
        assert_eq!(claims.get(ROLE), Some("admin"));
        assert_eq!(claims.len(), 1);
        Ok(())
    }

    #[test]
    fn insert_rejects_control_characters_in_value() {
        let mut claims = Claims::new();
        assert_eq!(
            claims.insert(NAME, "alice\nbob"),
            Err(ClaimError::InvalidValue(NAME.to_string()))
        );
        assert!(claims.is_empty());
    }

    #[test]
    fn only_keeps_allowed_types() -> Result<()> {
        let claims = Claims::new()
            .with(SUBJECT, "42")?
            .with(NAME, "alice")?
            .with(ROLE, "admin")?;
        let allowed: BTreeSet<String> = [ROLE.to_string()].into_iter().collect();
        let filtered = claims.only(&allowed);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get(ROLE), Some("admin"));
        assert_eq!(filtered.get(NAME), None);
        Ok(())
    }

    #[test]
    fn serializes_as_plain_map() -> Result<()> {
        let claims = Claims::new().with(NAME, "alice")?.with(ROLE, "admin")?;
        let value = serde_json::to_value(&claims)?;
        assert_eq!(value, serde_json::json!({"name": "alice", "role": "admin"}));
        Ok(())
    }

    #[test]
    fn deserialize_validates_types() {
        let result: Result<Claims, _> = serde_json::from_str(r#"{"": "empty"}"#);
        assert!(result.is_err());
    }
}
