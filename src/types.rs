//! Wire types shared by the server endpoints and the client adapter.
//!
//! Field names are camelCase on the wire. Passwords are held as
//! [`SecretString`] and never show up in `Debug` output.

use crate::claims::Claims;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Who the current request belongs to, as far as the client needs to know.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub is_authenticated: bool,
    pub user_name: String,
    pub name: String,
    #[schema(value_type = BTreeMap<String, String>)]
    pub exposed_claims: Claims,
}

impl UserInfo {
    /// Payload for a request without a resolvable account.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginParameters {
    pub user_name: String,
    #[schema(value_type = String, format = Password)]
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub password: SecretString,
    #[serde(default)]
    pub remember_me: bool,
}

impl LoginParameters {
    #[must_use]
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: SecretString::from(password.into()),
            remember_me: false,
        }
    }

    #[must_use]
    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParameters {
    pub user_name: String,
    #[schema(value_type = String, format = Password)]
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub password: SecretString,
}

impl RegisterParameters {
    #[must_use]
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl From<RegisterParameters> for LoginParameters {
    // Registration signs the new account in for the browser session only.
    fn from(params: RegisterParameters) -> Self {
        Self {
            user_name: params.user_name,
            password: params.password,
            remember_me: false,
        }
    }
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
