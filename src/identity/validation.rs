//! Account validation rules applied before an account is stored.
//!
//! Rule order and wording follow the usual identity-framework defaults so a
//! client that shows "the first error" shows the same thing users expect.

use regex::Regex;
use std::sync::LazyLock;

const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

static USER_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-._@+]+$").ok());

/// One refused rule: a stable code and a human-readable description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    pub code: String,
    pub description: String,
}

impl ValidationFailure {
    #[must_use]
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
    require_digit: bool,
    require_lowercase: bool,
    require_uppercase: bool,
    require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    #[must_use]
    pub fn with_require_digit(mut self, require: bool) -> Self {
        self.require_digit = require;
        self
    }

    #[must_use]
    pub fn with_require_lowercase(mut self, require: bool) -> Self {
        self.require_lowercase = require;
        self
    }

    #[must_use]
    pub fn with_require_uppercase(mut self, require: bool) -> Self {
        self.require_uppercase = require;
        self
    }

    #[must_use]
    pub fn with_require_non_alphanumeric(mut self, require: bool) -> Self {
        self.require_non_alphanumeric = require;
        self
    }

    #[must_use]
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Every rule the password breaks, in rule order.
    #[must_use]
    pub fn validate(&self, password: &str) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        if password.chars().count() < self.min_length {
            failures.push(ValidationFailure::new(
                "PasswordTooShort",
                format!("Passwords must be at least {} characters.", self.min_length),
            ));
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            failures.push(ValidationFailure::new(
                "PasswordRequiresNonAlphanumeric",
                "Passwords must have at least one non alphanumeric character.",
            ));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            failures.push(ValidationFailure::new(
                "PasswordRequiresDigit",
                "Passwords must have at least one digit ('0'-'9').",
            ));
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            failures.push(ValidationFailure::new(
                "PasswordRequiresLower",
                "Passwords must have at least one lowercase ('a'-'z').",
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            failures.push(ValidationFailure::new(
                "PasswordRequiresUpper",
                "Passwords must have at least one uppercase ('A'-'Z').",
            ));
        }

        failures
    }
}

/// Normalize a user name for lookup/uniqueness checks.
pub(super) fn normalize_user_name(user_name: &str) -> String {
    user_name.trim().to_lowercase()
}

/// ASCII letters, digits and `-._@+`, nothing else.
pub(super) fn valid_user_name(user_name: &str) -> bool {
    USER_NAME.as_ref().is_some_and(|re| re.is_match(user_name))
}

pub(super) fn user_name_failure(user_name: &str) -> Option<ValidationFailure> {
    if valid_user_name(user_name) {
        return None;
    }
    Some(ValidationFailure::new(
        "InvalidUserName",
        format!("Username '{user_name}' is invalid, can only contain letters or digits."),
    ))
}

pub(super) fn duplicate_user_name(user_name: &str) -> ValidationFailure {
    ValidationFailure::new(
        "DuplicateUserName",
        format!("Username '{user_name}' is already taken."),
    )
}
