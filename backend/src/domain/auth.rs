//! Authentication primitives: validated login credentials.
//!
//! Keep inbound payload parsing outside the DAO by exposing a constructor
//! that validates string inputs before a handler ever builds a
//! [`crate::domain::RequestPayload::Authenticate`].

use std::fmt;

use zeroize::Zeroizing;

/// Error returned when a login payload's values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    EmptyUsername,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials.
///
/// ## Invariants
/// - `username` is trimmed and must not be empty after trimming.
/// - `password` is required to be non-empty but keeps caller-provided
///   whitespace so shadow derivation matches what the caller actually typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, LoginValidationError> {
        let username = username.into();
        let normalized = username.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }

        let password = password.into();
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            username: normalized.to_owned(),
            password: Zeroizing::new(password),
        })
    }

    /// Username string suitable for user lookups.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password string provided by the caller.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const VALID_USERNAME: &str = "admin@example.com";
    const VALID_PASSWORD: &str = "correct horse battery staple";

    #[test]
    fn rejects_empty_username() {
        let result = LoginCredentials::try_from_parts("", VALID_PASSWORD);
        assert_eq!(result, Err(LoginValidationError::EmptyUsername));
    }

    #[test]
    fn rejects_whitespace_username() {
        let result = LoginCredentials::try_from_parts("   ", VALID_PASSWORD);
        assert_eq!(result, Err(LoginValidationError::EmptyUsername));
    }

    #[test]
    fn trims_username() {
        let creds = LoginCredentials::try_from_parts("  admin  ", VALID_PASSWORD)
            .expect("username should be trimmed");
        assert_eq!(creds.username(), "admin");
    }

    #[rstest]
    #[case("", LoginValidationError::EmptyPassword)]
    fn rejects_empty_password(#[case] password: &str, #[case] expected: LoginValidationError) {
        let result = LoginCredentials::try_from_parts(VALID_USERNAME, password);
        assert_eq!(result, Err(expected));
    }

    #[test]
    fn preserves_password_whitespace() {
        let creds = LoginCredentials::try_from_parts(VALID_USERNAME, " pw ")
            .expect("non-empty password is accepted");
        assert_eq!(creds.password(), " pw ");
    }
}
