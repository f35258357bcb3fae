//! The DBL operation tag, `Request::op` in `spec.md` §3.
//!
//! Kept as a closed enum rather than an open string tag because the DAO
//! dispatches on it exhaustively (`spec.md` §4.3); a new operation must be
//! added here before any DAO can serve it.

use std::fmt;

/// Operation requested of the DB layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbOperation {
    /// Create a new user row.
    CreateUser,
    /// Update an existing user row.
    UpdateUser,
    /// Describe (read) a user row.
    DescribeUser,
    /// Validate credentials and resolve a user id.
    AuthenticateUser,
    /// Persist one submitted log record.
    CreateLogRecord,
    /// Shallow health check: can the DAO be reached at all.
    HealthChk1,
    /// Deeper health check: DAO can round-trip a query.
    HealthChk2,
    /// Deepest health check: DAO can touch the underlying storage engine.
    HealthChk3,
}

impl fmt::Display for DbOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateUser => "CREATE_USER",
            Self::UpdateUser => "UPDATE_USER",
            Self::DescribeUser => "DESCRIBE_USER",
            Self::AuthenticateUser => "AUTHENTICATE_USER",
            Self::CreateLogRecord => "CREATE_LOG_RECORD",
            Self::HealthChk1 => "HEALTH_CHK_1",
            Self::HealthChk2 => "HEALTH_CHK_2",
            Self::HealthChk3 => "HEALTH_CHK_3",
        };
        f.write_str(name)
    }
}
