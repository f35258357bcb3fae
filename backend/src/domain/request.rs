//! The dispatch [`Request`] object and its [`FailCause`]/outcome types.
//!
//! `spec.md` §3 states the completion invariant: a request is complete iff
//! exactly one of `succ_data`/`fail_cause` is present, and both present is
//! an implementation bug. Rather than track that with two `Option` fields
//! and assert the invariant in tests, this stores a single
//! [`std::sync::OnceLock`] that can be written at most once — "both
//! present" becomes a type the program cannot construct.

use std::sync::OnceLock;

use tokio::sync::Notify;

use super::op::DbOperation;
use super::priority::Priority;

/// Immutable failure descriptor surfaced across the HTTP boundary.
///
/// `dbg_info` is always a pre-stringified message, never a boxed error or
/// backtrace handle, so a completed request never retains references into
/// whatever failed (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailCause {
    http_code: Option<u16>,
    user_msg: String,
    dbg_info: String,
}

impl FailCause {
    /// Construct a failure cause from its three parts.
    pub fn new(
        http_code: Option<u16>,
        user_msg: impl Into<String>,
        dbg_info: impl Into<String>,
    ) -> Self {
        Self {
            http_code,
            user_msg: user_msg.into(),
            dbg_info: dbg_info.into(),
        }
    }

    /// The generic internal-error shape every failure barrier in this crate
    /// converges on: `spec.md` §7's "Panics/exceptions ... Caught ...
    /// mapped to `FailCause{http_code:500, user_msg:"Internal Server
    /// Error", dbg_info:stringified error}`.
    pub fn internal(dbg_info: impl Into<String>) -> Self {
        Self::new(Some(500), "Internal Server Error", dbg_info)
    }

    /// Build an internal failure cause from any `Display`-able error,
    /// stringifying it immediately so the cause never retains the original
    /// error value.
    pub fn from_error(error: &dyn std::fmt::Display) -> Self {
        Self::internal(error.to_string())
    }

    /// Build an internal failure cause from a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "worker panicked with a non-string payload".to_owned()
        };
        Self::internal(message)
    }

    /// Optional HTTP status code for surfacing this failure to a client.
    #[must_use]
    pub fn http_code(&self) -> Option<u16> {
        self.http_code
    }

    /// Short, human-safe message that may be shown to clients.
    #[must_use]
    pub fn user_msg(&self) -> &str {
        &self.user_msg
    }

    /// Longer diagnostic string, for server-side logs only.
    #[must_use]
    pub fn dbg_info(&self) -> &str {
        &self.dbg_info
    }
}

/// Outcome of resolving a user row, carried in a successful
/// [`DbOperation::AuthenticateUser`] or [`DbOperation::DescribeUser`]
/// response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Opaque user identifier.
    pub uid: String,
    /// Login/display username.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
}

/// `authenticate_user`'s result, per `spec.md` §4.3: a lookup miss or a
/// password mismatch is a *logical* DAO failure, not a system error, so it
/// rides in `succ_data` as a structured `op_failed` payload rather than a
/// [`FailCause`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials matched; carries the resolved user's public fields.
    Authenticated(UserRecord),
    /// No user exists with the supplied username.
    InvalidUser,
    /// The user exists but the password shadow did not match.
    InvalidPass,
}

/// Successful payload produced by [`crate::dao::Dao::serve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessPayload {
    /// Plain-text health check response.
    HealthCheck(String),
    /// `authenticate_user` result (see [`AuthOutcome`]).
    Authenticated(AuthOutcome),
    /// A user row, for `DESCRIBE_USER`/`CREATE_USER`/`UPDATE_USER`.
    User(UserRecord),
    /// Acknowledgement of an accepted log record.
    LogRecordAccepted {
        /// The `sync_level` the caller requested (0, 1, or 2).
        sync_level: u8,
    },
}

/// Input payload for a [`Request`], keyed by [`DbOperation`] rather than a
/// universal "any" type (`spec.md` §9 design note).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    /// No input beyond the operation tag (health checks).
    None,
    /// Username/password pair for `AUTHENTICATE_USER`.
    Authenticate {
        /// Username supplied by the caller.
        username: String,
        /// Password supplied by the caller.
        password: String,
    },
    /// A user id for `DESCRIBE_USER`.
    DescribeUser {
        /// Opaque user identifier to look up.
        uid: String,
    },
    /// Fields for `CREATE_USER`/`UPDATE_USER`.
    UpsertUser {
        /// Opaque user identifier; ignored on create.
        uid: Option<String>,
        /// Login/display username.
        username: String,
        /// Password to derive a shadow from.
        password: String,
        /// Given name.
        first_name: String,
        /// Family name.
        last_name: String,
        /// Contact email.
        email: String,
    },
    /// Raw log record bytes plus the caller's requested durability level.
    LogRecord {
        /// Opaque log record body.
        body: Vec<u8>,
        /// 0 = accepted, 1 = persisted to next layer, 2 = durably synced.
        sync_level: u8,
    },
}

/// Resolved state of a completed [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The DAO produced a success payload.
    Success(SuccessPayload),
    /// The DAO (or the dispatch/worker barrier) produced a failure cause.
    Failure(FailCause),
}

/// Error returned when a caller tries to complete a [`Request`] more than
/// once. `spec.md` §3 calls "both present" an implementation bug; this type
/// gives that bug a name instead of silently overwriting the first result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request was already completed")]
pub struct AlreadyCompleted;

/// A single DB-layer request, shared between a submitter and the worker.
///
/// Mutated exactly once by the worker to set a result, then observed by the
/// submitter; no locks guard that mutation because the single-writer-then-
/// single-reader discipline is enforced by [`Request::complete_success`] and
/// [`Request::complete_failure`] refusing a second write (`spec.md` §3).
#[derive(Debug)]
pub struct Request {
    op: DbOperation,
    priority: Priority,
    data: RequestPayload,
    outcome: OnceLock<RequestOutcome>,
    notify: Notify,
}

impl Request {
    /// Construct a new, pending request.
    #[must_use]
    pub fn new(op: DbOperation, priority: Priority, data: RequestPayload) -> Self {
        Self {
            op,
            priority,
            data,
            outcome: OnceLock::new(),
            notify: Notify::new(),
        }
    }

    /// The requested operation.
    #[must_use]
    pub fn op(&self) -> DbOperation {
        self.op
    }

    /// The request's scheduling priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The operation-specific input payload.
    #[must_use]
    pub fn data(&self) -> &RequestPayload {
        &self.data
    }

    /// Record a success outcome. Returns [`AlreadyCompleted`] if the
    /// request was already resolved.
    pub fn complete_success(&self, payload: SuccessPayload) -> Result<(), AlreadyCompleted> {
        self.complete(RequestOutcome::Success(payload))
    }

    /// Record a failure outcome. Returns [`AlreadyCompleted`] if the
    /// request was already resolved.
    pub fn complete_failure(&self, cause: FailCause) -> Result<(), AlreadyCompleted> {
        self.complete(RequestOutcome::Failure(cause))
    }

    fn complete(&self, outcome: RequestOutcome) -> Result<(), AlreadyCompleted> {
        self.outcome.set(outcome).map_err(|_| AlreadyCompleted)?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// Non-blocking check of the completion predicate (`spec.md` §4.6):
    /// `Some` once the worker has set a result, `None` while pending.
    #[must_use]
    pub fn poll(&self) -> Option<&RequestOutcome> {
        self.outcome.get()
    }

    /// `true` once exactly one of success/failure has been recorded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Await completion via a notify channel, as the additive convenience
    /// `spec.md` §4.6 permits. Re-checks the poll predicate in a loop so it
    /// stays correct even if the notification races a concurrent
    /// completion (`Notify::notify_waiters` wakes only tasks already
    /// parked when it fires).
    pub async fn notified(&self) -> &RequestOutcome {
        loop {
            if let Some(outcome) = self.outcome.get() {
                return outcome;
            }
            let notified = self.notify.notified();
            if let Some(outcome) = self.outcome.get() {
                return outcome;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_request_has_no_outcome() {
        let req = Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None);
        assert!(!req.is_complete());
        assert!(req.poll().is_none());
    }

    #[test]
    fn completes_exactly_once() {
        let req = Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None);
        req.complete_success(SuccessPayload::HealthCheck("ok".into()))
            .expect("first completion succeeds");
        assert!(req.is_complete());

        let second = req.complete_failure(FailCause::internal("boom"));
        assert_eq!(second, Err(AlreadyCompleted));

        match req.poll() {
            Some(RequestOutcome::Success(SuccessPayload::HealthCheck(msg))) => {
                assert_eq!(msg, "ok");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn notified_resolves_after_completion() {
        let req = Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None);
        req.complete_success(SuccessPayload::HealthCheck("ok".into()))
            .expect("completion succeeds");

        let outcome = req.notified().await;
        assert!(matches!(outcome, RequestOutcome::Success(_)));
    }

    #[tokio::test]
    async fn notified_wakes_a_waiting_task() {
        use std::sync::Arc;

        let req = Arc::new(Request::new(
            DbOperation::HealthChk1,
            Priority::Normal,
            RequestPayload::None,
        ));
        let waiter = {
            let req = Arc::clone(&req);
            tokio::spawn(async move { matches!(req.notified().await, RequestOutcome::Success(_)) })
        };

        tokio::task::yield_now().await;
        req.complete_success(SuccessPayload::HealthCheck("ok".into()))
            .expect("completion succeeds");

        assert!(waiter.await.expect("waiter task should not panic"));
    }

    #[test]
    fn fail_cause_internal_has_expected_shape() {
        let cause = FailCause::internal("db exploded");
        assert_eq!(cause.http_code(), Some(500));
        assert_eq!(cause.user_msg(), "Internal Server Error");
        assert_eq!(cause.dbg_info(), "db exploded");
    }
}
