//! Core data model: the DBL operation tag, priority/weight, and the
//! request/outcome types the dispatch, worker, and DAO all share.

mod auth;
mod op;
mod priority;
mod request;

pub use auth::{LoginCredentials, LoginValidationError};
pub use op::DbOperation;
pub use priority::Priority;
pub use request::{
    AlreadyCompleted, AuthOutcome, FailCause, Request, RequestOutcome, RequestPayload,
    SuccessPayload, UserRecord,
};
