//! HTTP adapter mapping for [`FailCause`].
//!
//! Keeps the domain failure type HTTP-agnostic (`domain::FailCause` never
//! imports `actix_web`) while letting handlers return it directly as an
//! error and get a consistent JSON response back.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::domain::FailCause;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, FailCause>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    err: &'a str,
}

fn status_for(http_code: Option<u16>) -> StatusCode {
    http_code
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Never let a `dbg_info` string reach the client; only `user_msg` is
/// client-facing (`spec.md` §7: `dbg_info` is a server-side diagnostic).
fn redact(cause: &FailCause) -> ErrorBody<'_> {
    error!(dbg_info = cause.dbg_info(), http_code = ?cause.http_code(), "request failed");
    ErrorBody {
        err: cause.user_msg(),
    }
}

impl ResponseError for FailCause {
    fn status_code(&self) -> StatusCode {
        status_for(self.http_code())
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(redact(self))
    }
}

impl std::fmt::Display for FailCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_msg())
    }
}
