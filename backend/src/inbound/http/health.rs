//! `GET /api/hchk` (`spec.md` §6): shallow reachability probe.
//!
//! Submits a [`DbOperation::HealthChk1`] request at [`Priority::Normal`] and
//! awaits it; the DAO decides how deep "reachable" actually checks
//! (see `dao::memory`/`dao::sqlite`), this handler only reports the verdict.

use std::sync::Arc;

use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};

use crate::domain::{DbOperation, Priority, Request, RequestOutcome, RequestPayload, SuccessPayload};

use super::error::ApiResult;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    ping_id: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ping_id: String,
    err: &'static str,
}

/// `GET /api/hchk?ping_id=<string>` — returns `{ping_id, err:"SUCC"}` once
/// the DAO confirms it is reachable.
#[get("/api/hchk")]
pub async fn health_check(
    state: web::Data<AppState>,
    query: web::Query<HealthQuery>,
) -> ApiResult<HttpResponse> {
    let request = Arc::new(Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None));
    let handle = Arc::clone(&request);
    state.dispatch().submit(request).map_err(|error| {
        crate::domain::FailCause::new(Some(503), "Service Unavailable", error.to_string())
    })?;

    match handle.notified().await {
        RequestOutcome::Success(SuccessPayload::HealthCheck(_)) => Ok(HttpResponse::Ok().json(HealthResponse {
            ping_id: query.into_inner().ping_id,
            err: "SUCC",
        })),
        RequestOutcome::Success(other) => Err(crate::domain::FailCause::internal(format!(
            "health check produced an unexpected payload: {other:?}"
        ))),
        RequestOutcome::Failure(cause) => Err(cause.clone()),
    }
}
