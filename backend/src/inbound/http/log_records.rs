//! `POST /api/lgr/new` (`spec.md` §6): submit a log record.

use std::sync::Arc;

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{DbOperation, FailCause, Priority, Request, RequestOutcome, RequestPayload, SuccessPayload};

use super::error::ApiResult;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewLogRecord {
    record: String,
    #[serde(default)]
    sync_level: Option<u8>,
}

#[derive(Debug, Serialize)]
struct LogRecordAck {
    sync_level: u8,
}

/// Log record submissions carry no urgency signal of their own, so they all
/// enter at [`Priority::Low`] — the weighted scheduler still lets health and
/// auth traffic cut ahead under load (`spec.md` §4.1).
const LOG_RECORD_PRIORITY: Priority = Priority::Low;

#[post("/api/lgr/new")]
pub async fn submit_log_record(
    state: web::Data<AppState>,
    body: web::Json<NewLogRecord>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let sync_level = body.sync_level.unwrap_or(0);
    if sync_level > 2 {
        return Err(FailCause::new(
            Some(400),
            "Bad Request",
            format!("sync_level must be 0, 1, or 2, got {sync_level}"),
        ));
    }

    let request = Arc::new(Request::new(
        DbOperation::CreateLogRecord,
        LOG_RECORD_PRIORITY,
        RequestPayload::LogRecord {
            body: body.record.into_bytes(),
            sync_level,
        },
    ));
    let handle = Arc::clone(&request);
    state
        .dispatch()
        .submit(request)
        .map_err(|error| FailCause::new(Some(503), "Service Unavailable", error.to_string()))?;

    match handle.notified().await {
        RequestOutcome::Success(SuccessPayload::LogRecordAccepted { sync_level }) => {
            Ok(HttpResponse::Ok().json(LogRecordAck { sync_level: *sync_level }))
        }
        RequestOutcome::Success(other) => Err(FailCause::internal(format!(
            "log record submission produced an unexpected payload: {other:?}"
        ))),
        RequestOutcome::Failure(cause) => Err(cause.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KdfMethod, KdfParams, UuidParams};
    use crate::dao::InMemoryDaoFactory;
    use crate::dispatch::DispatchBank;
    use crate::worker::{self, WorkerConfig};
    use actix_web::{App, test};

    fn test_factory() -> Arc<dyn crate::dao::DaoFactory> {
        let kdf = KdfParams::new(vec![0_u8; 8], 16384, 8, 1000, 18, KdfMethod::Pbkdf2)
            .expect("valid kdf params");
        Arc::new(InMemoryDaoFactory::new(kdf, UuidParams::default_params()))
    }

    #[actix_web::test]
    async fn accepts_a_log_record_at_default_sync_level() {
        let dispatch = Arc::new(DispatchBank::new());
        let _worker = worker::spawn(Arc::clone(&dispatch), test_factory(), WorkerConfig::defaults());

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Arc::clone(&dispatch))))
                .service(submit_log_record),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/lgr/new")
            .set_json(serde_json::json!({"record": "line one"}))
            .to_request();
        let res: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(res["sync_level"], 0);
    }

    #[actix_web::test]
    async fn rejects_an_out_of_range_sync_level() {
        let dispatch = Arc::new(DispatchBank::new());
        let _worker = worker::spawn(Arc::clone(&dispatch), test_factory(), WorkerConfig::defaults());

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Arc::clone(&dispatch))))
                .service(submit_log_record),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/lgr/new")
            .set_json(serde_json::json!({"record": "line one", "sync_level": 9}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
    }
}
