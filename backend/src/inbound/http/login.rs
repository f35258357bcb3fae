//! `POST /api/login` (`spec.md` §1, §6): bare bearer-less login, returning
//! the authenticated user's fields as JSON.

use std::sync::Arc;

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthOutcome, DbOperation, FailCause, LoginCredentials, Priority, Request, RequestOutcome,
    RequestPayload, SuccessPayload, UserRecord,
};

use super::error::ApiResult;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    uid: String,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
}

impl From<UserRecord> for LoginResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            uid: record.uid,
            username: record.username,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
        }
    }
}

/// `POST /api/login` — authenticates a username/password pair and returns
/// the matched user's public fields. An unknown username or a wrong
/// password is a logical `401`, not a system failure (`spec.md` §4.3).
#[post("/api/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let credentials = LoginCredentials::try_from_parts(body.username, body.password)
        .map_err(|error| FailCause::new(Some(400), "Bad Request", error.to_string()))?;

    let request = Arc::new(Request::new(
        DbOperation::AuthenticateUser,
        Priority::Normal,
        RequestPayload::Authenticate {
            username: credentials.username().to_owned(),
            password: credentials.password().to_owned(),
        },
    ));
    let handle = Arc::clone(&request);
    state
        .dispatch()
        .submit(request)
        .map_err(|error| FailCause::new(Some(503), "Service Unavailable", error.to_string()))?;

    match handle.notified().await {
        RequestOutcome::Success(SuccessPayload::Authenticated(AuthOutcome::Authenticated(user))) => {
            Ok(HttpResponse::Ok().json(LoginResponse::from(user.clone())))
        }
        RequestOutcome::Success(SuccessPayload::Authenticated(
            AuthOutcome::InvalidUser | AuthOutcome::InvalidPass,
        )) => Err(FailCause::new(Some(401), "Unauthorized", "invalid username or password")),
        RequestOutcome::Success(other) => Err(FailCause::internal(format!(
            "login produced an unexpected payload: {other:?}"
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

    fn test_app_dispatch() -> Arc<DispatchBank> {
        let dispatch = Arc::new(DispatchBank::new());
        let _worker = worker::spawn(Arc::clone(&dispatch), test_factory(), WorkerConfig::defaults());
        dispatch
    }

    #[actix_web::test]
    async fn rejects_unknown_user_as_unauthorized() {
        let dispatch = test_app_dispatch();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Arc::clone(&dispatch))))
                .service(login),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({"username": "ghost", "password": "anything"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 401);
    }

    #[actix_web::test]
    async fn rejects_blank_username_as_bad_request() {
        let dispatch = test_app_dispatch();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Arc::clone(&dispatch))))
                .service(login),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({"username": "   ", "password": "x"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
    }

    #[actix_web::test]
    async fn authenticated_user_fields_round_trip() {
        let dispatch = test_app_dispatch();

        let create = Arc::new(Request::new(
            DbOperation::CreateUser,
            Priority::Normal,
            RequestPayload::UpsertUser {
                uid: None,
                username: "alice".to_owned(),
                password: "hunter2".to_owned(),
                first_name: "Alice".to_owned(),
                last_name: "Anderson".to_owned(),
                email: "alice@example.com".to_owned(),
            },
        ));
        dispatch.submit(Arc::clone(&create)).expect("dispatch accepts submission");
        assert!(matches!(
            create.notified().await,
            RequestOutcome::Success(SuccessPayload::User(_))
        ));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Arc::clone(&dispatch))))
                .service(login),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({"username": "alice", "password": "hunter2"}))
            .to_request();
        let res: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(res["username"], "alice");
        assert_eq!(res["email"], "alice@example.com");
    }
}
