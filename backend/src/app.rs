//! Shared `actix_web::App` construction, extracted from `main.rs` so
//! integration tests exercise the exact same wiring the binary runs with.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use crate::Trace;
use crate::crypto::UuidGen;
use crate::inbound::http::{self, AppState};

/// Build the app: shared dispatch state, trace middleware, then every route
/// `inbound::http::configure` registers.
pub fn build_app(
    app_state: web::Data<AppState>,
    trace_uuid_gen: Arc<UuidGen>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(app_state)
        .wrap(Trace::new(trace_uuid_gen))
        .configure(http::configure)
}
