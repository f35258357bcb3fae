//! HTTP front end: the one collaborator `spec.md` §1 keeps only at its
//! contract with the core (submit a request, await its outcome).

mod error;
mod health;
mod index;
mod log_records;
mod login;
mod state;

pub use error::ApiResult;
pub use health::health_check;
pub use index::index as index_route;
pub use log_records::submit_log_record;
pub use login::login as login_route;
pub use state::AppState;

use actix_web::web::ServiceConfig;

/// Register every route this crate's HTTP surface exposes.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(index_route)
        .service(health_check)
        .service(submit_log_record)
        .service(login_route);
}
