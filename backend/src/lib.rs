#![cfg_attr(
    test,
    expect(clippy::expect_used, reason = "tests require contextual panics")
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
//! DB request dispatch and service subsystem for the log-ingestion backend.
//!
//! The crate is organised as the spec's leaf-first component list:
//! [`config`] and [`logging`] are process-wide ambient plumbing; [`crypto`]
//! holds the KDF and UUID generator; [`domain`] defines the request and
//! error data model; [`dao`] and [`worker`] implement the DB service side;
//! [`dispatch`] is the queue bank connecting the two; [`inbound`] is the
//! thin HTTP adapter.

pub mod app;
pub mod config;
pub mod crypto;
pub mod dao;
pub mod dispatch;
pub mod domain;
pub mod inbound;
pub mod logging;
mod middleware;
pub mod worker;

pub use middleware::Trace;
