//! HTTP middleware.

mod trace;

pub use trace::{Trace, TraceId};
