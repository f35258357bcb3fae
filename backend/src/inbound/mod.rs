//! Inbound adapters: collaborators that submit requests into the core
//! dispatch bank. `spec.md` §1 keeps these out of scope beyond their
//! contract with the core; `http` is the one reference adapter provided.

pub mod http;
