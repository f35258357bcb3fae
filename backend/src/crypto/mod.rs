//! Password-hash KDF and UUID generation utilities (`spec.md` §4.4, §4.5).

mod kdf;
mod uuidgen;

pub use kdf::{AuthKdf, KdfMethod, KdfParams, KdfParamsError, ScryptFailure, shadows_match};
pub use uuidgen::{UuidGen, UuidParams, UuidParamsError, UuidVersion};
