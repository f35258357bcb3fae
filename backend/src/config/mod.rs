//! Configuration: CLI/env launch flags plus the process-wide config
//! registry the DB layer reads its knobs from (`spec.md` §2.1, §6).

mod cli;
mod registry;
mod settings;

pub use cli::CliArgs;
pub use registry::ConfigRegistry;
pub use settings::{kdf_params, sqlite_settings, uuid_params, worker_config, ConfigError, SqliteSettings};
