//! CLI flags (`spec.md` §6: `--port=<int>` default 1655, `--debug`).

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    1655
}

/// Command-line/environment-derived launch settings, loaded once at process
/// start via `ortho_config`'s layered CLI/env/default resolution.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DBL")]
pub struct CliArgs {
    /// TCP port the HTTP adapter binds to.
    #[ortho_config(default = default_port())]
    pub port: u16,
    /// Enable verbose/debug-level logging.
    #[ortho_config(cli_long = "debug")]
    pub debug: bool,
}
