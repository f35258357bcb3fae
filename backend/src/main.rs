#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]
//! Process entry point: wires the config registry, DAO backend, dispatch
//! bank, worker thread, and HTTP adapter together.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{HttpServer, web};
use ortho_config::OrthoConfig;
use tracing::{error, warn};

use backend::app::build_app;
use backend::config::{CliArgs, ConfigRegistry};
use backend::crypto::{KdfParams, UuidGen, UuidParams};
use backend::dao::{DaoFactory, InMemoryDaoFactory, SqliteDaoFactory};
use backend::dispatch::DispatchBank;
use backend::inbound::http::AppState;
use backend::worker::WorkerConfig;
use backend::{config, logging, worker};

fn dao_factory(
    registry: &ConfigRegistry,
    kdf_params: KdfParams,
    uuid_params: UuidParams,
) -> Result<Arc<dyn DaoFactory>, config::ConfigError> {
    match registry.get_str("DBL_DAO_BACKEND") {
        None | Some("memory") => Ok(Arc::new(InMemoryDaoFactory::new(kdf_params, uuid_params))),
        Some("sqlite") => {
            let db_path = registry
                .get_str("DAO_SQLITE_PATH")
                .map_or_else(|| PathBuf::from("dbl.sqlite3"), PathBuf::from);
            let clean_start = registry.get_bool("DAO_SQLITE_CLEAN_START").unwrap_or(false);
            let settings = config::sqlite_settings(registry, db_path, clean_start);
            Ok(Arc::new(SqliteDaoFactory::new(
                settings.db_path,
                settings.reconnect_delay,
                settings.clean_start,
                kdf_params,
                uuid_params,
            )))
        }
        Some(other) => Err(config::ConfigError::unknown_dao_backend(other)),
    }
}

type BootstrapParts = (Arc<DispatchBank>, Arc<dyn DaoFactory>, WorkerConfig, Arc<UuidGen>);

fn bootstrap() -> Result<BootstrapParts, config::ConfigError> {
    let registry = ConfigRegistry::from_env();

    let worker_config = config::worker_config(&registry)?;
    let uuid_params = config::uuid_params(&registry)?;
    let kdf_params = config::kdf_params(&registry)?;
    let trace_uuid_gen = Arc::new(UuidGen::new(uuid_params));

    let factory = dao_factory(&registry, kdf_params, uuid_params)?;
    let dispatch = Arc::new(DispatchBank::new());

    Ok((dispatch, factory, worker_config, trace_uuid_gen))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let args = CliArgs::load_from_iter(std::env::args_os()).map_err(io::Error::other)?;

    if let Err(err) = logging::init(args.debug) {
        warn!(error = %err, "tracing init failed");
    }

    let (dispatch, factory, worker_config, trace_uuid_gen) = bootstrap().map_err(|err| {
        error!(error = %err, "fatal: invalid configuration at startup");
        io::Error::other(err)
    })?;

    let _worker = worker::spawn(Arc::clone(&dispatch), factory, worker_config);

    let app_state = web::Data::new(AppState::new(Arc::clone(&dispatch)));
    let port = args.port;
    let server = HttpServer::new(move || build_app(app_state.clone(), Arc::clone(&trace_uuid_gen)))
        .bind(("0.0.0.0", port))?;

    server.run().await
}
