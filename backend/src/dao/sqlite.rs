//! Disk-backed embedded-SQL reference [`Dao`] (`spec.md` §4.3
//! "Connection lifecycle (disk-backed reference)").
//!
//! The DAO owns a single `rusqlite::Connection` and never shares it.
//! `autocommit` is left as rusqlite's default: no library-injected
//! transactions, callers issue `BEGIN` explicitly if they ever need one
//! (none of the operations here do).

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};

use crate::crypto::{AuthKdf, KdfParams, UuidGen, UuidParams, shadows_match};
use crate::domain::{
    AuthOutcome, DbOperation, FailCause, Request, RequestPayload, SuccessPayload, UserRecord,
};

use super::{Dao, DaoBuildError, DaoFactory};

const HEALTH_CHECK_OK: &str = "DBL health check: OK";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS User (
    uid TEXT PRIMARY KEY,
    u_name TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    pass_hash TEXT NOT NULL
)";

/// Disk-backed reference DAO.
pub struct SqliteDao {
    db_path: PathBuf,
    reconnect_delay: Duration,
    conn: Option<Connection>,
    kdf: AuthKdf,
    uuid_gen: UuidGen,
}

impl SqliteDao {
    fn reconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                tracing::warn!(error = %err, "failed to close db connection");
            }
        }

        if !self.reconnect_delay.is_zero() {
            tracing::info!(delay = ?self.reconnect_delay, "sleeping before reconnecting to db");
            thread::sleep(self.reconnect_delay);
        }

        match Connection::open(&self.db_path) {
            Ok(conn) => {
                if let Err(err) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
                    tracing::warn!(error = %err, "failed to set journal_mode=WAL");
                }
                if let Err(err) = conn.execute_batch(SCHEMA) {
                    tracing::warn!(error = %err, "failed to ensure db schema");
                }
                self.conn = Some(conn);
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to open db connection");
                self.conn = None;
            }
        }
    }

    /// Attempt `operation` against the current connection; on failure,
    /// reconnect and attempt exactly once more (`spec.md` §4.3: "Never more
    /// than one retry per request").
    fn with_retry<T>(
        &mut self,
        mut operation: impl FnMut(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, FailCause> {
        if self.conn.is_none() {
            self.reconnect();
        }

        let first_attempt = self
            .conn
            .as_ref()
            .ok_or_else(|| FailCause::internal("no db connection available"))
            .and_then(|conn| operation(conn).map_err(|err| FailCause::from_error(&err)));

        if first_attempt.is_ok() {
            return first_attempt;
        }

        tracing::warn!("sqlite dao operation failed, reconnecting and retrying once");
        self.reconnect();
        self.conn
            .as_ref()
            .ok_or_else(|| FailCause::internal("no db connection available after reconnect"))
            .and_then(|conn| operation(conn).map_err(|err| FailCause::from_error(&err)))
    }

    fn authenticate(&mut self, username: &str, password: &str) -> Result<SuccessPayload, FailCause> {
        let shadow = self
            .kdf
            .shadow(password)
            .map_err(|err| FailCause::from_error(&err))?;
        let username = username.to_owned();

        self.with_retry(|conn| {
            conn.query_row(
                "SELECT uid, u_name, first_name, last_name, email, pass_hash FROM User WHERE u_name = ?1",
                [&username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
        })
        .map(|row| match row {
            None => SuccessPayload::Authenticated(AuthOutcome::InvalidUser),
            Some((uid, u_name, first_name, last_name, email, pass_hash)) => {
                if shadows_match(&pass_hash, &shadow) {
                    SuccessPayload::Authenticated(AuthOutcome::Authenticated(UserRecord {
                        uid,
                        username: u_name,
                        first_name,
                        last_name,
                        email,
                    }))
                } else {
                    SuccessPayload::Authenticated(AuthOutcome::InvalidPass)
                }
            }
        })
    }

    fn describe_user(&mut self, uid: &str) -> Result<SuccessPayload, FailCause> {
        let uid_owned = uid.to_owned();
        self.with_retry(|conn| {
            conn.query_row(
                "SELECT uid, u_name, first_name, last_name, email FROM User WHERE uid = ?1",
                [&uid_owned],
                |row| {
                    Ok(UserRecord {
                        uid: row.get(0)?,
                        username: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                        email: row.get(4)?,
                    })
                },
            )
            .optional()
        })
        .and_then(|found| {
            found
                .map(SuccessPayload::User)
                .ok_or_else(|| FailCause::new(Some(404), "no such user", format!("uid {uid} not found")))
        })
    }

    fn upsert_user(
        &mut self,
        uid: Option<String>,
        username: String,
        password: String,
        first_name: String,
        last_name: String,
        email: String,
    ) -> Result<SuccessPayload, FailCause> {
        let pass_hash = self
            .kdf
            .shadow(&password)
            .map_err(|err| FailCause::from_error(&err))?;
        let uid = uid.unwrap_or_else(|| self.uuid_gen.next());
        let record = UserRecord {
            uid: uid.clone(),
            username: username.clone(),
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            email: email.clone(),
        };

        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO User (uid, u_name, first_name, last_name, email, pass_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(uid) DO UPDATE SET
                    u_name = excluded.u_name,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    email = excluded.email,
                    pass_hash = excluded.pass_hash",
                rusqlite::params![uid, username, first_name, last_name, email, pass_hash],
            )
        })
        .map(|_rows_changed| SuccessPayload::User(record))
    }

    fn health_check(&mut self, op: DbOperation) -> Result<SuccessPayload, FailCause> {
        match op {
            DbOperation::HealthChk1 => Ok(SuccessPayload::HealthCheck(HEALTH_CHECK_OK.to_owned())),
            DbOperation::HealthChk2 => self
                .with_retry(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
                .map(|_| SuccessPayload::HealthCheck(HEALTH_CHECK_OK.to_owned())),
            _ => self
                .with_retry(|conn| conn.query_row("SELECT COUNT(*) FROM User", [], |row| row.get::<_, i64>(0)))
                .map(|_| SuccessPayload::HealthCheck(HEALTH_CHECK_OK.to_owned())),
        }
    }
}

impl Dao for SqliteDao {
    fn serve(&mut self, request: &Request) {
        let result = match (request.op(), request.data()) {
            (op @ (DbOperation::HealthChk1 | DbOperation::HealthChk2 | DbOperation::HealthChk3), _) => {
                self.health_check(op)
            }
            (DbOperation::AuthenticateUser, RequestPayload::Authenticate { username, password }) => {
                self.authenticate(username, password)
            }
            (DbOperation::DescribeUser, RequestPayload::DescribeUser { uid }) => self.describe_user(uid),
            (
                DbOperation::CreateUser | DbOperation::UpdateUser,
                RequestPayload::UpsertUser {
                    uid,
                    username,
                    password,
                    first_name,
                    last_name,
                    email,
                },
            ) => self.upsert_user(
                uid.clone(),
                username.clone(),
                password.clone(),
                first_name.clone(),
                last_name.clone(),
                email.clone(),
            ),
            (DbOperation::CreateLogRecord, RequestPayload::LogRecord { sync_level, .. }) => {
                Ok(SuccessPayload::LogRecordAccepted {
                    sync_level: *sync_level,
                })
            }
            (op, _) => Err(FailCause::new(
                Some(500),
                "Internal Server Error",
                format!("operation {op} received a mismatched payload"),
            )),
        };

        let completion = match result {
            Ok(payload) => request.complete_success(payload),
            Err(cause) => request.complete_failure(cause),
        };
        if completion.is_err() {
            tracing::warn!("attempted to complete an already-completed request");
        }
    }
}

/// Builds [`SqliteDao`] instances bound to a single on-disk file.
pub struct SqliteDaoFactory {
    db_path: PathBuf,
    reconnect_delay: Duration,
    clean_start: bool,
    kdf_params: KdfParams,
    uuid_params: UuidParams,
}

impl SqliteDaoFactory {
    /// Construct a factory. `clean_start` removes any existing file at
    /// `db_path` before the first connection is opened (`spec.md` §6
    /// "Persisted state": "On clean start the file is removed at process
    /// init").
    #[must_use]
    pub fn new(
        db_path: PathBuf,
        reconnect_delay: Duration,
        clean_start: bool,
        kdf_params: KdfParams,
        uuid_params: UuidParams,
    ) -> Self {
        Self {
            db_path,
            reconnect_delay,
            clean_start,
            kdf_params,
            uuid_params,
        }
    }
}

impl DaoFactory for SqliteDaoFactory {
    fn build(&self) -> Result<Box<dyn Dao>, DaoBuildError> {
        if self.clean_start && self.db_path.exists() {
            std::fs::remove_file(&self.db_path)
                .map_err(|err| DaoBuildError::InitFailed(err.to_string()))?;
        }

        let mut dao = SqliteDao {
            db_path: self.db_path.clone(),
            reconnect_delay: self.reconnect_delay,
            conn: None,
            kdf: AuthKdf::new(self.kdf_params.clone()),
            uuid_gen: UuidGen::new(self.uuid_params),
        };
        dao.reconnect();
        if dao.conn.is_none() {
            return Err(DaoBuildError::InitFailed(
                "failed to open initial db connection".to_owned(),
            ));
        }
        Ok(Box::new(dao))
    }
}
