//! In-memory reference [`Dao`]: no pooling, no reconnect, no look-aside
//! cache (`spec.md` §4.3). State lives entirely in a `HashMap` owned by the
//! DAO and is lost when the process exits.

use std::collections::HashMap;

use crate::crypto::{AuthKdf, KdfParams, UuidGen, UuidParams, shadows_match};
use crate::domain::{
    AuthOutcome, DbOperation, FailCause, Request, RequestPayload, SuccessPayload, UserRecord,
};

use super::{Dao, DaoBuildError, DaoFactory};

const HEALTH_CHECK_OK: &str = "DBL health check: OK";

struct StoredUser {
    record: UserRecord,
    pass_hash: String,
}

/// In-memory reference DAO (`spec.md` §4.3 "In-memory reference").
pub struct InMemoryDao {
    kdf: AuthKdf,
    uuid_gen: UuidGen,
    users_by_uid: HashMap<String, StoredUser>,
}

impl InMemoryDao {
    /// Build a fresh, empty in-memory DAO.
    #[must_use]
    pub fn new(kdf: AuthKdf, uuid_gen: UuidGen) -> Self {
        Self {
            kdf,
            uuid_gen,
            users_by_uid: HashMap::new(),
        }
    }

    fn find_by_username(&self, username: &str) -> Option<(&str, &StoredUser)> {
        self.users_by_uid
            .iter()
            .find(|(_, stored)| stored.record.username == username)
            .map(|(uid, stored)| (uid.as_str(), stored))
    }

    fn health_check(&self) -> SuccessPayload {
        SuccessPayload::HealthCheck(HEALTH_CHECK_OK.to_owned())
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<SuccessPayload, FailCause> {
        let Some((_, stored)) = self.find_by_username(username) else {
            return Ok(SuccessPayload::Authenticated(AuthOutcome::InvalidUser));
        };
        let shadow = self
            .kdf
            .shadow(password)
            .map_err(|err| FailCause::from_error(&err))?;
        if shadows_match(&shadow, &stored.pass_hash) {
            Ok(SuccessPayload::Authenticated(AuthOutcome::Authenticated(
                stored.record.clone(),
            )))
        } else {
            Ok(SuccessPayload::Authenticated(AuthOutcome::InvalidPass))
        }
    }

    fn describe_user(&self, uid: &str) -> Result<SuccessPayload, FailCause> {
        self.users_by_uid
            .get(uid)
            .map(|stored| SuccessPayload::User(stored.record.clone()))
            .ok_or_else(|| FailCause::new(Some(404), "no such user", format!("uid {uid} not found")))
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
            username,
            first_name,
            last_name,
            email,
        };
        self.users_by_uid.insert(
            uid,
            StoredUser {
                record: record.clone(),
                pass_hash,
            },
        );
        Ok(SuccessPayload::User(record))
    }
}

impl Dao for InMemoryDao {
    fn serve(&mut self, request: &Request) {
        let result = match (request.op(), request.data()) {
            (DbOperation::HealthChk1 | DbOperation::HealthChk2 | DbOperation::HealthChk3, _) => {
                Ok(self.health_check())
            }
            (DbOperation::AuthenticateUser, RequestPayload::Authenticate { username, password }) => {
                self.authenticate(username, password)
            }
            (DbOperation::DescribeUser, RequestPayload::DescribeUser { uid }) => {
                self.describe_user(uid)
            }
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
            // The request was already completed by a previous serve call, which
            // should never happen under the single-writer discipline; nothing
            // further to do since we cannot overwrite a resolved outcome.
        }
    }
}

/// Builds [`InMemoryDao`] instances.
pub struct InMemoryDaoFactory {
    kdf_params: KdfParams,
    uuid_params: UuidParams,
}

impl InMemoryDaoFactory {
    /// Construct a factory from the KDF and UUID parameters new DAOs should
    /// use.
    #[must_use]
    pub fn new(kdf_params: KdfParams, uuid_params: UuidParams) -> Self {
        Self {
            kdf_params,
            uuid_params,
        }
    }
}

impl DaoFactory for InMemoryDaoFactory {
    fn build(&self) -> Result<Box<dyn Dao>, DaoBuildError> {
        Ok(Box::new(InMemoryDao::new(
            AuthKdf::new(self.kdf_params.clone()),
            UuidGen::new(self.uuid_params),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, RequestOutcome};

    fn test_kdf_params() -> KdfParams {
        KdfParams::new(b"test-salt".to_vec(), 512, 8, 1000, 18, crate::crypto::KdfMethod::Pbkdf2)
            .expect("valid params")
    }

    fn test_dao() -> InMemoryDao {
        InMemoryDao::new(
            AuthKdf::new(test_kdf_params()),
            UuidGen::new(UuidParams::default_params()),
        )
    }

    #[test]
    fn health_check_returns_ok_string() {
        let mut dao = test_dao();
        let req = Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None);
        dao.serve(&req);
        match req.poll() {
            Some(RequestOutcome::Success(SuccessPayload::HealthCheck(msg))) => {
                assert_eq!(msg, HEALTH_CHECK_OK);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn create_then_authenticate_user() {
        let mut dao = test_dao();
        let create = Request::new(
            DbOperation::CreateUser,
            Priority::Normal,
            RequestPayload::UpsertUser {
                uid: None,
                username: "alice".to_owned(),
                password: "hunter2".to_owned(),
                first_name: "Alice".to_owned(),
                last_name: "Anderson".to_owned(),
                email: "alice@example.com".to_owned(),
            },
        );
        dao.serve(&create);
        assert!(matches!(create.poll(), Some(RequestOutcome::Success(SuccessPayload::User(_)))));

        let auth = Request::new(
            DbOperation::AuthenticateUser,
            Priority::Normal,
            RequestPayload::Authenticate {
                username: "alice".to_owned(),
                password: "hunter2".to_owned(),
            },
        );
        dao.serve(&auth);
        match auth.poll() {
            Some(RequestOutcome::Success(SuccessPayload::Authenticated(AuthOutcome::Authenticated(user)))) => {
                assert_eq!(user.username, "alice");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn authenticate_unknown_user_is_logical_failure_not_fail_cause() {
        let mut dao = test_dao();
        let auth = Request::new(
            DbOperation::AuthenticateUser,
            Priority::Normal,
            RequestPayload::Authenticate {
                username: "ghost".to_owned(),
                password: "anything".to_owned(),
            },
        );
        dao.serve(&auth);
        assert!(matches!(
            auth.poll(),
            Some(RequestOutcome::Success(SuccessPayload::Authenticated(AuthOutcome::InvalidUser)))
        ));
    }

    #[test]
    fn authenticate_wrong_password() {
        let mut dao = test_dao();
        let create = Request::new(
            DbOperation::CreateUser,
            Priority::Normal,
            RequestPayload::UpsertUser {
                uid: None,
                username: "bob".to_owned(),
                password: "correct".to_owned(),
                first_name: "Bob".to_owned(),
                last_name: "Baker".to_owned(),
                email: "bob@example.com".to_owned(),
            },
        );
        dao.serve(&create);

        let auth = Request::new(
            DbOperation::AuthenticateUser,
            Priority::Normal,
            RequestPayload::Authenticate {
                username: "bob".to_owned(),
                password: "wrong".to_owned(),
            },
        );
        dao.serve(&auth);
        assert!(matches!(
            auth.poll(),
            Some(RequestOutcome::Success(SuccessPayload::Authenticated(AuthOutcome::InvalidPass)))
        ));
    }

    #[test]
    fn log_record_is_acknowledged() {
        let mut dao = test_dao();
        let req = Request::new(
            DbOperation::CreateLogRecord,
            Priority::Low,
            RequestPayload::LogRecord {
                body: b"line one".to_vec(),
                sync_level: 1,
            },
        );
        dao.serve(&req);
        assert!(matches!(
            req.poll(),
            Some(RequestOutcome::Success(SuccessPayload::LogRecordAccepted { sync_level: 1 }))
        ));
    }
}
