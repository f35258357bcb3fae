//! DB worker loop (`spec.md` §4.2).
//!
//! Owns exactly one [`Dao`], constructed on the worker's own dedicated OS
//! thread so embedded-SQL DAOs that refuse cross-thread handles stay safe.
//! The loop never exits: DAO failures are caught at the loop barrier and
//! recorded on the offending request, never propagated out.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::dao::DaoFactory;
use crate::dispatch::DispatchBank;
use crate::domain::FailCause;

/// Tuning knobs for the worker's idle back-off (`spec.md` §4.2 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Consecutive empty polls before the worker starts sleeping.
    pub idle_threshold: u32,
    /// Sleep duration once the idle threshold is exceeded.
    pub idle_sleep: Duration,
}

impl WorkerConfig {
    /// `spec.md` §4.2's documented defaults: threshold 10, sleep 10ms.
    #[must_use]
    pub const fn defaults() -> Self {
        Self {
            idle_threshold: 10,
            idle_sleep: Duration::from_millis(10),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Spawns the DB worker loop on its own dedicated thread.
///
/// Returns a [`JoinHandle`] the caller may join at shutdown; the loop body
/// itself runs forever absent a panic that escapes the failure barrier
/// (which would itself be a bug, since the barrier catches all panics from
/// `DAO::serve`).
pub fn spawn(
    dispatch: Arc<DispatchBank>,
    dao_factory: Arc<dyn DaoFactory>,
    config: WorkerConfig,
) -> JoinHandle<()> {
    thread::spawn(move || run(&dispatch, dao_factory.as_ref(), config))
}

fn run(dispatch: &DispatchBank, dao_factory: &dyn DaoFactory, config: WorkerConfig) {
    let mut dao = match dao_factory.build() {
        Ok(dao) => dao,
        Err(err) => {
            tracing::error!(error = %err, "db worker failed to construct its dao; worker exiting");
            return;
        }
    };

    let mut idle_counter: u32 = 0;
    loop {
        match dispatch.next() {
            Some(request) => {
                idle_counter = 0;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| dao.serve(&request)));
                if let Err(payload) = outcome {
                    tracing::error!("db worker caught a panic from dao::serve");
                    let _ = request.complete_failure(FailCause::from_panic(payload.as_ref()));
                }
            }
            None => {
                idle_counter = idle_counter.saturating_add(1);
                if idle_counter > config.idle_threshold {
                    thread::sleep(config.idle_sleep);
                    idle_counter = idle_counter.saturating_sub(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KdfMethod, KdfParams, UuidParams};
    use crate::dao::InMemoryDaoFactory;
    use crate::domain::{DbOperation, Priority, Request, RequestOutcome, RequestPayload, SuccessPayload};
    use std::time::Instant;

    fn wait_for_completion(request: &Request, timeout: Duration) -> Option<RequestOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(outcome) = request.poll() {
                return Some(outcome.clone());
            }
            if Instant::now() > deadline {
                return None;
            }
            thread::yield_now();
        }
    }

    #[test]
    fn health_check_completes_within_fifty_millis_at_default_backoff() {
        let dispatch = Arc::new(DispatchBank::new());
        let kdf_params =
            KdfParams::new(b"test-salt".to_vec(), 512, 8, 1000, 18, KdfMethod::Pbkdf2).expect("valid params");
        let factory: Arc<dyn DaoFactory> =
            Arc::new(InMemoryDaoFactory::new(kdf_params, UuidParams::default_params()));

        let _handle = spawn(Arc::clone(&dispatch), factory, WorkerConfig::defaults());

        let request = Arc::new(Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None));
        dispatch.submit(Arc::clone(&request)).expect("submit succeeds");

        let outcome = wait_for_completion(&request, Duration::from_millis(50))
            .expect("worker completes the health check within 50ms");
        assert!(matches!(
            outcome,
            RequestOutcome::Success(SuccessPayload::HealthCheck(_))
        ));
    }

    #[test]
    fn worker_survives_a_dao_panic_and_keeps_serving() {
        struct FlakyDao {
            calls: u32,
        }
        impl crate::dao::Dao for FlakyDao {
            fn serve(&mut self, request: &Request) {
                self.calls += 1;
                if self.calls == 1 {
                    panic!("simulated dao failure");
                }
                let _ = request.complete_success(SuccessPayload::HealthCheck("ok".into()));
            }
        }
        struct FlakyDaoFactory;
        impl DaoFactory for FlakyDaoFactory {
            fn build(&self) -> Result<Box<dyn crate::dao::Dao>, crate::dao::DaoBuildError> {
                Ok(Box::new(FlakyDao { calls: 0 }))
            }
        }

        let dispatch = Arc::new(DispatchBank::new());
        let factory: Arc<dyn DaoFactory> = Arc::new(FlakyDaoFactory);
        let _handle = spawn(Arc::clone(&dispatch), factory, WorkerConfig::defaults());

        let first = Arc::new(Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None));
        dispatch.submit(Arc::clone(&first)).expect("submit succeeds");
        let first_outcome =
            wait_for_completion(&first, Duration::from_millis(200)).expect("first request completes");
        assert!(matches!(first_outcome, RequestOutcome::Failure(_)));

        let second = Arc::new(Request::new(DbOperation::HealthChk1, Priority::Normal, RequestPayload::None));
        dispatch.submit(Arc::clone(&second)).expect("submit succeeds");
        let second_outcome = wait_for_completion(&second, Duration::from_millis(200))
            .expect("worker keeps serving after a panic");
        assert!(matches!(
            second_outcome,
            RequestOutcome::Success(SuccessPayload::HealthCheck(_))
        ));
    }
}
