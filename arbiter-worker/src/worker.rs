use crate::config::Config;
use crate::judger::Judger;
use crate::redis::RedisModule;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arbiter_protocol::{SubmissionTask, Verdict};
use tokio::time;
use tracing::{debug, info, warn};

/// After the first consecutive transport failure, only every Nth repeat is
/// logged at warn; retrying is unbounded but the log volume is not.
const WARN_EVERY_N_FAILURES: u32 = 12;

/// The queue-consumer loop. Strictly serial: one submission is dequeued,
/// judged to completion and its verdict stored before the next pop. Lost
/// connectivity never terminates the worker; the job in flight during a
/// crash is lost, there is no redelivery.
pub struct Worker {
    config: Arc<Config>,
    redis: Arc<RedisModule>,
    judger: Judger,
}

impl Worker {
    pub fn new(config: Arc<Config>, redis: Arc<RedisModule>, judger: Judger) -> Self {
        Self {
            config,
            redis,
            judger,
        }
    }

    pub async fn main_loop(&self) -> Result<()> {
        info!(queue = %self.config.worker.queue_key, "worker started, waiting for submissions");

        let retry_delay = Duration::from_millis(self.config.worker.retry_delay);
        let mut failures: u32 = 0;

        loop {
            match self.serve_one().await {
                Ok(()) => failures = 0,
                Err(err) => {
                    failures += 1;
                    if failures == 1 || failures % WARN_EVERY_N_FAILURES == 0 {
                        warn!(err = %format!("{:#}", err), failures, "transport failure, retrying");
                    } else {
                        debug!(err = %format!("{:#}", err), "transport failure, retrying");
                    }
                    time::sleep(retry_delay).await;
                }
            }
        }
    }

    async fn serve_one(&self) -> Result<()> {
        let payload = self.redis.pop_task(&self.config.worker.queue_key).await?;

        let (submission_id, verdict) = self.process(&payload).await;

        let id = match submission_id {
            Some(id) => id,
            None => {
                warn!("dropping a verdict for a payload without a submission id");
                return Ok(());
            }
        };

        self.redis
            .store_verdict(
                &self.config.worker.result_key_prefix,
                &id,
                &verdict,
                self.config.worker.result_expiry,
            )
            .await?;
        info!(submission_id = %id, verdict = ?verdict.verdict, "verdict stored");
        Ok(())
    }

    async fn process(&self, payload: &str) -> (Option<String>, Verdict) {
        match serde_json::from_str::<SubmissionTask>(payload) {
            Ok(task) => {
                info!(
                    submission_id = %task.submission_id,
                    language = %task.language,
                    cases = task.test_cases.len(),
                    "processing submission"
                );
                let verdict = self.judger.judge(&task).await;
                (Some(task.submission_id), verdict)
            }
            Err(err) => {
                warn!(%err, "malformed task payload");
                (
                    salvage_submission_id(payload),
                    Verdict::internal_error("Invalid Task Format"),
                )
            }
        }
    }
}

/// A malformed payload still gets a stored verdict when the id field itself
/// survived; without an id there is nothing to key the result by.
fn salvage_submission_id(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let id = value.get("submissionId")?.as_str()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ExecutionResult, MockSandbox};
    use crate::workspace::WorkspaceModule;

    use arbiter_protocol::VerdictKind;

    fn worker(tag: &str, sandbox: MockSandbox) -> Worker {
        let root = std::env::temp_dir().join(format!("arbiter-worker-test-{}", tag));
        let mut config = Config::default_for_tests();
        config.executor.workspace_root = root;
        let config = Arc::new(config);

        let redis = Arc::new(RedisModule::new(&config).unwrap());
        let workspaces = Arc::new(WorkspaceModule::new(&config).unwrap());
        let judger = Judger::new(&config, Arc::new(sandbox), workspaces);
        Worker::new(config, redis, judger)
    }

    #[tokio::test]
    async fn valid_payload_is_judged_and_keyed_by_its_id() {
        let mut sandbox = MockSandbox::new();
        sandbox
            .expect_run()
            .times(1)
            .returning(|_, _, _, _, _| {
                Ok(ExecutionResult {
                    exit_code: 0,
                    stdout: "5\n".to_owned(),
                    stderr: String::new(),
                    elapsed: std::time::Duration::from_millis(3),
                    timed_out: false,
                })
            });
        let worker = worker("valid", sandbox);

        let payload = r#"{
            "submissionId": "sub-9",
            "language": "python",
            "code": "print(input())",
            "testCases": [{"input": "5", "output": "5"}]
        }"#;

        let (id, verdict) = worker.process(payload).await;
        assert_eq!(id.as_deref(), Some("sub-9"));
        assert_eq!(verdict.verdict, VerdictKind::Accepted);
    }

    #[tokio::test]
    async fn malformed_payload_yields_internal_error_with_salvaged_id() {
        let worker = worker("malformed", MockSandbox::new());

        let payload = r#"{"submissionId": "sub-bad", "language": 42}"#;
        let (id, verdict) = worker.process(payload).await;

        assert_eq!(id.as_deref(), Some("sub-bad"));
        assert_eq!(verdict.verdict, VerdictKind::InternalError);
        assert_eq!(verdict.details, "Invalid Task Format");
    }

    #[tokio::test]
    async fn unparseable_payload_has_no_id_to_store_under() {
        let worker = worker("garbage", MockSandbox::new());

        let (id, verdict) = worker.process("not json at all").await;
        assert!(id.is_none());
        assert_eq!(verdict.verdict, VerdictKind::InternalError);
    }

    #[test]
    fn salvage_finds_only_usable_string_ids() {
        assert_eq!(
            salvage_submission_id(r#"{"submissionId": "x", "language": 1}"#).as_deref(),
            Some("x")
        );
        assert!(salvage_submission_id(r#"{"submissionId": ""}"#).is_none());
        assert!(salvage_submission_id(r#"{"submissionId": 7}"#).is_none());
        assert!(salvage_submission_id(r#"{"language": "python"}"#).is_none());
        assert!(salvage_submission_id("{oops").is_none());
    }
}
