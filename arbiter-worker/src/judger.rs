use crate::config::Config;
use crate::lang::Language;
use crate::sandbox::{MountMode, Sandbox, SandboxLimits, MOUNT_POINT};
use crate::workspace::{Workspace, WorkspaceModule};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arbiter_protocol::{SubmissionTask, Verdict};
use tracing::{debug, error};
use validator::Validate;

struct JudgeLimits {
    run: SandboxLimits,
    compile: SandboxLimits,
}

/// Drives one submission through validate → prepare → (compile) → test loop
/// and derives the terminal verdict. Test cases run strictly in order and
/// the loop short-circuits on the first failure; no further case is ever
/// executed and no partial tally is reported.
pub struct Judger {
    sandbox: Arc<dyn Sandbox>,
    workspaces: Arc<WorkspaceModule>,
    limits: JudgeLimits,
}

impl Judger {
    pub fn new(
        config: &Config,
        sandbox: Arc<dyn Sandbox>,
        workspaces: Arc<WorkspaceModule>,
    ) -> Self {
        let memory_bytes = config.executor.memory_limit.as_u64();
        let limits = JudgeLimits {
            run: SandboxLimits {
                memory_bytes,
                wall_clock: Duration::from_millis(config.executor.time_limit),
            },
            compile: SandboxLimits {
                memory_bytes,
                wall_clock: Duration::from_millis(config.executor.compile_time_limit),
            },
        };
        Self {
            sandbox,
            workspaces,
            limits,
        }
    }

    /// Always yields a verdict: every internal failure is folded into
    /// `Internal Error` here so the caller never sees a raw error.
    pub async fn judge(&self, task: &SubmissionTask) -> Verdict {
        match self.evaluate(task).await {
            Ok(verdict) => verdict,
            Err(err) => {
                error!(submission_id = %task.submission_id, err = %format!("{:#}", err), "judge pipeline failed");
                Verdict::internal_error(format!("{:#}", err))
            }
        }
    }

    async fn evaluate(&self, task: &SubmissionTask) -> Result<Verdict> {
        if task.validate().is_err() {
            return Ok(Verdict::internal_error("Invalid Task Format"));
        }

        let lang = match Language::from_id(&task.language) {
            Some(lang) => lang,
            // No profile registered: a validation failure. The sandbox is
            // never invoked for an unsupported language.
            None => return Ok(Verdict::internal_error("Language not supported")),
        };
        let profile = lang.profile();

        let workspace = self.workspaces.prepare(
            &task.submission_id,
            profile.src_name,
            &task.code,
            &task.test_cases,
        )?;
        // Teardown on every exit path below, early returns and panics alike.
        let workspace = scopeguard::guard(workspace, |ws| ws.destroy());

        if let Some(compile_cmd) = profile.compile_cmd {
            debug!(submission_id = %task.submission_id, lang = lang.id(), "compiling");
            let compiled = self
                .sandbox
                .run(
                    profile.image,
                    compile_cmd,
                    workspace.path(),
                    MountMode::ReadWrite,
                    &self.limits.compile,
                )
                .await;

            match compiled {
                Err(err) => {
                    return Ok(Verdict::compilation_error(format!(
                        "failed to run the compiler: {:#}",
                        err
                    )))
                }
                Ok(result) if result.timed_out => {
                    return Ok(Verdict::compilation_error(format!(
                        "compilation exceeded the {} ms limit",
                        self.limits.compile.wall_clock.as_millis()
                    )))
                }
                Ok(result) if result.exit_code != 0 => {
                    let details = if result.stderr.trim().is_empty() {
                        format!("compiler exited with code {}", result.exit_code)
                    } else {
                        result.stderr
                    };
                    return Ok(Verdict::compilation_error(details));
                }
                Ok(_) => {}
            }
        }

        let mut total_ms = 0f64;

        for (index, case) in task.test_cases.iter().enumerate() {
            let command = format!(
                "{} < {}/{}",
                profile.run_cmd,
                MOUNT_POINT,
                Workspace::input_name(index)
            );

            let result = match self
                .sandbox
                .run(
                    profile.image,
                    &command,
                    workspace.path(),
                    MountMode::ReadOnly,
                    &self.limits.run,
                )
                .await
            {
                Ok(result) => result,
                Err(err) => {
                    return Ok(Verdict::runtime_error(format!(
                        "failed to run the solution: {:#}",
                        err
                    )))
                }
            };

            let case_ms = result.elapsed.as_secs_f64() * 1000.0;
            total_ms += case_ms;

            if result.timed_out {
                return Ok(Verdict::time_limit_exceeded(format!(
                    "Test Case {} exceeded the {} ms time limit",
                    index + 1,
                    self.limits.run.wall_clock.as_millis()
                )));
            }

            if result.exit_code != 0 {
                let details = if result.stdout.trim().is_empty() {
                    format!("process exited with code {}", result.exit_code)
                } else {
                    result.stdout.trim().to_owned()
                };
                return Ok(Verdict::runtime_error(details));
            }

            let actual = result.stdout.trim();
            let expected = case.output.trim();
            if actual != expected {
                return Ok(Verdict::wrong_answer(index + 1, expected, actual, case_ms));
            }
        }

        Ok(Verdict::accepted(total_ms))
    }
}
