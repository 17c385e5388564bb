use crate::config::Config;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arbiter_protocol::TestCase;
use tracing::warn;

/// Creates and tears down the per-submission file area. Each submission gets
/// an exclusively owned directory under the workspace root holding its source
/// file and one input file per test case.
pub struct WorkspaceModule {
    root: PathBuf,
}

impl WorkspaceModule {
    pub fn new(config: &Config) -> Result<Self> {
        let root = &config.executor.workspace_root;
        if !root.exists() {
            fs::create_dir_all(root).with_context(|| {
                format!("failed to create workspace root: path = {}", root.display())
            })?;
        }
        Ok(Self { root: root.clone() })
    }

    /// Materializes the workspace for one submission: the source file named
    /// by the language profile plus `input_<i>.txt` per test case. A stale
    /// directory left over from a crashed run is replaced.
    pub fn prepare(
        &self,
        submission_id: &str,
        src_name: &str,
        code: &str,
        test_cases: &[TestCase],
    ) -> Result<Workspace> {
        if !is_valid_dir_name(submission_id) {
            anyhow::bail!("invalid submission id: {:?}", submission_id);
        }

        let path = self.root.join(submission_id);
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir(&path)
            .with_context(|| format!("failed to create workspace: path = {}", path.display()))?;

        let workspace = Workspace { path };

        fs::write(workspace.path.join(src_name), code)
            .context("failed to write the source file")?;

        for (index, case) in test_cases.iter().enumerate() {
            let input_path = workspace.path.join(Workspace::input_name(index));
            fs::write(&input_path, &case.input).with_context(|| {
                format!("failed to write input file: path = {}", input_path.display())
            })?;
        }

        Ok(workspace)
    }
}

/// Handle to one prepared submission directory.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Input file name for the 0-based test index, so the executor can
    /// derive the redirection target positionally.
    pub fn input_name(index: usize) -> String {
        format!("input_{}.txt", index)
    }

    /// Best-effort recursive removal. Idempotent: a directory that is
    /// already gone is not an error; any other failure is logged and
    /// swallowed so teardown can never mask the verdict.
    pub fn destroy(&self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(%err, path = %self.path.display(), "failed to remove workspace");
            }
        }
    }
}

fn is_valid_dir_name(s: &str) -> bool {
    if s.is_empty() || s.len() > 128 {
        return false;
    }
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        && !s.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn module(tag: &str) -> WorkspaceModule {
        let root = std::env::temp_dir().join(format!("arbiter-ws-test-{}", tag));
        let mut config = Config::default_for_tests();
        config.executor.workspace_root = root;
        WorkspaceModule::new(&config).unwrap()
    }

    fn cases(inputs: &[&str]) -> Vec<TestCase> {
        inputs
            .iter()
            .map(|input| TestCase {
                input: (*input).to_owned(),
                output: String::new(),
            })
            .collect()
    }

    #[test]
    fn prepare_materializes_source_and_inputs() {
        let module = module("prepare");
        let ws = module
            .prepare("sub-1", "solution.py", "print(1)", &cases(&["a", "b"]))
            .unwrap();

        assert_eq!(
            fs::read_to_string(ws.path().join("solution.py")).unwrap(),
            "print(1)"
        );
        assert_eq!(fs::read_to_string(ws.path().join("input_0.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(ws.path().join("input_1.txt")).unwrap(), "b");

        ws.destroy();
        assert!(!ws.path().exists());
    }

    #[test]
    fn prepare_replaces_a_stale_directory() {
        let module = module("stale");
        let first = module
            .prepare("sub-2", "solution.py", "old", &cases(&["x"]))
            .unwrap();
        let stale_marker = first.path().join("leftover.bin");
        fs::write(&stale_marker, b"junk").unwrap();

        let second = module.prepare("sub-2", "solution.py", "new", &[]).unwrap();
        assert!(!stale_marker.exists());
        assert_eq!(
            fs::read_to_string(second.path().join("solution.py")).unwrap(),
            "new"
        );
        second.destroy();
    }

    #[test]
    fn destroy_is_idempotent() {
        let module = module("idem");
        let ws = module.prepare("sub-3", "solution.py", "", &[]).unwrap();
        ws.destroy();
        ws.destroy();
        assert!(!ws.path().exists());
    }

    #[test]
    fn hostile_submission_ids_are_rejected() {
        let module = module("hostile");
        for id in ["", "..", "../evil", "a/b", ".hidden"] {
            assert!(module.prepare(id, "solution.py", "", &[]).is_err(), "{id}");
        }
    }

    #[test]
    fn input_names_are_positional() {
        assert_eq!(Workspace::input_name(0), "input_0.txt");
        assert_eq!(Workspace::input_name(11), "input_11.txt");
    }
}
