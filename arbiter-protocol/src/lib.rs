#![deny(clippy::all)]

pub mod task;
pub mod verdict;

pub use self::task::{SubmissionTask, TestCase};
pub use self::verdict::{Verdict, VerdictKind, VerdictStats};
