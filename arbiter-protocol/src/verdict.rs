use serde::{Deserialize, Serialize};

/// Terminal classification of one submission. Exactly one of these is
/// produced per dequeued job; once produced it is never revised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictKind {
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    #[serde(rename = "Compilation Error")]
    CompilationError,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "Internal Error")]
    InternalError,
}

/// Aggregate stats reported with an accepted submission. Memory usage is
/// not measured by the executor, so it is always reported as "N/A".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictStats {
    pub time: String,
    pub memory: String,
}

impl VerdictStats {
    pub fn with_total_time(total_ms: f64) -> Self {
        Self {
            time: format_millis(total_ms),
            memory: "N/A".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub verdict: VerdictKind,

    pub details: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<VerdictStats>,

    #[serde(rename = "timeTaken", skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<String>,
}

impl Verdict {
    pub fn accepted(total_ms: f64) -> Self {
        Self {
            verdict: VerdictKind::Accepted,
            details: "All test cases passed".to_owned(),
            stats: Some(VerdictStats::with_total_time(total_ms)),
            time_taken: None,
        }
    }

    /// `case_number` is 1-based: the first failing case is "Test Case 1".
    pub fn wrong_answer(case_number: usize, expected: &str, actual: &str, case_ms: f64) -> Self {
        Self {
            verdict: VerdictKind::WrongAnswer,
            details: format!(
                "Test Case {} Failed.\nExpected: {}\nGot: {}",
                case_number, expected, actual
            ),
            stats: None,
            time_taken: Some(format_millis(case_ms)),
        }
    }

    pub fn compilation_error(details: impl Into<String>) -> Self {
        Self {
            verdict: VerdictKind::CompilationError,
            details: details.into(),
            stats: None,
            time_taken: None,
        }
    }

    pub fn runtime_error(details: impl Into<String>) -> Self {
        Self {
            verdict: VerdictKind::RuntimeError,
            details: details.into(),
            stats: None,
            time_taken: None,
        }
    }

    pub fn time_limit_exceeded(details: impl Into<String>) -> Self {
        Self {
            verdict: VerdictKind::TimeLimitExceeded,
            details: details.into(),
            stats: None,
            time_taken: None,
        }
    }

    pub fn internal_error(details: impl Into<String>) -> Self {
        Self {
            verdict: VerdictKind::InternalError,
            details: details.into(),
            stats: None,
            time_taken: None,
        }
    }
}

fn format_millis(ms: f64) -> String {
    format!("{:.2}ms", ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_spellings_match_the_wire_format() {
        let cases = [
            (VerdictKind::Accepted, "\"Accepted\""),
            (VerdictKind::WrongAnswer, "\"Wrong Answer\""),
            (VerdictKind::CompilationError, "\"Compilation Error\""),
            (VerdictKind::RuntimeError, "\"Runtime Error\""),
            (VerdictKind::TimeLimitExceeded, "\"Time Limit Exceeded\""),
            (VerdictKind::InternalError, "\"Internal Error\""),
        ];
        for (kind, expected) in cases {
            assert_eq!(serde_json::to_string(&kind).unwrap(), expected);
        }
    }

    #[test]
    fn accepted_record_carries_stats_but_no_time_taken() {
        let v = Verdict::accepted(123.456);
        let json: serde_json::Value = serde_json::to_value(&v).unwrap();

        assert_eq!(json["verdict"], "Accepted");
        assert_eq!(json["details"], "All test cases passed");
        assert_eq!(json["stats"]["time"], "123.46ms");
        assert_eq!(json["stats"]["memory"], "N/A");
        assert!(json.get("timeTaken").is_none());
    }

    #[test]
    fn wrong_answer_record_names_the_one_based_case() {
        let v = Verdict::wrong_answer(1, "5", "6", 12.0);
        assert_eq!(v.details, "Test Case 1 Failed.\nExpected: 5\nGot: 6");

        let json: serde_json::Value = serde_json::to_value(&v).unwrap();
        assert_eq!(json["verdict"], "Wrong Answer");
        assert_eq!(json["timeTaken"], "12.00ms");
        assert!(json.get("stats").is_none());
    }

    #[test]
    fn error_records_skip_optional_fields() {
        let v = Verdict::internal_error("Language not supported");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(
            json,
            r#"{"verdict":"Internal Error","details":"Language not supported"}"#
        );
    }
}
