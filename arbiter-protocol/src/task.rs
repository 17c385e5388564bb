use serde::{Deserialize, Serialize};
use validator::Validate;

/// One test case: the text fed to the program's stdin and the output it
/// must print. Case order inside a task is significant: it fixes both the
/// execution order and the 1-based index reported on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

/// A judge job as it travels over the submission queue.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionTask {
    #[validate(length(min = 1))]
    pub submission_id: String,

    #[validate(length(min = 1))]
    pub language: String,

    pub code: String,

    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_decodes_camel_case_payload() {
        let payload = r#"{
            "submissionId": "sub-42",
            "language": "python",
            "code": "print(input())",
            "testCases": [{"input": "5", "output": "5"}]
        }"#;

        let task: SubmissionTask = serde_json::from_str(payload).unwrap();
        assert_eq!(task.submission_id, "sub-42");
        assert_eq!(task.language, "python");
        assert_eq!(task.test_cases.len(), 1);
        assert_eq!(task.test_cases[0].input, "5");
        assert!(task.validate().is_ok());
    }

    #[test]
    fn missing_test_cases_defaults_to_empty() {
        let payload = r#"{"submissionId": "s", "language": "python", "code": ""}"#;
        let task: SubmissionTask = serde_json::from_str(payload).unwrap();
        assert!(task.test_cases.is_empty());
    }

    #[test]
    fn empty_submission_id_fails_validation() {
        let payload = r#"{"submissionId": "", "language": "python", "code": ""}"#;
        let task: SubmissionTask = serde_json::from_str(payload).unwrap();
        assert!(task.validate().is_err());
    }
}
