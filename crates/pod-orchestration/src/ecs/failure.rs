//! Conversion of per-resource failures into errors

use super::api::{Failure, RunTaskInput, RunTaskOutput};
use crate::error::Error;

/// Failure reason for a task that does not exist
pub const REASON_TASK_MISSING: &str = "MISSING";

/// Failure reasons meaning the cluster lacks capacity right now
const INSUFFICIENT_CAPACITY_REASONS: [&str; 2] = ["RESOURCE:CPU", "RESOURCE:MEMORY"];

/// Convert a failure into an error.
///
/// A missing task becomes [`Error::TaskNotFound`].
pub fn convert_failure(failure: &Failure) -> Error {
    if let (Some(arn), Some(REASON_TASK_MISSING)) = (&failure.arn, failure.reason.as_deref()) {
        return Error::TaskNotFound { arn: arn.clone() };
    }

    let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
    let parts: Vec<String> = [
        non_empty(&failure.arn).map(|arn| format!("task '{}'", arn)),
        non_empty(&failure.reason).map(|reason| format!("(reason) {}", reason)),
        non_empty(&failure.detail).map(|detail| format!("(detail) {}", detail)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        Error::Failure("failure did not contain any additional failure information".to_string())
    } else {
        Error::Failure(parts.join(": "))
    }
}

/// Convert every failure, or `None` if there are none
pub fn convert_failures(failures: &[Failure]) -> Option<Error> {
    Error::from_many(failures.iter().map(convert_failure).collect())
}

/// Whether a run failed only because the cluster is temporarily out of
/// capacity.
///
/// Client adapters may retry such runs; this crate never does.
pub fn is_insufficient_capacity(input: &RunTaskInput, output: &RunTaskOutput) -> bool {
    input.count == Some(1)
        && output.tasks.is_empty()
        && output.failures.iter().any(|f| {
            f.reason
                .as_deref()
                .is_some_and(|r| INSUFFICIENT_CAPACITY_REASONS.contains(&r))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(arn: Option<&str>, reason: Option<&str>, detail: Option<&str>) -> Failure {
        Failure {
            arn: arn.map(String::from),
            reason: reason.map(String::from),
            detail: detail.map(String::from),
        }
    }

    #[test]
    fn test_missing_task_is_not_found() {
        let err = convert_failure(&failure(Some("arn:task/1"), Some("MISSING"), None));
        assert!(err.is_task_not_found());

        let no_arn = convert_failure(&failure(None, Some("MISSING"), None));
        assert!(!no_arn.is_task_not_found());
        assert_eq!(no_arn.to_string(), "(reason) MISSING");
    }

    #[test]
    fn test_failure_message_parts() {
        let err = convert_failure(&failure(Some("arn:task/1"), Some("AGENT"), Some("agent down")));
        assert_eq!(err.to_string(), "task 'arn:task/1': (reason) AGENT: (detail) agent down");

        let empty = convert_failure(&Failure::default());
        assert_eq!(
            empty.to_string(),
            "failure did not contain any additional failure information"
        );
    }

    #[test]
    fn test_convert_failures() {
        assert!(convert_failures(&[]).is_none());
        let err = convert_failures(&[
            failure(None, Some("A"), None),
            failure(None, Some("B"), None),
        ])
        .unwrap();
        assert_eq!(err.to_string(), "(reason) A; (reason) B");
    }

    #[test]
    fn test_insufficient_capacity_only_for_single_task() {
        let output = RunTaskOutput {
            tasks: vec![],
            failures: vec![failure(None, Some("RESOURCE:MEMORY"), None)],
        };
        let mut input = RunTaskInput {
            count: Some(1),
            ..Default::default()
        };
        assert!(is_insufficient_capacity(&input, &output));

        input.count = Some(2);
        assert!(!is_insufficient_capacity(&input, &output));

        input.count = Some(1);
        let other = RunTaskOutput {
            tasks: vec![],
            failures: vec![failure(None, Some("AGENT"), None)],
        };
        assert!(!is_insufficient_capacity(&input, &other));
    }
}
