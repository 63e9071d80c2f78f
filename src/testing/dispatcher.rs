//! Command dispatcher
//!
//! Turns one operation into one DUT request and hands back the DUT's
//! outcome untouched. Harness-side problems (an unreadable input artifact)
//! are errors; everything the DUT says is an [`Outcome`].

use crate::common::{Error, Result};
use crate::dut::{Outcome, Payload, Request, Transport};

use super::case::{Operation, TestCase};

/// Build the request for an operation, reading its input artifact
///
/// Command words are `verb [target] [input-path]`.
pub fn build_request(case: &TestCase, op: &Operation) -> Result<Request> {
    let mut words = vec![op.verb().to_string()];
    if let Some(target) = op.target() {
        words.extend(target.split_whitespace().map(str::to_string));
    }

    let payload = match op.input_artifact() {
        Some(artifact) => {
            let path = case.resolve(artifact);
            let contents =
                std::fs::read_to_string(&path).map_err(|e| Error::artifact_read(&path, &e))?;
            words.push(path.display().to_string());
            Some(Payload { path, contents })
        }
        None => None,
    };

    Ok(Request {
        domain: op.domain(),
        words,
        payload,
    })
}

/// Send one operation to the DUT
pub async fn dispatch<T: Transport + ?Sized>(
    dut: &mut T,
    case: &TestCase,
    op: &Operation,
) -> Result<Outcome> {
    let request = build_request(case, op)?;

    tracing::debug!(label = op.label(), request = %request, "Dispatching operation");
    let outcome = dut.send(&request).await;

    match &outcome {
        Outcome::Success(text) => {
            tracing::debug!(label = op.label(), bytes = text.len(), "Operation succeeded")
        }
        Outcome::Failure { kind, message } => {
            tracing::debug!(label = op.label(), %kind, message = message.trim(), "Operation failed")
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dut::Domain;
    use crate::testing::OperationSpec;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        async fn send(&mut self, request: &Request) -> Outcome {
            Outcome::Success(request.to_string())
        }
    }

    fn single(spec: OperationSpec, dir: &std::path::Path) -> TestCase {
        let op = Operation::from_spec(spec).unwrap();
        TestCase::new("dispatch", None, vec![op])
            .unwrap()
            .with_artifact_dir(dir)
    }

    #[test]
    fn test_control_operation_has_no_payload() {
        let case = single(
            OperationSpec::new("Init", Domain::Cmd, "reset all"),
            std::path::Path::new("."),
        );
        let request = build_request(&case, &case.operations()[0]).unwrap();
        assert_eq!(request.words, vec!["reset", "all"]);
        assert!(request.payload.is_none());
    }

    #[test]
    fn test_input_artifact_is_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let contents = "node A type=tmsg pattern=LOOP\r\n\tedge A -> B type=defdst\n";
        std::fs::write(dir.path().join("sched.dot"), contents).unwrap();

        let case = single(
            OperationSpec::new("Add", Domain::Sched, "add")
                .target("0")
                .input("sched.dot"),
            dir.path(),
        );
        let request = build_request(&case, &case.operations()[0]).unwrap();
        let path = dir.path().join("sched.dot");

        assert_eq!(
            request.words,
            vec!["add".to_string(), "0".to_string(), path.display().to_string()]
        );
        let payload = request.payload.unwrap();
        assert_eq!(payload.path, path);
        assert_eq!(payload.contents, contents);
    }

    #[tokio::test]
    async fn test_missing_input_artifact_is_reported_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let case = single(
            OperationSpec::new("Start", Domain::Cmd, "startpattern").input("missing.dot"),
            dir.path(),
        );

        let err = dispatch(&mut Echo, &case, &case.operations()[0])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ArtifactRead { .. }));
        assert!(err.to_string().contains("missing.dot"));
    }

    #[tokio::test]
    async fn test_dispatch_returns_raw_outcome() {
        let case = single(
            OperationSpec::new("Q", Domain::Cmd, "rawstatus").target("0.1"),
            std::path::Path::new("."),
        );
        let outcome = dispatch(&mut Echo, &case, &case.operations()[0])
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success("cmd rawstatus 0.1".to_string()));
    }
}
