use super::{ScriptContext, Step, StepBase};
use crate::api::NotificationClient;
use crate::error::Result;
use crate::result::StepResult;
use crate::script::ScriptReport;

/// Checks the notification API up front and posts the script's results
/// once the script has finished.
pub struct NotifyStep {
    base: StepBase,
    client: Box<dyn NotificationClient>,
}

impl NotifyStep {
    pub fn new(client: Box<dyn NotificationClient>) -> Self {
        Self {
            base: StepBase::new("log-and-send-notifications"),
            client,
        }
    }

    fn api_failure(&self, output: String) -> StepResult {
        StepResult::failure(self.name(), vec![output])
            .with_explanation("because there was a problem communicating with the notification API")
    }
}

impl Step for NotifyStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn run(&mut self, _context: &ScriptContext) -> Result<StepResult> {
        let result = match self.client.check_project() {
            Ok(response) if response.is_success() => StepResult::success(self.name(), Vec::new())
                .with_status_message("is ready to run at the end of this script"),
            Ok(response) => self.api_failure(response.diagnostic()),
            Err(err) => self.api_failure(err.describe()),
        };

        Ok(result)
    }

    fn post_run(&mut self, _context: &ScriptContext, report: &ScriptReport) -> Result<()> {
        log_status!("notify", "Logging and sending notifications...");

        match self.client.post_results(report) {
            Ok(response) if response.is_success() => {
                log_status!("notify", "Successfully logged results and sent notifications.");
            }
            Ok(response) => {
                log_status!("notify", "There was an error sending the results: {}", response.diagnostic());
            }
            Err(err) => {
                log_status!("notify", "There was an error sending the results: {}", err.describe());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::api::ApiResponse;
    use crate::error::Error;
    use crate::result::Status;
    use crate::testing::RecordingRunner;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeClient {
        check: Result<ApiResponse>,
        posted: Rc<RefCell<Vec<String>>>,
    }

    impl NotificationClient for FakeClient {
        fn check_project(&self) -> Result<ApiResponse> {
            self.check.clone()
        }

        fn post_results(&self, report: &ScriptReport) -> Result<ApiResponse> {
            self.posted.borrow_mut().push(report.script.clone());
            self.check.clone()
        }
    }

    fn response(status: u16, content_type: &str, reason: &str, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            content_type: Some(content_type.to_string()),
            reason: reason.to_string(),
            body: body.to_string(),
        }
    }

    fn step(check: Result<ApiResponse>) -> (NotifyStep, Rc<RefCell<Vec<String>>>) {
        let posted = Rc::new(RefCell::new(Vec::new()));
        let client = FakeClient {
            check,
            posted: Rc::clone(&posted),
        };
        (NotifyStep::new(Box::new(client)), posted)
    }

    #[test]
    fn ok_response_is_ready_message() {
        let fixture = Fixture::new(RecordingRunner::new(), None);
        let (mut step, _) = step(Ok(response(200, "application/json", "OK", "{}")));

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_success());
        assert_eq!(
            result.headline(),
            "log-and-send-notifications is ready to run at the end of this script"
        );
    }

    #[test]
    fn json_error_is_rendered_uniformly() {
        let fixture = Fixture::new(RecordingRunner::new(), None);
        let (mut step, _) = step(Ok(response(
            401,
            "application/json",
            "Unauthorized",
            r#"{"message":"Unknown project","code":"not_found"}"#,
        )));

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_failure());
        assert_eq!(result.output(), &["Unknown project (not_found)".to_string()]);
        assert_eq!(
            result.explanation(),
            Some("because there was a problem communicating with the notification API")
        );
    }

    #[test]
    fn transport_error_is_a_failure_not_an_error() {
        let fixture = Fixture::new(RecordingRunner::new(), None);
        let (mut step, _) = step(Err(Error::api_request_failed("connection refused")));

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_failure());
        assert_eq!(
            result.output(),
            &["Notification API request failed: connection refused".to_string()]
        );
    }

    #[test]
    fn post_run_posts_report() {
        let fixture = Fixture::new(RecordingRunner::new(), None);
        let (mut step, posted) = step(Ok(response(200, "application/json", "OK", "{}")));
        let report = ScriptReport {
            script: "deploy".to_string(),
            environment: None,
            status: Status::Success,
            results: Vec::new(),
            skipped: Vec::new(),
        };

        step.post_run(&fixture.context(), &report).unwrap();

        assert_eq!(posted.borrow().as_slice(), &["deploy".to_string()]);
    }
}
