use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::result::ServiceResult;
use crate::command::{CommandQueue, EnqueueError, sanitize};

/// Format a `PROCESS_SERVICE_CHECK_RESULT` external command
///
/// Host, service and output are sanitized; `time` is used as given.
pub fn format_command(time: i64, hostname: &str, service_name: &str, status: u32, body: &str) -> String {
    format!(
        "[{}] PROCESS_SERVICE_CHECK_RESULT;{};{};{};{}",
        time,
        sanitize(hostname),
        sanitize(service_name),
        status,
        sanitize(body)
    )
}

/// Turns passive check results into external commands
#[derive(Clone)]
pub struct SubmissionService {
    queue: Arc<dyn CommandQueue>,
}

impl SubmissionService {
    pub fn new(queue: Arc<dyn CommandQueue>) -> Self {
        Self { queue }
    }

    /// Queue a check result for Nagios
    ///
    /// A result without a time is stamped with the current time. Success
    /// means the command was queued, not that Nagios has read it.
    pub async fn submit(&self, result: &ServiceResult) -> Result<(), EnqueueError> {
        let time = if result.time == 0 {
            unix_now()
        } else {
            result.time
        };

        let command = format_command(
            time,
            &result.hostname,
            &result.service_name,
            result.status,
            &result.body,
        );
        debug!(
            host = %result.hostname,
            service = %result.service_name,
            status = result.status,
            "Submitting passive check result"
        );
        self.queue.enqueue(command).await
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nagapi_testkit::random::PseudoGenerator;
    use parking_lot::Mutex;

    /// Queue recording commands instead of writing them
    #[derive(Default)]
    struct RecordingQueue {
        commands: Mutex<Vec<String>>,
        reject: Option<EnqueueError>,
    }

    #[async_trait]
    impl CommandQueue for RecordingQueue {
        async fn enqueue(&self, command: String) -> Result<(), EnqueueError> {
            if let Some(err) = self.reject {
                return Err(err);
            }
            self.commands.lock().push(command);
            Ok(())
        }
    }

    #[test]
    fn test_format_command() {
        assert_eq!(
            format_command(1_700_000_000, "web-1", "HTTP", 2, "CRITICAL - timeout"),
            "[1700000000] PROCESS_SERVICE_CHECK_RESULT;web-1;HTTP;2;CRITICAL - timeout"
        );
    }

    #[test]
    fn test_format_command_sanitizes() {
        assert_eq!(
            format_command(1, "h;x", "s\ny", 0, "a;b\nc"),
            "[1] PROCESS_SERVICE_CHECK_RESULT;h:x;s\\ny;0;a:b\\nc"
        );
    }

    #[test]
    fn test_random_fields_stay_in_place() {
        let mut rng = PseudoGenerator::new(99);
        for _ in 0..100 {
            let host = rng.random_text(12);
            let service = rng.random_text(12);
            let body = rng.random_text(80);
            let command = format_command(42, &host, &service, 1, &body);

            assert!(!command.contains('\n'));
            assert_eq!(command.matches(';').count(), 4);
            assert!(command.starts_with("[42] PROCESS_SERVICE_CHECK_RESULT;"));
        }
    }

    #[tokio::test]
    async fn test_submit_uses_given_time() {
        let queue = Arc::new(RecordingQueue::default());
        let service = SubmissionService::new(queue.clone());

        let result = ServiceResult {
            time: 1234,
            hostname: "web-1".to_string(),
            service_name: "HTTP".to_string(),
            status: 1,
            body: "WARNING - slow".to_string(),
        };
        service.submit(&result).await.unwrap();

        assert_eq!(
            *queue.commands.lock(),
            vec!["[1234] PROCESS_SERVICE_CHECK_RESULT;web-1;HTTP;1;WARNING - slow"]
        );
    }

    #[tokio::test]
    async fn test_submit_defaults_time_to_now() {
        let queue = Arc::new(RecordingQueue::default());
        let service = SubmissionService::new(queue.clone());

        let before = unix_now();
        service
            .submit(&ServiceResult {
                hostname: "h".to_string(),
                service_name: "s".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let after = unix_now();

        let command = queue.commands.lock()[0].clone();
        let time: i64 = command[1..command.find(']').unwrap()].parse().unwrap();
        assert!(time >= before && time <= after);
        assert!(command.ends_with("] PROCESS_SERVICE_CHECK_RESULT;h;s;0;"));
    }

    #[tokio::test]
    async fn test_submit_propagates_queue_errors() {
        let queue = Arc::new(RecordingQueue {
            reject: Some(EnqueueError::QueueFull),
            ..Default::default()
        });
        let service = SubmissionService::new(queue);

        assert_eq!(
            service.submit(&ServiceResult::default()).await,
            Err(EnqueueError::QueueFull)
        );
    }
}
