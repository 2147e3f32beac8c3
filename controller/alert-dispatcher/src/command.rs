//! Remote command execution
//!
//! A shell script is submitted to the remote execution service for one managed
//! host, then polled until the service reports a terminal status. The wait is
//! bounded by a deadline and interrupted by the process shutdown signal.

use crate::service::{self, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, warn};

const SERVICE: &str = "command service";

/// Status of a command invocation
///
/// `Error`, `TimedOut` and `Cancelled` are produced locally by the executor and
/// are never decoded from the remote service; remote values other than the four
/// known ones land in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Other(String),
    Error,
    TimedOut,
    Cancelled,
}

impl CommandStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CommandStatus::Pending => "Pending",
            CommandStatus::InProgress => "InProgress",
            CommandStatus::Success => "Success",
            CommandStatus::Failed => "Failed",
            CommandStatus::Other(raw) => raw,
            CommandStatus::Error => "Error",
            CommandStatus::TimedOut => "TimedOut",
            CommandStatus::Cancelled => "Cancelled",
        }
    }

    /// Anything but `Pending` and `InProgress` stops polling
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommandStatus::Pending | CommandStatus::InProgress)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandStatus::Success)
    }
}

impl From<String> for CommandStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Pending" => CommandStatus::Pending,
            "InProgress" => CommandStatus::InProgress,
            "Success" => CommandStatus::Success,
            "Failed" => CommandStatus::Failed,
            _ => CommandStatus::Other(raw),
        }
    }
}

impl From<CommandStatus> for String {
    fn from(status: CommandStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote view of an invocation, as returned by submit and query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInvocation {
    #[serde(default)]
    pub command_id: String,
    pub status: CommandStatus,
    #[serde(default)]
    pub output: String,
}

/// Remote execution service
#[async_trait]
pub trait CommandService: Send + Sync {
    /// Submit `script` for execution on `instance_id`
    async fn submit(&self, script: &str, instance_id: &str)
        -> Result<CommandInvocation, ServiceError>;

    /// Current status and accumulated output of a submitted command
    async fn query(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation, ServiceError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    script: &'a str,
    instance_id: &'a str,
}

/// HTTP client for the remote execution service
///
/// - `POST {base}/commands` with `{"script", "instanceId"}`
/// - `GET {base}/commands/{commandId}/invocations/{instanceId}`
pub struct HttpCommandService {
    base_url: String,
    client: Client,
}

impl HttpCommandService {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl CommandService for HttpCommandService {
    async fn submit(
        &self,
        script: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation, ServiceError> {
        let url = service::endpoint(SERVICE, &self.base_url, &["commands"])?;
        let response = self
            .client
            .post(url)
            .json(&SubmitRequest {
                script,
                instance_id,
            })
            .send()
            .await
            .map_err(|e| service::request_failed(SERVICE, e))?;

        service::read_json(SERVICE, response).await
    }

    async fn query(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation, ServiceError> {
        let url = service::endpoint(
            SERVICE,
            &self.base_url,
            &["commands", command_id, "invocations", instance_id],
        )?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| service::request_failed(SERVICE, e))?;

        service::read_json(SERVICE, response).await
    }
}

/// One command run, tracked from submission to its terminal status
#[derive(Debug, Clone)]
pub struct CommandExecution {
    /// Assigned by the remote service; `None` when submission failed
    pub command_id: Option<String>,
    pub instance_id: String,
    pub script: String,
    pub status: CommandStatus,
    pub output: String,
}

/// Submits commands and waits for their outcome
pub struct RemoteCommandExecutor {
    service: Arc<dyn CommandService>,
    poll_interval: Duration,
    timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl RemoteCommandExecutor {
    pub fn new(
        service: Arc<dyn CommandService>,
        poll_interval: Duration,
        timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service,
            poll_interval,
            timeout,
            shutdown,
        }
    }

    /// Run `script` on `instance_id` and return its terminal status
    pub async fn run(&self, script: &str, instance_id: &str) -> CommandStatus {
        self.execute(script, instance_id).await.status
    }

    /// Like [`run`](Self::run), keeping the command id and collected output
    pub async fn execute(&self, script: &str, instance_id: &str) -> CommandExecution {
        debug!(instance_id = %instance_id, script = %script, "Sending command");

        let mut execution = CommandExecution {
            command_id: None,
            instance_id: instance_id.to_string(),
            script: script.to_string(),
            status: CommandStatus::Pending,
            output: String::new(),
        };

        let submitted = match self.service.submit(script, instance_id).await {
            Ok(invocation) => invocation,
            Err(e) => {
                error!(instance_id = %instance_id, error = %e, "Error sending command");
                execution.status = CommandStatus::Error;
                return execution;
            }
        };

        // A timeout too large to represent means no deadline
        let deadline = Instant::now().checked_add(self.timeout);
        let mut shutdown = self.shutdown.clone();
        execution.command_id = Some(submitted.command_id.clone());
        execution.status = submitted.status;

        while !execution.status.is_terminal() {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.poll_interval,
            };
            if remaining.is_zero() {
                warn!(
                    command_id = %submitted.command_id,
                    instance_id = %instance_id,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Gave up waiting for command"
                );
                execution.status = CommandStatus::TimedOut;
                break;
            }

            if pause(&mut shutdown, self.poll_interval.min(remaining)).await {
                warn!(
                    command_id = %submitted.command_id,
                    instance_id = %instance_id,
                    "Command wait cancelled by shutdown"
                );
                execution.status = CommandStatus::Cancelled;
                break;
            }

            match self.service.query(&submitted.command_id, instance_id).await {
                Ok(invocation) => {
                    debug!(
                        command_id = %submitted.command_id,
                        output = %invocation.output,
                        "Command output"
                    );
                    execution.status = invocation.status;
                    execution.output = invocation.output;
                }
                Err(e) => {
                    error!(
                        command_id = %submitted.command_id,
                        instance_id = %instance_id,
                        error = %e,
                        "Error querying command"
                    );
                    execution.status = CommandStatus::Error;
                    break;
                }
            }
        }

        debug!(
            command_id = %submitted.command_id,
            status = %execution.status,
            "Command finished"
        );
        execution
    }
}

/// Sleep for `wait`; returns true if shutdown was signalled first
async fn pause(shutdown: &mut watch::Receiver<bool>, wait: Duration) -> bool {
    let sleep = tokio::time::sleep(wait);
    tokio::pin!(sleep);

    let cancelled = tokio::select! {
        _ = &mut sleep => return false,
        signalled = shutdown.wait_for(|stop| *stop) => signalled.is_ok(),
    };

    // Sender gone: nobody can cancel any more
    if !cancelled {
        sleep.await;
    }
    cancelled
}
