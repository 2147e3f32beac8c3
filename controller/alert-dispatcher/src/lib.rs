//! Alert Dispatcher - turns Alertmanager webhooks into infrastructure actions
//!
//! Firing alerts carry an `action` label that selects either a shell command
//! run on the alerting host through a remote execution service, or a one-step
//! resize of an elastic worker pool through a pool-management service. Both
//! services sit behind traits so the dispatcher can run against fakes.

pub mod alert;
pub mod capacity;
pub mod command;
pub mod config;
pub mod metrics;
pub mod router;
pub mod server;
pub mod service;

pub use alert::{Action, Alert, AlertStatus, NotificationBatch};
pub use capacity::{CapacityController, CapacityGroup, HttpPoolService, PoolService};
pub use command::{CommandService, CommandStatus, HttpCommandService, RemoteCommandExecutor};
pub use config::Config;
pub use metrics::Metrics;
pub use router::{AlertRouter, RouteReport, ScaleScripts};
pub use server::{create_app, AppState};
pub use service::ServiceError;
