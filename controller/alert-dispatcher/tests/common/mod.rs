//! In-memory collaborators that record every call

#![allow(dead_code)]

use alert_dispatcher::{
    capacity::CapacityGroup, command::CommandInvocation, AlertRouter, CapacityController,
    CommandService, CommandStatus, Metrics, PoolService, RemoteCommandExecutor, ScaleScripts,
    ServiceError,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const SCALE_UP: &str = "bash scale.sh up";
pub const SCALE_DOWN: &str = "bash scale.sh down";

/// Command service whose commands finish with a fixed status on first query
pub struct FakeCommandService {
    terminal: CommandStatus,
    fail_submit: bool,
    submissions: Mutex<Vec<(String, String)>>,
    queries: Mutex<usize>,
}

impl FakeCommandService {
    pub fn finishing_with(terminal: CommandStatus) -> Arc<Self> {
        Arc::new(Self {
            terminal,
            fail_submit: false,
            submissions: Mutex::new(Vec::new()),
            queries: Mutex::new(0),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::finishing_with(CommandStatus::Success)
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            terminal: CommandStatus::Success,
            fail_submit: true,
            submissions: Mutex::new(Vec::new()),
            queries: Mutex::new(0),
        })
    }

    /// `(script, instance_id)` of every submission attempt
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl CommandService for FakeCommandService {
    async fn submit(
        &self,
        script: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation, ServiceError> {
        let id = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push((script.to_string(), instance_id.to_string()));
            submissions.len()
        };

        if self.fail_submit {
            return Err(ServiceError::RequestFailed {
                service: "command service",
                message: "connection refused".to_string(),
            });
        }

        Ok(CommandInvocation {
            command_id: format!("cmd-{}", id),
            status: CommandStatus::Pending,
            output: String::new(),
        })
    }

    async fn query(
        &self,
        command_id: &str,
        _instance_id: &str,
    ) -> Result<CommandInvocation, ServiceError> {
        *self.queries.lock().unwrap() += 1;
        Ok(CommandInvocation {
            command_id: command_id.to_string(),
            status: self.terminal.clone(),
            output: "done\n".to_string(),
        })
    }
}

/// Pool service backed by a list of groups; records describe and set calls
pub struct FakePoolService {
    groups: Mutex<Vec<CapacityGroup>>,
    fail_describe: bool,
    describes: Mutex<usize>,
    sets: Mutex<Vec<(String, i64)>>,
}

impl FakePoolService {
    pub fn with_groups(groups: Vec<CapacityGroup>) -> Arc<Self> {
        Arc::new(Self {
            groups: Mutex::new(groups),
            fail_describe: false,
            describes: Mutex::new(0),
            sets: Mutex::new(Vec::new()),
        })
    }

    pub fn single(min_size: i64, max_size: i64, current: i64) -> Arc<Self> {
        Self::with_groups(vec![group("workers", min_size, max_size, current)])
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            groups: Mutex::new(Vec::new()),
            fail_describe: true,
            describes: Mutex::new(0),
            sets: Mutex::new(Vec::new()),
        })
    }

    pub fn describes(&self) -> usize {
        *self.describes.lock().unwrap()
    }

    pub fn sets(&self) -> Vec<(String, i64)> {
        self.sets.lock().unwrap().clone()
    }
}

#[async_trait]
impl PoolService for FakePoolService {
    async fn describe_groups(&self) -> Result<Vec<CapacityGroup>, ServiceError> {
        *self.describes.lock().unwrap() += 1;
        if self.fail_describe {
            return Err(ServiceError::ErrorStatus {
                service: "pool service",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn set_desired_capacity(&self, group: &str, desired: i64) -> Result<(), ServiceError> {
        self.sets.lock().unwrap().push((group.to_string(), desired));
        // Converge immediately so a second adjustment sees the new size
        for g in self.groups.lock().unwrap().iter_mut() {
            if g.name == group {
                g.desired_capacity = desired;
                g.current_capacity = desired;
            }
        }
        Ok(())
    }
}

pub fn group(name: &str, min_size: i64, max_size: i64, current: i64) -> CapacityGroup {
    CapacityGroup {
        name: name.to_string(),
        min_size,
        max_size,
        desired_capacity: current,
        current_capacity: current,
    }
}

/// Router wired to the given fakes with a fast poll interval
pub fn router(commands: Arc<FakeCommandService>, pools: Arc<FakePoolService>) -> AlertRouter {
    let (_tx, rx) = watch::channel(false);
    AlertRouter::new(
        RemoteCommandExecutor::new(
            commands,
            Duration::from_millis(5),
            Duration::from_secs(5),
            rx,
        ),
        CapacityController::new(pools, None),
        ScaleScripts {
            up: SCALE_UP.to_string(),
            down: SCALE_DOWN.to_string(),
        },
        Metrics,
    )
}
