//! Elastic worker pool sizing
//!
//! The controller reads the pool's bounds fresh from the pool service on every
//! adjustment, clamps the new desired size into `[min_size, max_size]` and
//! writes it back. Nothing is cached between adjustments.

use crate::service::{self, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const SERVICE: &str = "pool service";

/// Size and bounds of one elastic pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityGroup {
    pub name: String,
    pub min_size: i64,
    pub max_size: i64,
    pub desired_capacity: i64,
    pub current_capacity: i64,
}

/// Result of a successful adjustment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub group: String,
    pub previous: i64,
    pub desired: i64,
}

#[derive(Error, Debug)]
pub enum CapacityError {
    #[error("pool service returned no capacity groups")]
    NoGroups,

    #[error("capacity group '{name}' not found")]
    GroupNotFound { name: String },

    #[error("failed to describe capacity groups: {0}")]
    Describe(#[source] ServiceError),

    #[error("failed to set desired capacity of '{group}': {source}")]
    SetCapacity {
        group: String,
        #[source]
        source: ServiceError,
    },
}

/// Remote pool-management service
#[async_trait]
pub trait PoolService: Send + Sync {
    async fn describe_groups(&self) -> Result<Vec<CapacityGroup>, ServiceError>;

    async fn set_desired_capacity(&self, group: &str, desired: i64) -> Result<(), ServiceError>;
}

#[derive(Debug, Deserialize)]
struct DescribeGroupsResponse {
    #[serde(default)]
    groups: Vec<CapacityGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetCapacityRequest {
    desired_capacity: i64,
}

/// HTTP client for the pool-management service
///
/// - `GET {base}/groups` returning `{"groups": [...]}`
/// - `PUT {base}/groups/{name}/desired-capacity` with `{"desiredCapacity": n}`
pub struct HttpPoolService {
    base_url: String,
    client: Client,
}

impl HttpPoolService {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl PoolService for HttpPoolService {
    async fn describe_groups(&self) -> Result<Vec<CapacityGroup>, ServiceError> {
        let url = service::endpoint(SERVICE, &self.base_url, &["groups"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| service::request_failed(SERVICE, e))?;

        let described: DescribeGroupsResponse = service::read_json(SERVICE, response).await?;
        Ok(described.groups)
    }

    async fn set_desired_capacity(&self, group: &str, desired: i64) -> Result<(), ServiceError> {
        let url = service::endpoint(
            SERVICE,
            &self.base_url,
            &["groups", group, "desired-capacity"],
        )?;
        let response = self
            .client
            .put(url)
            .json(&SetCapacityRequest {
                desired_capacity: desired,
            })
            .send()
            .await
            .map_err(|e| service::request_failed(SERVICE, e))?;

        service::check_status(SERVICE, response).await?;
        Ok(())
    }
}

/// New desired size after applying `delta` to `current`
///
/// Growth is capped at `max_size` and shrinkage floored at `min_size`, so the
/// result never leaves the bounds when `current` starts inside them.
pub fn clamp_desired(current: i64, min_size: i64, max_size: i64, delta: i64) -> i64 {
    let target = current.saturating_add(delta);
    if delta >= 0 {
        target.min(max_size)
    } else {
        target.max(min_size)
    }
}

/// Adjusts the desired size of the managed pool
pub struct CapacityController {
    service: Arc<dyn PoolService>,
    pool_name: Option<String>,
}

impl CapacityController {
    /// `pool_name` selects the group to manage; `None` takes the first group
    /// the pool service returns.
    pub fn new(service: Arc<dyn PoolService>, pool_name: Option<String>) -> Self {
        Self { service, pool_name }
    }

    pub async fn adjust(&self, delta: i64) -> Result<Adjustment, CapacityError> {
        let groups = self
            .service
            .describe_groups()
            .await
            .map_err(CapacityError::Describe)?;
        let group = self.select(groups)?;

        info!(
            group = %group.name,
            min_size = group.min_size,
            max_size = group.max_size,
            desired_capacity = group.desired_capacity,
            current_capacity = group.current_capacity,
            "Read capacity group"
        );

        // Steps apply to the pending target, never to the running count
        let desired = clamp_desired(group.desired_capacity, group.min_size, group.max_size, delta);
        self.service
            .set_desired_capacity(&group.name, desired)
            .await
            .map_err(|source| CapacityError::SetCapacity {
                group: group.name.clone(),
                source,
            })?;

        info!(group = %group.name, delta, desired, "Set desired capacity");
        Ok(Adjustment {
            group: group.name,
            previous: group.desired_capacity,
            desired,
        })
    }

    fn select(&self, groups: Vec<CapacityGroup>) -> Result<CapacityGroup, CapacityError> {
        match &self.pool_name {
            Some(name) => groups
                .into_iter()
                .find(|group| &group.name == name)
                .ok_or_else(|| CapacityError::GroupNotFound { name: name.clone() }),
            None => groups.into_iter().next().ok_or(CapacityError::NoGroups),
        }
    }
}
