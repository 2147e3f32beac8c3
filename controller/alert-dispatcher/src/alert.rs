//! Alertmanager webhook payload
//!
//! Every field decodes leniently: anything the sender leaves out falls back to
//! its empty value, so a batch carrying only `status` and a few labels is
//! still routable. An explicit `null` counts as left out. Only malformed JSON
//! or wrongly typed fields are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Label selecting the infrastructure action for an alert
pub const ACTION_LABEL: &str = "action";
/// Label naming the managed host a container action targets
pub const INSTANCE_LABEL: &str = "instance";
pub const SEVERITY_LABEL: &str = "severity";

/// Lifecycle state of an alert or of a whole notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertStatus {
    Firing,
    Resolved,
    /// Any value Alertmanager may add later, kept verbatim
    Other(String),
}

impl AlertStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AlertStatus::Firing => "firing",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Other(raw) => raw,
        }
    }
}

impl Default for AlertStatus {
    fn default() -> Self {
        AlertStatus::Other(String::new())
    }
}

impl From<String> for AlertStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "firing" => AlertStatus::Firing,
            "resolved" => AlertStatus::Resolved,
            _ => AlertStatus::Other(raw),
        }
    }
}

impl From<AlertStatus> for String {
    fn from(status: AlertStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infrastructure action requested through the `action` label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ContainerUp,
    ContainerDown,
    WorkerUp,
    WorkerDown,
}

impl Action {
    /// Parse an `action` label value; unknown values yield `None`
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "container-up" => Some(Action::ContainerUp),
            "container-down" => Some(Action::ContainerDown),
            "worker-up" => Some(Action::WorkerUp),
            "worker-down" => Some(Action::WorkerDown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ContainerUp => "container-up",
            Action::ContainerDown => "container-down",
            Action::WorkerUp => "worker-up",
            Action::WorkerDown => "worker-down",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode `null` as the type's empty value
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single alert inside a notification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Alert {
    #[serde(deserialize_with = "null_default")]
    pub status: AlertStatus,
    #[serde(deserialize_with = "null_default")]
    pub labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_default")]
    pub annotations: HashMap<String, String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL", deserialize_with = "null_default")]
    pub generator_url: String,
    #[serde(deserialize_with = "null_default")]
    pub fingerprint: String,
}

impl Alert {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Requested action, if the `action` label names a known one
    pub fn action(&self) -> Option<Action> {
        self.label(ACTION_LABEL).and_then(Action::from_label)
    }

    /// Target host of a container action; empty when the label is absent
    pub fn instance(&self) -> &str {
        self.label(INSTANCE_LABEL).unwrap_or_default()
    }

    pub fn severity(&self) -> &str {
        self.label(SEVERITY_LABEL).unwrap_or_default()
    }
}

/// One webhook notification: a group of alerts plus their shared metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationBatch {
    #[serde(deserialize_with = "null_default")]
    pub version: String,
    #[serde(deserialize_with = "null_default")]
    pub group_key: String,
    #[serde(deserialize_with = "null_default")]
    pub truncated_alerts: u64,
    #[serde(deserialize_with = "null_default")]
    pub status: AlertStatus,
    #[serde(deserialize_with = "null_default")]
    pub receiver: String,
    #[serde(deserialize_with = "null_default")]
    pub group_labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_default")]
    pub common_labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_default")]
    pub common_annotations: HashMap<String, String>,
    #[serde(
        rename = "externalURL",
        alias = "externalUrl",
        deserialize_with = "null_default"
    )]
    pub external_url: String,
    #[serde(deserialize_with = "null_default")]
    pub alerts: Vec<Alert>,
}

impl NotificationBatch {
    /// Decode a webhook request body
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn is_firing(&self) -> bool {
        self.status == AlertStatus::Firing
    }
}
