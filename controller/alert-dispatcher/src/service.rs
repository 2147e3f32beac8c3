//! Shared plumbing for the HTTP clients of the remote services

use anyhow::{Context, Result};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to a remote collaborator
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} request failed: {message}")]
    RequestFailed {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned error status {status}: {body}")]
    ErrorStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid {service} response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("invalid {service} endpoint: {message}")]
    InvalidEndpoint {
        service: &'static str,
        message: String,
    },
}

/// Build the HTTP client shared by every remote service handle
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Join path segments onto a base URL, percent-encoding each segment
pub(crate) fn endpoint(
    service: &'static str,
    base_url: &str,
    segments: &[&str],
) -> Result<Url, ServiceError> {
    let mut url = Url::parse(base_url).map_err(|e| ServiceError::InvalidEndpoint {
        service,
        message: format!("{}: {}", base_url, e),
    })?;

    url.path_segments_mut()
        .map_err(|_| ServiceError::InvalidEndpoint {
            service,
            message: format!("{} cannot be a base URL", base_url),
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

pub(crate) fn request_failed(service: &'static str, err: reqwest::Error) -> ServiceError {
    ServiceError::RequestFailed {
        service,
        message: err.to_string(),
    }
}

/// Map a non-2xx response to `ErrorStatus`, passing successful ones through
pub(crate) async fn check_status(
    service: &'static str,
    response: Response,
) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read body>".to_string());
    Err(ServiceError::ErrorStatus {
        service,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, ServiceError> {
    let response = check_status(service, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::InvalidResponse {
            service,
            message: e.to_string(),
        })
}
