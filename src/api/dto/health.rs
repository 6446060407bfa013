//! DTOs for health check endpoint.

use serde::Serialize;

use crate::domain::StorageType;

/// Health check response with component status.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

/// Health status for each system component.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub storage: CheckStatus,
}

/// Individual component health status.
#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub status: String,

    /// Backend variant; only set for the storage check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<StorageType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
