// ABOUTME: Unified error handling for the Stride sync service
// ABOUTME: Defines standard error codes, the AppError type, and conversion helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Unified Error Handling System
//!
//! Centralized error handling for the sync service. Every fallible operation
//! returns [`AppResult`] so callers can distinguish storage corruption from
//! missing data, and backend outages from empty remote tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat = 3002,

    // Resource Management (4000-4999)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    #[serde(rename = "MIGRATION_IN_PROGRESS")]
    MigrationInProgress = 4002,

    // External Services (5000-5999)
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,
    #[serde(rename = "EXTERNAL_AUTH_FAILED")]
    ExternalAuthFailed = 5002,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6001,

    // Internal Errors (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9002,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "The provided input is invalid",
            ErrorCode::InvalidFormat => "The data format is invalid",
            ErrorCode::ResourceNotFound => "The requested resource was not found",
            ErrorCode::MigrationInProgress => "A migration run is already in flight",
            ErrorCode::ExternalServiceError => "The remote backend encountered an error",
            ErrorCode::ExternalServiceUnavailable => "The remote backend is currently unavailable",
            ErrorCode::ExternalAuthFailed => "Authentication with the remote backend failed",
            ErrorCode::ConfigError => "Configuration error encountered",
            ErrorCode::ConfigMissing => "Required configuration is missing",
            ErrorCode::InternalError => "An internal error occurred",
            ErrorCode::StorageError => "Local storage operation failed",
            ErrorCode::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Whether a user-initiated retry of the same operation can succeed
    /// without any configuration change
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ExternalServiceError
                | ErrorCode::ExternalServiceUnavailable
                | ErrorCode::MigrationInProgress
        )
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Device identifier the failing operation was scoped to
    pub device_id: Option<String>,
    /// Entity type name if the failure was entity-scoped
    pub entity: Option<String>,
    /// Additional key-value context
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            device_id: None,
            entity: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a device ID to the error context
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.context.device_id = Some(device_id.into());
        self
    }

    /// Add an entity type name to the error context
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience functions for creating common errors
impl AppError {
    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// A migration run is already in flight
    pub fn migration_in_progress() -> Self {
        Self::new(
            ErrorCode::MigrationInProgress,
            "Another migration run is in progress for this device",
        )
    }

    /// Local storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Serialization/deserialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Remote backend error
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }
}

/// Conversion from anyhow::Error to `AppError`
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.source() {
            Some(source) => AppError::new(ErrorCode::InternalError, error.to_string())
                .with_details(serde_json::json!({
                    "source": source.to_string()
                })),
            None => AppError::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_description() {
        assert!(ErrorCode::StorageError
            .description()
            .contains("Local storage"));
        assert!(ErrorCode::MigrationInProgress
            .description()
            .contains("in flight"));
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ErrorCode::ExternalServiceUnavailable.is_retryable());
        assert!(ErrorCode::MigrationInProgress.is_retryable());
        assert!(!ErrorCode::SerializationError.is_retryable());
    }

    #[test]
    fn test_app_error_creation() {
        let error = AppError::storage("kv read failed")
            .with_device_id("device-1")
            .with_entity("workout_history");

        assert_eq!(error.code, ErrorCode::StorageError);
        assert_eq!(error.context.device_id.as_deref(), Some("device-1"));
        assert_eq!(error.context.entity.as_deref(), Some("workout_history"));
    }

    #[test]
    fn test_error_serialization() {
        let error = AppError::external_service("stride-backend", "503 from upstream");
        let json = serde_json::to_string(&error.code).unwrap();
        assert!(json.contains("EXTERNAL_SERVICE_ERROR"));
        assert!(error.to_string().contains("503 from upstream"));
    }
}
