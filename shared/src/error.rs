use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::UNEXPECTED_ERROR_MESSAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Validation,
    NotFound,
    Rejected,
    Deserialization,
    Location,
    LocationPermissionDenied,
    Geocoding,
    Storage,
    Configuration,
    InvalidState,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Rejected => "REJECTED",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::Geocoding => "GEOCODING_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Location | Self::Storage | Self::Geocoding => {
                ErrorSeverity::Transient
            }

            Self::Validation
            | Self::NotFound
            | Self::Rejected
            | Self::Deserialization
            | Self::LocationPermissionDenied
            | Self::Configuration
            | Self::InvalidState
            | Self::Internal => ErrorSeverity::Permanent,
        }
    }

    /// Whether the user should be offered a manual retry (pull-to-refresh,
    /// pressing the button again). The core never retries on its own.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::Location | Self::Storage | Self::Geocoding
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: BTreeMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Text shown in the notice modal. Server-provided rejections and
    /// validation messages are shown verbatim.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => "Check your internet connection and try again".into(),
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Validation | ErrorKind::Rejected => self.message.clone(),
            ErrorKind::NotFound => "The requested event could not be found.".into(),
            ErrorKind::Deserialization | ErrorKind::Internal | ErrorKind::InvalidState => {
                UNEXPECTED_ERROR_MESSAGE.into()
            }
            ErrorKind::Location => {
                "Unable to determine your location. Showing events without it.".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Location access was denied. Showing events without your location.".into()
            }
            ErrorKind::Geocoding => {
                "We could not find that address. Check the postal code and try again.".into()
            }
            ErrorKind::Storage => "Unable to save your session on this device.".into(),
            ErrorKind::Configuration => "The app is misconfigured. Please reinstall.".into(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;
