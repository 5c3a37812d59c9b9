//! One-shot device location acquisition for an events screen mount.
//!
//! [`LocationProvider`] is a step machine: each method consumes the result
//! of the previous capability request and returns the next [`LocationStep`]
//! for the caller to dispatch. It never retries and never tracks.

use thiserror::Error;

use crate::capabilities::{
    GeolocationError, GeolocationResult, PermissionKind, PermissionStatus, PositionOptions,
    Rationale,
};
use crate::config::{AppConfig, Platform};
use crate::error::{AppError, ErrorKind};
use crate::model::{CoordinateError, Coordinates, LocationPermission};
use crate::{LOCATION_RATIONALE_MESSAGE, LOCATION_RATIONALE_TITLE};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("location request timed out")]
    Timeout,

    #[error("invalid position reported: {0}")]
    InvalidPosition(#[from] CoordinateError),
}

impl From<GeolocationError> for LocationError {
    fn from(e: GeolocationError) -> Self {
        match e {
            GeolocationError::PermissionDenied => Self::PermissionDenied,
            GeolocationError::PositionUnavailable { message } => Self::Unavailable(message),
            GeolocationError::Timeout => Self::Timeout,
        }
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        let kind = match e {
            LocationError::PermissionDenied => ErrorKind::LocationPermissionDenied,
            LocationError::Timeout => ErrorKind::Timeout,
            LocationError::Unavailable(_) | LocationError::InvalidPosition(_) => {
                ErrorKind::Location
            }
        };
        AppError::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Located(Coordinates),
    /// Android permission refused; no position read was attempted.
    PermissionDenied,
    Unavailable(LocationError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationStep {
    CheckPermission(PermissionKind),
    RequestPermission(PermissionKind, Rationale),
    ReadPosition(PositionOptions),
    Finished(LocationOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationPhase {
    Idle,
    CheckingPermission,
    RequestingPermission,
    ReadingPosition,
    Resolved(LocationOutcome),
}

#[derive(Debug, Clone)]
pub struct LocationProvider {
    platform: Platform,
    permission: LocationPermission,
    options: PositionOptions,
    phase: LocationPhase,
}

impl LocationProvider {
    #[must_use]
    pub fn new(platform: Platform, permission: LocationPermission, config: &AppConfig) -> Self {
        Self {
            platform,
            permission,
            options: PositionOptions {
                enable_high_accuracy: true,
                timeout_ms: config.location_timeout_ms,
                maximum_age_ms: config.location_maximum_age_ms,
            },
            phase: LocationPhase::Idle,
        }
    }

    /// Permission as known after this provider's prompts; the app keeps it
    /// for the rest of the session.
    #[must_use]
    pub const fn permission(&self) -> LocationPermission {
        self.permission
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.phase, LocationPhase::Resolved(_))
    }

    /// First step of the flow. `None` if already started for this mount.
    pub fn start(&mut self) -> Option<LocationStep> {
        if self.phase != LocationPhase::Idle {
            return None;
        }

        if !self.platform.requires_location_permission() {
            return Some(self.read_position());
        }

        let step = match self.permission {
            LocationPermission::Granted => self.read_position(),
            LocationPermission::Denied => self.finish(LocationOutcome::PermissionDenied),
            LocationPermission::Unknown => {
                self.phase = LocationPhase::CheckingPermission;
                LocationStep::CheckPermission(PermissionKind::AccessFineLocation)
            }
        };
        Some(step)
    }

    pub fn on_permission_checked(&mut self, status: PermissionStatus) -> Option<LocationStep> {
        if self.phase != LocationPhase::CheckingPermission {
            return None;
        }

        if status.is_granted() {
            self.permission = LocationPermission::Granted;
            return Some(self.read_position());
        }

        self.phase = LocationPhase::RequestingPermission;
        Some(LocationStep::RequestPermission(
            PermissionKind::AccessFineLocation,
            Rationale {
                title: LOCATION_RATIONALE_TITLE.into(),
                message: LOCATION_RATIONALE_MESSAGE.into(),
            },
        ))
    }

    pub fn on_permission_requested(&mut self, status: PermissionStatus) -> Option<LocationStep> {
        if self.phase != LocationPhase::RequestingPermission {
            return None;
        }

        if status.is_granted() {
            self.permission = LocationPermission::Granted;
            Some(self.read_position())
        } else {
            self.permission = LocationPermission::Denied;
            tracing::info!("location permission denied; using fallback coordinates");
            Some(self.finish(LocationOutcome::PermissionDenied))
        }
    }

    pub fn on_position(&mut self, result: GeolocationResult) -> Option<LocationStep> {
        if self.phase != LocationPhase::ReadingPosition {
            return None;
        }

        let outcome = match result {
            Ok(position) => match Coordinates::new(position.longitude, position.latitude) {
                Ok(coordinates) => LocationOutcome::Located(coordinates),
                Err(e) => LocationOutcome::Unavailable(e.into()),
            },
            Err(GeolocationError::PermissionDenied) => {
                self.permission = LocationPermission::Denied;
                LocationOutcome::PermissionDenied
            }
            Err(e) => LocationOutcome::Unavailable(e.into()),
        };
        if let LocationOutcome::Unavailable(error) = &outcome {
            tracing::warn!(error = %error, "device position unavailable");
        }
        Some(self.finish(outcome))
    }

    fn read_position(&mut self) -> LocationStep {
        self.phase = LocationPhase::ReadingPosition;
        LocationStep::ReadPosition(self.options)
    }

    fn finish(&mut self, outcome: LocationOutcome) -> LocationStep {
        self.phase = LocationPhase::Resolved(outcome.clone());
        LocationStep::Finished(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Position;
    use assert_matches::assert_matches;

    fn provider(platform: Platform, permission: LocationPermission) -> LocationProvider {
        LocationProvider::new(platform, permission, &AppConfig::default())
    }

    fn position(longitude: f64, latitude: f64) -> GeolocationResult {
        Ok(Position {
            longitude,
            latitude,
            accuracy_m: Some(5.0),
            timestamp_ms: None,
        })
    }

    #[test]
    fn ios_reads_position_directly_with_high_accuracy() {
        let mut p = provider(Platform::Ios, LocationPermission::Unknown);
        let step = p.start().unwrap();
        assert_matches!(
            step,
            LocationStep::ReadPosition(PositionOptions {
                enable_high_accuracy: true,
                timeout_ms: 20_000,
                ..
            })
        );
    }

    #[test]
    fn android_checks_then_requests_with_rationale() {
        let mut p = provider(Platform::Android, LocationPermission::Unknown);
        assert_eq!(
            p.start(),
            Some(LocationStep::CheckPermission(PermissionKind::AccessFineLocation))
        );
        let step = p.on_permission_checked(PermissionStatus::Denied).unwrap();
        let LocationStep::RequestPermission(_, rationale) = step else {
            panic!("expected a permission request, got {step:?}");
        };
        assert_eq!(rationale.title, "Location Permission");
        assert_eq!(
            rationale.message,
            "We need to know your location to provide events near you."
        );
    }

    #[test]
    fn android_denied_resolves_without_position() {
        let mut p = provider(Platform::Android, LocationPermission::Unknown);
        p.start();
        p.on_permission_checked(PermissionStatus::Denied);
        let step = p.on_permission_requested(PermissionStatus::Denied);
        assert_eq!(step, Some(LocationStep::Finished(LocationOutcome::PermissionDenied)));
        assert_eq!(p.permission(), LocationPermission::Denied);
        assert!(p.on_position(position(1.0, 1.0)).is_none());
    }

    #[test]
    fn known_denial_skips_prompts() {
        let mut p = provider(Platform::Android, LocationPermission::Denied);
        assert_eq!(
            p.start(),
            Some(LocationStep::Finished(LocationOutcome::PermissionDenied))
        );
    }

    #[test]
    fn granted_permission_reads_exactly_once() {
        let mut p = provider(Platform::Android, LocationPermission::Unknown);
        p.start();
        assert_matches!(
            p.on_permission_checked(PermissionStatus::Granted),
            Some(LocationStep::ReadPosition(_))
        );
        let done = p.on_position(position(-46.63, -23.55)).unwrap();
        let expected = Coordinates::new(-46.63, -23.55).unwrap();
        assert_eq!(done, LocationStep::Finished(LocationOutcome::Located(expected)));
        assert!(p.start().is_none());
        assert!(p.on_position(position(0.0, 0.0)).is_none());
    }

    #[test]
    fn timeout_resolves_to_unavailable() {
        let mut p = provider(Platform::Ios, LocationPermission::Unknown);
        p.start();
        let step = p.on_position(Err(GeolocationError::Timeout)).unwrap();
        assert_eq!(
            step,
            LocationStep::Finished(LocationOutcome::Unavailable(LocationError::Timeout))
        );
    }

    #[test]
    fn nonsense_position_is_rejected() {
        let mut p = provider(Platform::Ios, LocationPermission::Unknown);
        p.start();
        let step = p.on_position(position(0.0, 123.0)).unwrap();
        assert_matches!(
            step,
            LocationStep::Finished(LocationOutcome::Unavailable(LocationError::InvalidPosition(_)))
        );
    }

    #[test]
    fn errors_map_to_app_error_kinds() {
        let e: AppError = LocationError::PermissionDenied.into();
        assert_eq!(e.kind, ErrorKind::LocationPermissionDenied);
        let e: AppError = LocationError::Timeout.into();
        assert!(e.is_retryable());
    }
}
