use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::{AppError, ErrorKind};
use crate::event_form::EventForm;
use crate::fetch::FetchCoordinator;
use crate::filters::FilterModals;
use crate::focus::FocusState;
use crate::graphql::PageCache;
use crate::location::LocationProvider;
use crate::navigation::{Navigate, Navigator};
use crate::notice::Notices;
use crate::session::{LoginForm, RegisterForm};
use crate::{DEFAULT_DATE_WINDOW_DAYS, DEFAULT_DISTANCE_KM, DEFAULT_PAGE_SIZE};

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(EventId);

// --- Coordinates: validated, NaN-safe ---

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// Longitude/latitude pair. `(0, 0)` is a legitimate position; whether a
/// fix has been obtained is tracked separately by [`FilterState::has_coordinates`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    longitude: f64,
    latitude: f64,
}

impl Coordinates {
    pub const ORIGIN: Self = Self {
        longitude: 0.0,
        latitude: 0.0,
    };

    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoordinateError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    #[must_use]
    pub const fn longitude(self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    /// Wire order used by the events query: `[longitude, latitude]`.
    #[must_use]
    pub const fn as_lng_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

// --- Filters ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub coordinates: Coordinates,
    pub has_coordinates: bool,
    pub distance_radius: u32,
    pub date_window_days: Option<u32>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            coordinates: Coordinates::ORIGIN,
            has_coordinates: false,
            distance_radius: DEFAULT_DISTANCE_KM,
            date_window_days: Some(DEFAULT_DATE_WINDOW_DAYS),
        }
    }
}

impl FilterState {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            distance_radius: config.default_distance_km,
            date_window_days: config.default_date_window_days,
            ..Self::default()
        }
    }

    /// Copy of `self` with every field present in `patch` replaced.
    #[must_use]
    pub fn merged(&self, patch: &FilterOverride) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }

    pub fn apply(&mut self, patch: &FilterOverride) {
        if let Some(search) = &patch.search {
            self.search.clone_from(search);
        }
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = coordinates;
            self.has_coordinates = true;
        }
        if let Some(distance) = patch.distance_radius {
            self.distance_radius = distance;
        }
        if let Some(days) = patch.date_window_days {
            self.date_window_days = days;
        }
    }
}

/// Partial filter update; absent fields leave the current value untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterOverride {
    pub search: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub distance_radius: Option<u32>,
    pub date_window_days: Option<Option<u32>>,
}

impl FilterOverride {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn distance(km: u32) -> Self {
        Self {
            distance_radius: Some(km),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn days(days: Option<u32>) -> Self {
        Self {
            date_window_days: Some(days),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layers `later` over `self`; fields present in `later` win.
    pub fn merge(&mut self, later: &FilterOverride) {
        if let Some(search) = &later.search {
            self.search = Some(search.clone());
        }
        if let Some(coordinates) = later.coordinates {
            self.coordinates = Some(coordinates);
        }
        if let Some(distance) = later.distance_radius {
            self.distance_radius = Some(distance);
        }
        if let Some(days) = later.date_window_days {
            self.date_window_days = Some(days);
        }
    }
}

// --- Pagination ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub cursor: Option<String>,
    pub page_size: u32,
    pub has_next_page: bool,
    pub is_fetching_more: bool,
    pub is_refreshing: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationState {
    #[must_use]
    pub const fn with_page_size(page_size: u32) -> Self {
        Self {
            cursor: None,
            page_size,
            has_next_page: false,
            is_fetching_more: false,
            is_refreshing: false,
        }
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.is_fetching_more || self.is_refreshing
    }
}

// --- Server-sourced list entries ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub title: String,
    pub address: String,
    pub date: String,
    pub attendees: Vec<Attendee>,
    pub is_owner: bool,
    pub is_attending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationPermission {
    #[default]
    Unknown,
    Granted,
    Denied,
}

// --- Screens ---

/// State owned by one mount of the events list screen.
#[derive(Debug)]
pub struct EventsScreen {
    pub mount_id: u64,
    pub coordinator: FetchCoordinator,
    pub location: LocationProvider,
    pub modals: FilterModals,
    pub search_visible: bool,
    pub search_text: String,
    /// Filter changes made before the location flow resolved; folded into
    /// the mount's first page.
    pub pending: FilterOverride,
}

impl EventsScreen {
    #[must_use]
    pub fn new(mount_id: u64, config: &AppConfig, permission: LocationPermission) -> Self {
        Self {
            mount_id,
            coordinator: FetchCoordinator::new(
                mount_id,
                FilterState::from_config(config),
                config.page_size,
            ),
            location: LocationProvider::new(config.platform, permission, config),
            modals: FilterModals::default(),
            search_visible: false,
            search_text: String::new(),
            pending: FilterOverride::default(),
        }
    }

    /// Filters the list shows: committed ones with any pending changes.
    #[must_use]
    pub fn effective_filters(&self) -> FilterState {
        self.coordinator.filters().merged(&self.pending)
    }
}

pub struct Model {
    pub config: AppConfig,
    pub navigator: Navigator,
    pub notices: Notices,
    /// Runtime-only secret: never serialized, never rendered.
    pub session_token: Option<SecretString>,
    pub session_restored: bool,
    pub location_permission: LocationPermission,
    pub next_mount_id: u64,
    pub events_screen: Option<EventsScreen>,
    pub page_cache: PageCache,
    pub login: LoginForm,
    pub register: RegisterForm,
    pub event_form: Option<EventForm>,
    pub focus: FocusState,
}

impl Default for Model {
    fn default() -> Self {
        let config = AppConfig::default();
        let page_cache = PageCache::new(config.cache_capacity);
        Self {
            config,
            navigator: Navigator::default(),
            notices: Notices::default(),
            session_token: None,
            session_restored: false,
            location_permission: LocationPermission::Unknown,
            next_mount_id: 1,
            events_screen: None,
            page_cache,
            login: LoginForm::default(),
            register: RegisterForm::default(),
            event_form: None,
            focus: FocusState::default(),
        }
    }
}

impl Model {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session_token.is_some()
    }

    /// Allocates the stamp for a fresh events screen mount.
    pub fn allocate_mount_id(&mut self) -> u64 {
        let id = self.next_mount_id;
        self.next_mount_id += 1;
        id
    }
}

// Redacted: the session token must never reach logs.
impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("route", self.navigator.current())
            .field("session_present", &self.session_token.is_some())
            .field("session_restored", &self.session_restored)
            .field("location_permission", &self.location_permission)
            .field("events_screen", &self.events_screen)
            .field("event_form", &self.event_form)
            .finish_non_exhaustive()
    }
}
