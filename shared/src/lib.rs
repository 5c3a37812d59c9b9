#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod event;
pub mod event_form;
pub mod fetch;
pub mod filters;
pub mod focus;
pub mod geocoding;
pub mod graphql;
pub mod list;
pub mod location;
pub mod model;
pub mod navigation;
pub mod notice;
pub mod session;
pub mod view;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{AppConfig, Platform};
pub use crux_core::App as CruxApp;
pub use error::{AppError, AppResult, ErrorKind, ErrorSeverity};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_DISTANCE_KM: u32 = 80;
pub const DEFAULT_DATE_WINDOW_DAYS: u32 = 7;
pub const LOCATION_TIMEOUT_MS: u64 = 20_000;
pub const LOCATION_MAXIMUM_AGE_MS: u64 = 1_000;
pub const END_REACHED_THRESHOLD: usize = 3;
pub const DEFAULT_CACHE_CAPACITY: usize = 32;
pub const SESSION_TOKEN_KEY: &str = "token";
pub const MIN_PARTICIPANT_LIMIT: u32 = 1;
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An Unexpected Error Ocurred";
pub const EMPTY_LIST_MESSAGE: &str = "No events near you";
pub const LOCATION_RATIONALE_TITLE: &str = "Location Permission";
pub const LOCATION_RATIONALE_MESSAGE: &str =
    "We need to know your location to provide events near you.";
