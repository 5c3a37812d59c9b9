//! Capabilities the core asks the shell to perform.
//!
//! Rendering, HTTP and key-value storage come straight from the Crux
//! crates. Geolocation and runtime permissions are custom: the shell
//! answers them with the platform APIs.
mod geolocation;
mod permissions;

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

pub use self::geolocation::{
    Geolocation, GeolocationError, GeolocationOperation, GeolocationResult, Position,
    PositionOptions,
};
pub use self::permissions::{
    PermissionKind, PermissionOperation, PermissionStatus, Permissions, Rationale,
};

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub geolocation: Geolocation<Event>,
    pub permissions: Permissions<Event>,
}
