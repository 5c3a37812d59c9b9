//! Postal-code lookup for the event location picker.
//!
//! The core builds the lookup URL and interprets the response; the HTTP
//! capability performs the request.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::{AppError, ErrorKind};
use crate::model::{CoordinateError, Coordinates};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeocodeError {
    #[error("postal code is required")]
    MissingZipCode,

    #[error("invalid geocoding endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("no results for postal code {0}")]
    NoResults(String),

    #[error("geocoder returned an invalid position: {0}")]
    InvalidCoordinates(#[from] CoordinateError),
}

impl From<GeocodeError> for AppError {
    fn from(e: GeocodeError) -> Self {
        let kind = match e {
            GeocodeError::MissingZipCode => ErrorKind::Validation,
            GeocodeError::InvalidEndpoint(_) => ErrorKind::Configuration,
            GeocodeError::NoResults(_) | GeocodeError::InvalidCoordinates(_) => {
                ErrorKind::Geocoding
            }
        };
        AppError::new(kind, e.to_string())
    }
}

pub fn geocode_url(endpoint: &str, zip_code: &str) -> Result<Url, GeocodeError> {
    let zip_code = zip_code.trim();
    if zip_code.is_empty() {
        return Err(GeocodeError::MissingZipCode);
    }
    Url::parse_with_params(endpoint, [("address", zip_code), ("sensor", "false")])
        .map_err(|e| GeocodeError::InvalidEndpoint(e.to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Rewrites `"Street - District, City - ST, Zip, Country"` into
/// `"Street, <number> - District"`. Addresses without a `-` before the
/// first `,` become `"<formatted>, <number>"`.
#[must_use]
pub fn normalize_address(formatted: &str, number: &str) -> String {
    let number = number.trim();
    let split = formatted.find('-').and_then(|dash| {
        let comma = formatted.find(',')?;
        (dash < comma).then(|| (&formatted[..dash], &formatted[dash..comma]))
    });

    match split {
        Some((street, district)) => {
            format!("{}, {number} {}", street.trim_end(), district.trim_end())
        }
        None => format!("{}, {number}", formatted.trim()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub address: String,
    pub zip_code: String,
    pub number: String,
    pub coordinates: Coordinates,
}

pub fn resolve(
    response: &GeocodeResponse,
    zip_code: &str,
    number: &str,
) -> Result<ResolvedLocation, GeocodeError> {
    let first = response
        .results
        .first()
        .ok_or_else(|| GeocodeError::NoResults(zip_code.to_string()))?;
    let LatLng { lat, lng } = first.geometry.location;

    Ok(ResolvedLocation {
        address: normalize_address(&first.formatted_address, number),
        zip_code: zip_code.trim().to_string(),
        number: number.trim().to_string(),
        coordinates: Coordinates::new(lng, lat)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerField {
    ZipCode,
    Number,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPicker {
    pub is_open: bool,
    pub zip_code: String,
    pub number: String,
    pub is_loading: bool,
}

impl LocationPicker {
    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn set(&mut self, field: PickerField, value: String) {
        match field {
            PickerField::ZipCode => self.zip_code = value,
            PickerField::Number => self.number = value,
        }
    }

    /// Lookup URL for the entered postal code; `None` while a lookup is
    /// already running.
    pub fn begin_search(&mut self, endpoint: &str) -> Option<Result<Url, GeocodeError>> {
        if !self.is_open || self.is_loading {
            return None;
        }
        let url = geocode_url(endpoint, &self.zip_code);
        self.is_loading = url.is_ok();
        Some(url)
    }

    /// Consumes a lookup response. On success the picker closes.
    pub fn finish(
        &mut self,
        response: Result<GeocodeResponse, AppError>,
    ) -> Result<ResolvedLocation, AppError> {
        self.is_loading = false;
        let resolved = resolve(&response?, &self.zip_code, &self.number)?;
        self.close();
        Ok(resolved)
    }
}
