use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Display marker for a city without a usable temperature reading
pub const NO_DATA: &str = "—";

/// Geographic position of a city, in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Both halves must be present for a city to be eligible for a fetch.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// City record as exposed by the coordinate store
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// One row of a city search
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct SearchResult {
    pub country: String,
    pub city: String,
    /// One-decimal temperature in °C, or "—" when unavailable
    pub temperature: String,
}

/// Current weather for a single city
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct CityWeather {
    pub id: i64,
    pub city: String,
    pub country: String,
    pub temperature: String,
    pub celsius: Option<f64>,
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    pub sub: String, // caller id
    pub exp: usize,  // expiration timestamp
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Render a temperature with one decimal place (half away from zero), or
/// the no-data marker. Values that round to zero never carry a sign.
pub fn display_temperature(celsius: Option<f64>) -> String {
    match celsius {
        Some(value) if value.is_finite() => {
            let rounded = (value * 10.0).round() / 10.0;
            let rounded = if rounded == 0.0 { 0.0 } else { rounded };
            format!("{:.1}", rounded)
        }
        _ => NO_DATA.to_string(),
    }
}
