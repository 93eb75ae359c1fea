//! Validator for inbound readings and station names

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Longest accepted station id
    pub max_station_id_len: usize,
    /// Longest accepted station display name
    pub max_name_len: usize,
    /// Accepted temperature range (°C), unchecked when `None`
    pub temperature_range: Option<(f64, f64)>,
    /// Accepted relative humidity range (%), unchecked when `None`
    pub humidity_range: Option<(f64, f64)>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_station_id_len: 64,
            max_name_len: 128,
            temperature_range: None,
            humidity_range: None,
        }
    }
}

impl ValidationConfig {
    /// Config that also rejects physically implausible values
    pub fn strict() -> Self {
        Self {
            temperature_range: Some((-90.0, 60.0)),
            humidity_range: Some((0.0, 100.0)),
            ..Default::default()
        }
    }
}

/// Raw parameters of a store-reading request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingParams {
    pub temp: Option<String>,
    pub hum: Option<String>,
    pub id: Option<String>,
}

/// Raw parameters of a set-name request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameParams {
    pub stationid: Option<String>,
    pub name: Option<String>,
}

/// A reading that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReading {
    pub station_id: Option<String>,
    pub temperature: f64,
    pub humidity: f64,
}

/// A station name that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidName {
    pub station_id: String,
    pub name: String,
}

/// Validator for request parameters
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

/// The raw value, unless absent or blank. Values are never trimmed.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: Option<(f64, f64)>,
    ) -> Result<(), ValidationError> {
        match range {
            Some((min, max)) if value < min || value > max => Err(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Parse a finite number
    pub fn parse_number(&self, field: &'static str, raw: &str) -> Result<f64, ValidationError> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ValidationError::InvalidNumber {
                field,
                value: raw.to_string(),
            }),
        }
    }

    fn check_len(&self, field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
        let len = value.chars().count();
        if len > max {
            Err(ValidationError::TooLong { field, len, max })
        } else {
            Ok(())
        }
    }

    /// Validate a store-reading request.
    ///
    /// Every missing parameter is reported at once, before any parsing.
    /// `id` is only required when `require_station` is set.
    pub fn validate_reading(
        &self,
        params: &ReadingParams,
        require_station: bool,
    ) -> Result<ValidReading, ValidationError> {
        let temp = present(&params.temp);
        let hum = present(&params.hum);
        let id = present(&params.id);

        let mut missing = Vec::new();
        if temp.is_none() {
            missing.push("temp");
        }
        if hum.is_none() {
            missing.push("hum");
        }
        if require_station && id.is_none() {
            missing.push("id");
        }

        let (Some(temp), Some(hum), true) = (temp, hum, missing.is_empty()) else {
            debug!("Rejecting reading, missing {:?}", missing);
            return Err(ValidationError::MissingFields(missing));
        };

        let temperature = self.parse_number("temp", temp)?;
        let humidity = self.parse_number("hum", hum)?;
        self.validate_range("temp", temperature, self.config.temperature_range)?;
        self.validate_range("hum", humidity, self.config.humidity_range)?;

        if let Some(id) = id {
            self.check_len("id", id, self.config.max_station_id_len)?;
        }

        Ok(ValidReading {
            station_id: id.map(str::to_string),
            temperature,
            humidity,
        })
    }

    /// Validate a station id on its own, as used by lookups.
    pub fn validate_station_id(
        &self,
        id: &Option<String>,
        require_station: bool,
    ) -> Result<Option<String>, ValidationError> {
        match present(id) {
            Some(id) => {
                self.check_len("id", id, self.config.max_station_id_len)?;
                Ok(Some(id.to_string()))
            }
            None if require_station => Err(ValidationError::MissingFields(vec!["id"])),
            None => Ok(None),
        }
    }

    /// Validate a set-name request. Both fields must be non-empty.
    pub fn validate_name(&self, params: &NameParams) -> Result<ValidName, ValidationError> {
        let stationid = present(&params.stationid);
        let name = present(&params.name);

        let (Some(stationid), Some(name)) = (stationid, name) else {
            let mut missing = Vec::new();
            if stationid.is_none() {
                missing.push("stationid");
            }
            if name.is_none() {
                missing.push("name");
            }
            return Err(ValidationError::MissingFields(missing));
        };

        self.check_len("stationid", stationid, self.config.max_station_id_len)?;
        self.check_len("name", name, self.config.max_name_len)?;

        Ok(ValidName {
            station_id: stationid.to_string(),
            name: name.to_string(),
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
