/// Region registry for the surfwatch service.
///
/// Maps each region identifier to its surf locations and the NDBC buoy that
/// reports for each location. The registry is loaded once at startup from
/// `regions.toml` and handed to the service as an immutable value; nothing
/// else in the crate hardcodes station ids.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Registry types
// ---------------------------------------------------------------------------

/// A surf location bound to the buoy that reports for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(rename = "station")]
    pub station_id: String,
}

/// A named group of locations, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    #[serde(rename = "location")]
    pub locations: Vec<Location>,
}

/// Root structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RegistryFile {
    region: Vec<Region>,
}

/// All regions known to the service, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRegistry {
    regions: Vec<Region>,
}

impl StationRegistry {
    /// Builds a registry from already-constructed regions, validating it.
    pub fn new(regions: Vec<Region>) -> Result<Self, ConfigError> {
        validate(&regions)?;
        Ok(StationRegistry { regions })
    }

    /// Parses a registry from `regions.toml` content.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: "regions".to_string(),
            message: e.to_string(),
        })?;
        Self::new(file.region)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn region_ids(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.id.as_str()).collect()
    }

    /// Distinct station ids across every region, in first-seen order.
    pub fn station_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.regions
            .iter()
            .flat_map(|r| r.locations.iter())
            .map(|l| l.station_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Loads the registry from a TOML file.
pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<StationRegistry, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: display.clone(),
        source: e,
    })?;

    StationRegistry::from_toml_str(&contents).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse { path: display, message },
        other => other,
    })
}

/// NDBC ids are short alphanumeric codes ("41112", "SAUF1").
fn is_valid_station_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

fn validate(regions: &[Region]) -> Result<(), ConfigError> {
    if regions.is_empty() {
        return Err(ConfigError::Invalid("registry defines no regions".to_string()));
    }

    let mut region_ids = HashSet::new();
    for region in regions {
        if region.id.trim().is_empty() {
            return Err(ConfigError::Invalid("region id must not be empty".to_string()));
        }
        if !region_ids.insert(region.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate region id '{}'", region.id)));
        }
        if region.locations.is_empty() {
            return Err(ConfigError::Invalid(format!("region '{}' has no locations", region.id)));
        }

        let mut names = HashSet::new();
        for location in &region.locations {
            if !names.insert(location.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate location '{}' in region '{}'",
                    location.name, region.id
                )));
            }
            if !is_valid_station_id(&location.station_id) {
                return Err(ConfigError::Invalid(format!(
                    "location '{}' has invalid station id '{}'",
                    location.name, location.station_id
                )));
            }
        }
    }

    Ok(())
}
