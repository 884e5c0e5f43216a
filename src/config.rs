//! Bundled configuration tables: the supported sensor registry and the
//! classification metadata of the reference library.
//!
//! Both tables are compiled into the crate, parsed on first use and shared
//! read-only for the rest of the process. Callers that need to modify a
//! sensor take a clone.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::data::filter::ambiguous_labels;
use crate::data::model::MetadataTable;
use crate::error::{Result, SpectraError};
use crate::sensor::{Sensor, WavelengthUnit};

const SENSORS_JSON: &str = include_str!("../data/sensors.json");
const METADATA_CSV: &str = include_str!("../data/spectra.csv");

static SENSORS: OnceLock<SensorRegistry> = OnceLock::new();
static METADATA: OnceLock<MetadataTable> = OnceLock::new();

/// The bundled sensor registry.
pub fn supported_sensors() -> &'static SensorRegistry {
    SENSORS.get_or_init(|| {
        SensorRegistry::from_json(SENSORS_JSON).expect("bundled sensor table is valid")
    })
}

/// The bundled classification metadata table.
pub fn metadata() -> &'static MetadataTable {
    METADATA.get_or_init(|| {
        let table = MetadataTable::from_reader(METADATA_CSV.as_bytes())
            .expect("bundled metadata table is valid");
        for (label, levels) in ambiguous_labels(&table) {
            log::warn!("label '{label}' appears at several levels {levels:?}; the first wins");
        }
        table
    })
}

// ---------------------------------------------------------------------------
// Sensor table schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SensorTable {
    sensors: Vec<SensorEntry>,
}

/// A regularly spaced band grid, both ends inclusive.
#[derive(Debug, Deserialize)]
struct BandRange {
    start: f64,
    stop: f64,
    step: f64,
}

impl BandRange {
    fn centers(&self) -> Result<Vec<f64>> {
        if !(self.step > 0.0) || self.stop < self.start {
            return Err(SpectraError::shape(format!(
                "invalid band range {}..{} step {}",
                self.start, self.stop, self.step
            )));
        }
        let n = ((self.stop - self.start) / self.step).round() as usize + 1;
        Ok((0..n).map(|i| self.start + i as f64 * self.step).collect())
    }
}

fn default_measurement_unit() -> String {
    "reflectance".to_string()
}

#[derive(Debug, Deserialize)]
struct SensorEntry {
    name: String,
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    band_names: Option<Vec<String>>,
    #[serde(default)]
    band_descriptions: Option<Vec<String>>,
    #[serde(default)]
    band_centers: Option<Vec<f64>>,
    #[serde(default)]
    band_range: Option<BandRange>,
    #[serde(default)]
    band_widths: Option<Vec<f64>>,
    #[serde(default)]
    wavelength_unit: WavelengthUnit,
    #[serde(default = "default_measurement_unit")]
    measurement_unit: String,
    #[serde(default)]
    scale: Option<f64>,
}

impl TryFrom<SensorEntry> for Sensor {
    type Error = SpectraError;

    fn try_from(entry: SensorEntry) -> Result<Self> {
        let band_centers = match (entry.band_centers, &entry.band_range) {
            (Some(centers), None) => centers,
            (None, Some(range)) => range.centers()?,
            _ => {
                return Err(SpectraError::shape(format!(
                    "sensor '{}' needs exactly one of band_centers or band_range",
                    entry.name
                )))
            }
        };
        let sensor = Sensor {
            name: entry.name,
            collection: entry.collection,
            band_names: entry.band_names,
            band_descriptions: entry.band_descriptions,
            band_centers,
            band_widths: entry.band_widths,
            wavelength_unit: entry.wavelength_unit,
            measurement_unit: entry.measurement_unit,
            scale: entry.scale,
        };
        sensor.validate()?;
        Ok(sensor)
    }
}

// ---------------------------------------------------------------------------
// SensorRegistry
// ---------------------------------------------------------------------------

/// Named sensors in table order.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    sensors: Vec<Sensor>,
}

impl SensorRegistry {
    /// Parse a `{ "sensors": [...] }` table. Names must be unique.
    pub fn from_json(text: &str) -> Result<Self> {
        let table: SensorTable = serde_json::from_str(text)?;
        let mut sensors: Vec<Sensor> = Vec::with_capacity(table.sensors.len());
        for entry in table.sensors {
            let sensor = Sensor::try_from(entry)?;
            if sensors.iter().any(|s| s.name == sensor.name) {
                return Err(SpectraError::shape(format!(
                    "duplicate sensor name '{}'",
                    sensor.name
                )));
            }
            sensors.push(sensor);
        }
        log::debug!("loaded {} sensors", sensors.len());
        Ok(Self { sensors })
    }

    pub fn get(&self, name: &str) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.sensors.iter().map(|s| s.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
