use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// WavelengthUnit
// ---------------------------------------------------------------------------

/// Unit of a sensor's band centers and band widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WavelengthUnit {
    #[default]
    Nanometers,
    Micrometers,
}

impl WavelengthUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WavelengthUnit::Nanometers => "nanometers",
            WavelengthUnit::Micrometers => "micrometers",
        }
    }

    /// Express a wavelength given in `self` in `target` units.
    pub fn convert(&self, value: f64, target: WavelengthUnit) -> f64 {
        match (self, target) {
            (WavelengthUnit::Micrometers, WavelengthUnit::Nanometers) => value * 1000.0,
            (WavelengthUnit::Nanometers, WavelengthUnit::Micrometers) => value / 1000.0,
            _ => value,
        }
    }
}

impl fmt::Display for WavelengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WavelengthUnit {
    type Err = SpectraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nanometers" | "nanometer" | "nm" => Ok(WavelengthUnit::Nanometers),
            "micrometers" | "micrometer" | "microns" | "micron" | "um" | "µm" => {
                Ok(WavelengthUnit::Micrometers)
            }
            other => Err(SpectraError::invalid_header(format!(
                "unknown wavelength unit '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Wavelength grid and identity of a measuring instrument.
///
/// `Clone` is a deep copy. Every [`Spectra`](crate::Spectra) owns its own
/// sensor so registry entries are never aliased by a working copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub name: String,
    /// External image-collection identifier.
    pub collection: Option<String>,
    pub band_names: Option<Vec<String>>,
    pub band_descriptions: Option<Vec<String>>,
    pub band_centers: Vec<f64>,
    /// Full-width-half-max per band, same unit as `band_centers`.
    pub band_widths: Option<Vec<f64>>,
    pub wavelength_unit: WavelengthUnit,
    pub measurement_unit: String,
    /// Factor taking raw sensor values to 0-1 reflectance.
    pub scale: Option<f64>,
}

impl Sensor {
    pub fn new(name: impl Into<String>, band_centers: Vec<f64>, unit: WavelengthUnit) -> Self {
        Self {
            name: name.into(),
            collection: None,
            band_names: None,
            band_descriptions: None,
            band_centers,
            band_widths: None,
            wavelength_unit: unit,
            measurement_unit: "reflectance".to_string(),
            scale: None,
        }
    }

    pub fn with_band_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.band_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_band_widths(mut self, widths: Vec<f64>) -> Self {
        self.band_widths = Some(widths);
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_measurement_unit(mut self, unit: impl Into<String>) -> Self {
        self.measurement_unit = unit.into();
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn band_count(&self) -> usize {
        self.band_centers.len()
    }

    /// Check that every per-band array matches the number of band centers.
    pub fn validate(&self) -> Result<()> {
        let n = self.band_count();
        let parallel = [
            ("band_names", self.band_names.as_ref().map(Vec::len)),
            ("band_descriptions", self.band_descriptions.as_ref().map(Vec::len)),
            ("band_widths", self.band_widths.as_ref().map(Vec::len)),
        ];
        for (field, len) in parallel {
            if let Some(len) = len {
                if len != n {
                    return Err(SpectraError::shape(format!(
                        "sensor '{}': {field} has {len} entries but there are {n} band centers",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Restrict every per-band array to `indices`, in that order.
    ///
    /// Indices must be in range; repeats are kept.
    pub fn select_bands(&mut self, indices: &[usize]) -> Result<()> {
        let n = self.band_count();
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(SpectraError::shape(format!(
                "band index {bad} out of range for {n} bands"
            )));
        }
        self.retain_bands(indices);
        Ok(())
    }

    /// Unchecked form of [`select_bands`](Self::select_bands) for callers that
    /// already validated `indices`.
    pub(crate) fn retain_bands(&mut self, indices: &[usize]) {
        self.band_centers = pick(&self.band_centers, indices);
        if let Some(widths) = &self.band_widths {
            self.band_widths = Some(pick(widths, indices));
        }
        if let Some(names) = &self.band_names {
            self.band_names = Some(pick(names, indices));
        }
        if let Some(descriptions) = &self.band_descriptions {
            self.band_descriptions = Some(pick(descriptions, indices));
        }
    }

    /// Position of a named band, if the sensor has band names.
    pub fn band_index(&self, name: &str) -> Option<usize> {
        self.band_names
            .as_ref()
            .and_then(|names| names.iter().position(|n| n == name))
    }

    /// Rescale band centers and widths into `unit`.
    pub(crate) fn convert_units(&mut self, unit: WavelengthUnit) {
        let from = self.wavelength_unit;
        if from != unit {
            self.band_centers
                .iter_mut()
                .for_each(|c| *c = from.convert(*c, unit));
            if let Some(widths) = self.band_widths.as_mut() {
                widths.iter_mut().for_each(|w| *w = from.convert(*w, unit));
            }
        }
        self.wavelength_unit = unit;
    }
}

fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}
