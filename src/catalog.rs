//! Lookups against the bundled sensor registry and metadata table, and
//! endmember selection for a target sensor.

use crate::config::{metadata, supported_sensors};
use crate::data::filter;
use crate::data::model::Level;
use crate::error::{Result, SpectraError};
use crate::sensor::Sensor;
use crate::spectra::Spectra;

/// Names of the supported sensors.
pub fn list_sensors() -> Vec<String> {
    supported_sensors().names()
}

/// Fail with [`SpectraError::UnsupportedSensor`] unless `name` is registered.
pub fn validate_sensor(name: &str) -> Result<()> {
    registered(name).map(|_| ())
}

fn registered(name: &str) -> Result<&'static Sensor> {
    supported_sensors()
        .get(name)
        .ok_or_else(|| SpectraError::UnsupportedSensor {
            name: name.to_string(),
            supported: list_sensors(),
        })
}

/// An independent copy of a registered sensor.
pub fn get_sensor(name: &str) -> Result<Sensor> {
    registered(name).cloned()
}

/// Image collection identifier for a sensor.
pub fn collection_name(name: &str) -> Result<Option<String>> {
    Ok(registered(name)?.collection.clone())
}

/// Factor taking raw values of a sensor to 0-1 reflectance.
pub fn scaler(name: &str) -> Result<Option<f64>> {
    Ok(registered(name)?.scale)
}

pub fn band_names(name: &str) -> Result<Vec<String>> {
    Ok(registered(name)?.band_names.clone().unwrap_or_default())
}

pub fn band_descriptions(name: &str) -> Result<Vec<String>> {
    Ok(registered(name)?.band_descriptions.clone().unwrap_or_default())
}

/// Sorted indices of `custom_bands` in the sensor's band list.
/// Names the sensor does not have are skipped.
pub fn band_indices<S: AsRef<str>>(custom_bands: &[S], name: &str) -> Result<Vec<usize>> {
    let sensor = registered(name)?;
    let mut indices: Vec<usize> = custom_bands
        .iter()
        .filter_map(|band| sensor.band_index(band.as_ref()))
        .collect();
    indices.sort_unstable();
    Ok(indices)
}

/// Land cover labels at `level` in the bundled metadata table.
pub fn list_types(level: Level) -> Vec<String> {
    filter::list_types(metadata(), level)
}

/// Level of `label` in the bundled metadata table; `None` if unknown.
pub fn type_level(label: &str) -> Option<Level> {
    filter::type_level(metadata(), label)
}

/// Endmembers of `by_type` from `library`, resampled to a supported sensor.
///
/// Draws `n` spectra with replacement, or takes every spectrum of the type
/// when `n` is zero. `bands`, when given, restricts the output to those
/// named sensor bands.
pub fn select_spectra<S: AsRef<str>>(
    library: &Spectra,
    by_type: &str,
    sensor: &str,
    n: usize,
    bands: Option<&[S]>,
) -> Result<Spectra> {
    let target = registered(sensor)?;
    let endmembers = if n == 0 {
        library.of_type(by_type)?
    } else {
        library.subsample(n, Some(by_type))?
    };
    let resampled = endmembers.to_sensor(target)?;
    match bands {
        Some(bands) => resampled.select_bands(&band_indices(bands, sensor)?),
        None => Ok(resampled),
    }
}
