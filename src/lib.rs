//! Endmember spectral libraries for remote sensing.
//!
//! Reads and writes ENVI spectral libraries, keeps per-spectrum land cover
//! metadata alongside the reflectance array, and converts spectra between
//! sensors by FWHM-weighted band resampling.

pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod resample;
pub mod sensor;
pub mod spectra;

pub use config::{metadata, supported_sensors, SensorRegistry};
pub use data::filter::{list_types, type_level};
pub use data::loader::{read_jfsp, read_library, write_library, JfspSpectrum};
pub use data::model::{Level, MetadataTable, SpectrumRecord};
pub use error::{Result, SpectraError};
pub use resample::BandResampler;
pub use sensor::{Sensor, WavelengthUnit};
pub use spectra::Spectra;
