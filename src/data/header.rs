//! ENVI-style text header that accompanies a binary spectral library.
//!
//! ```text
//! ENVI
//! file type = ENVI Spectral Library
//! samples = 2151
//! lines = 5
//! bands = 1
//! data type = 4
//! header offset = 0
//! interleave = bsq
//! byte order = 0
//! sensor type = Earthlib
//! spectra names = { spectrum_1, spectrum_2, ... }
//! wavelength units = nanometers
//! wavelength = { 350, 351, ... }
//! ```

use std::collections::BTreeMap;

use crate::error::{Result, SpectraError};
use crate::sensor::WavelengthUnit;

const MAGIC: &str = "ENVI";
const FILE_TYPE: &str = "ENVI Spectral Library";

/// Sample encoding declared by the `data type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Float32,
    Float64,
}

impl DataType {
    pub fn code(&self) -> u8 {
        match self {
            DataType::Float32 => 4,
            DataType::Float64 => 5,
        }
    }

    pub fn byte_size(&self) -> usize {
        match self {
            DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            4 => Ok(DataType::Float32),
            5 => Ok(DataType::Float64),
            other => Err(SpectraError::invalid_header(format!(
                "unsupported data type {other} (expected 4 or 5)"
            ))),
        }
    }
}

/// Byte order declared by the `byte order` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Parsed or to-be-written library header.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryHeader {
    /// Values per spectrum (band count).
    pub samples: usize,
    /// Number of spectra.
    pub lines: usize,
    pub bands: usize,
    pub data_type: DataType,
    pub header_offset: usize,
    pub interleave: String,
    pub byte_order: ByteOrder,
    pub sensor_type: Option<String>,
    pub spectra_names: Option<Vec<String>>,
    pub wavelength_units: Option<WavelengthUnit>,
    pub wavelength: Option<Vec<f64>>,
    /// Fields this crate does not interpret, kept verbatim.
    pub extra: BTreeMap<String, String>,
}

impl LibraryHeader {
    /// Header for `lines` float32 spectra of `wavelength.len()` samples each.
    pub fn for_library(
        sensor_type: &str,
        names: Vec<String>,
        unit: WavelengthUnit,
        wavelength: Vec<f64>,
    ) -> Self {
        Self {
            samples: wavelength.len(),
            lines: names.len(),
            bands: 1,
            data_type: DataType::Float32,
            header_offset: 0,
            interleave: "bsq".to_string(),
            byte_order: ByteOrder::LittleEndian,
            sensor_type: Some(sensor_type.to_string()),
            spectra_names: Some(names),
            wavelength_units: Some(unit),
            wavelength: Some(wavelength),
            extra: BTreeMap::new(),
        }
    }

    /// Render the header document.
    pub fn render(&self) -> String {
        let byte_order = match self.byte_order {
            ByteOrder::LittleEndian => 0,
            ByteOrder::BigEndian => 1,
        };
        let mut out = format!("{MAGIC}\nfile type = {FILE_TYPE}\n");
        out.push_str(&format!("samples = {}\n", self.samples));
        out.push_str(&format!("lines = {}\n", self.lines));
        out.push_str(&format!("bands = {}\n", self.bands));
        out.push_str(&format!("data type = {}\n", self.data_type.code()));
        out.push_str(&format!("header offset = {}\n", self.header_offset));
        out.push_str(&format!("interleave = {}\n", self.interleave));
        out.push_str(&format!("byte order = {byte_order}\n"));
        if let Some(sensor) = &self.sensor_type {
            out.push_str(&format!("sensor type = {sensor}\n"));
        }
        if let Some(names) = &self.spectra_names {
            out.push_str(&format!("spectra names = {{ {} }}\n", names.join(", ")));
        }
        if let Some(unit) = &self.wavelength_units {
            out.push_str(&format!("wavelength units = {unit}\n"));
        }
        if let Some(wavelength) = &self.wavelength {
            let values: Vec<String> = wavelength.iter().map(|w| w.to_string()).collect();
            out.push_str(&format!("wavelength = {{ {} }}\n", values.join(", ")));
        }
        for (key, value) in &self.extra {
            out.push_str(&format!("{key} = {value}\n"));
        }
        out
    }

    /// Parse a header document.
    pub fn parse(text: &str) -> Result<Self> {
        let fields = parse_fields(text)?;

        let samples = required_usize(&fields, "samples")?;
        let lines = required_usize(&fields, "lines")?;
        let bands = optional_usize(&fields, "bands")?.unwrap_or(1);
        if bands != 1 {
            return Err(SpectraError::invalid_header(format!(
                "spectral libraries hold one band per line, header declares {bands}"
            )));
        }
        let code = required_usize(&fields, "data type")?;
        let data_type = u8::try_from(code)
            .map_err(|_| SpectraError::invalid_header(format!("unsupported data type {code}")))
            .and_then(DataType::from_code)?;
        let header_offset = optional_usize(&fields, "header offset")?.unwrap_or(0);
        let byte_order = match optional_usize(&fields, "byte order")?.unwrap_or(0) {
            0 => ByteOrder::LittleEndian,
            1 => ByteOrder::BigEndian,
            other => {
                return Err(SpectraError::invalid_header(format!(
                    "byte order must be 0 or 1, got {other}"
                )))
            }
        };
        let interleave = fields
            .get("interleave")
            .cloned()
            .unwrap_or_else(|| "bsq".to_string());

        let wavelength_units = match fields.get("wavelength units") {
            Some(raw) => match raw.parse::<WavelengthUnit>() {
                Ok(unit) => Some(unit),
                Err(_) => {
                    log::warn!("unrecognised wavelength units '{raw}', ignoring");
                    None
                }
            },
            None => None,
        };

        let wavelength = match fields.get("wavelength") {
            Some(raw) => Some(
                parse_list(raw)
                    .into_iter()
                    .map(|v| {
                        v.parse::<f64>().map_err(|_| {
                            SpectraError::invalid_header(format!("bad wavelength value '{v}'"))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?,
            ),
            None => None,
        };

        let known = [
            "file type",
            "samples",
            "lines",
            "bands",
            "data type",
            "header offset",
            "interleave",
            "byte order",
            "sensor type",
            "spectra names",
            "wavelength units",
            "wavelength",
        ];
        let extra = fields
            .iter()
            .filter(|(k, _)| !known.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            samples,
            lines,
            bands,
            data_type,
            header_offset,
            interleave,
            byte_order,
            sensor_type: fields.get("sensor type").cloned(),
            spectra_names: fields.get("spectra names").map(|raw| parse_list(raw)),
            wavelength_units,
            wavelength,
            extra,
        })
    }
}

/// Whether a spectrum name survives the `{ a, b }` list syntax unchanged.
pub fn is_encodable_name(name: &str) -> bool {
    !name.is_empty()
        && name.trim() == name
        && !name.contains([',', '{', '}', '\n', '\r'])
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Split the document into lower-cased keys and raw values, joining
/// brace-delimited values that span several lines.
fn parse_fields(text: &str) -> Result<BTreeMap<String, String>> {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim() == MAGIC => {}
        _ => {
            return Err(SpectraError::invalid_header(
                "missing ENVI magic on the first line",
            ))
        }
    }

    let mut fields = BTreeMap::new();
    let mut pending: Option<(String, String)> = None;

    for line in lines {
        if let Some((key, mut value)) = pending.take() {
            value.push(' ');
            value.push_str(line.trim());
            if value.contains('}') {
                fields.insert(key, value);
            } else {
                pending = Some((key, value));
            }
            continue;
        }

        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            log::debug!("skipping header line without '=': {line}");
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        if value.starts_with('{') && !value.contains('}') {
            pending = Some((key, value));
        } else {
            fields.insert(key, value);
        }
    }

    if let Some((key, _)) = pending {
        return Err(SpectraError::invalid_header(format!(
            "unterminated list for '{key}'"
        )));
    }
    Ok(fields)
}

/// Items of a `{ a, b, c }` list. A bare value is a one-item list.
fn parse_list(raw: &str) -> Vec<String> {
    let inner = raw
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(',').map(|item| item.trim().to_string()).collect()
}

fn optional_usize(fields: &BTreeMap<String, String>, key: &str) -> Result<Option<usize>> {
    fields
        .get(key)
        .map(|raw| {
            raw.parse::<usize>().map_err(|_| {
                SpectraError::invalid_header(format!("'{key}' is not an integer: '{raw}'"))
            })
        })
        .transpose()
}

fn required_usize(fields: &BTreeMap<String, String>, key: &str) -> Result<usize> {
    optional_usize(fields, key)?
        .ok_or_else(|| SpectraError::invalid_header(format!("missing required field '{key}'")))
}
