use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use super::header::{is_encodable_name, ByteOrder, DataType, LibraryHeader};
use super::model::MetadataTable;
use crate::config::supported_sensors;
use crate::error::{Result, SpectraError};
use crate::sensor::{Sensor, WavelengthUnit};
use crate::spectra::Spectra;

// ---------------------------------------------------------------------------
// Sidecar paths
// ---------------------------------------------------------------------------

/// Library and header paths for writing to `path`.
///
/// * `lib.sli` → (`lib.sli`, `lib.hdr`)
/// * `lib.hdr` → (`lib.sli`, `lib.hdr`)
/// * anything else → the extension (if any) is replaced by both.
pub fn output_paths(path: &Path) -> (PathBuf, PathBuf) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "sli" => (path.to_path_buf(), path.with_extension("hdr")),
        "hdr" => (path.with_extension("sli"), path.to_path_buf()),
        _ => (path.with_extension("sli"), path.with_extension("hdr")),
    }
}

/// Header locations tried for a library at `path`, in order: the path with
/// its last four characters replaced by `.hdr`, then the path plus `.hdr`.
pub fn header_candidates(path: &Path) -> Vec<PathBuf> {
    let raw = path.to_string_lossy();
    let mut candidates = Vec::with_capacity(2);
    if let Some((cut, _)) = raw.char_indices().rev().nth(3) {
        if cut > 0 {
            candidates.push(PathBuf::from(format!("{}.hdr", &raw[..cut])));
        }
    }
    let mut appended = path.as_os_str().to_owned();
    appended.push(".hdr");
    candidates.push(PathBuf::from(appended));
    candidates
}

/// First existing header for the library at `path`.
pub fn find_header(path: &Path) -> Result<PathBuf> {
    header_candidates(path)
        .into_iter()
        .find(|candidate| check_file(candidate))
        .ok_or_else(|| SpectraError::HeaderNotFound {
            path: path.to_path_buf(),
        })
}

/// Whether `path` is a regular file that can be opened for reading.
pub fn check_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

// ---------------------------------------------------------------------------
// Spectral library writer
// ---------------------------------------------------------------------------

/// Write `spectra` as a float32 spectral library plus text header.
///
/// `rows` and `bands` optionally restrict what is written; names and band
/// centers are subset together with the data. Returns the (library, header)
/// paths that were written.
pub fn write_library(
    spectra: &Spectra,
    path: &Path,
    rows: Option<&[usize]>,
    bands: Option<&[usize]>,
) -> Result<(PathBuf, PathBuf)> {
    let (sli_path, hdr_path) = output_paths(path);

    let mut subset = Cow::Borrowed(spectra);
    if let Some(rows) = rows {
        subset = Cow::Owned(subset.select_rows(rows)?);
    }
    if let Some(bands) = bands {
        subset = Cow::Owned(subset.select_bands(bands)?);
    }

    if let Some(bad) = subset.names().iter().find(|n| !is_encodable_name(n)) {
        return Err(SpectraError::InvalidName { name: bad.clone() });
    }
    let sensor = subset.sensor();
    if !is_encodable_name(&sensor.name) {
        return Err(SpectraError::InvalidName {
            name: sensor.name.clone(),
        });
    }

    let header = LibraryHeader::for_library(
        &sensor.name,
        subset.names().to_vec(),
        sensor.wavelength_unit,
        sensor.band_centers.clone(),
    );
    std::fs::write(&hdr_path, header.render())?;

    let mut writer = BufWriter::new(File::create(&sli_path)?);
    for value in subset.data().iter() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;

    log::info!(
        "wrote {} spectra x {} bands to {}",
        subset.len(),
        subset.band_count(),
        sli_path.display()
    );
    Ok((sli_path, hdr_path))
}

// ---------------------------------------------------------------------------
// Spectral library reader
// ---------------------------------------------------------------------------

/// Read a spectral library and its sidecar header.
///
/// Without a `sensor`, one is built from the header's wavelengths and named
/// after the file. A supplied sensor must match the stored band count.
pub fn read_library(
    path: &Path,
    sensor: Option<&Sensor>,
    metadata: Option<MetadataTable>,
) -> Result<Spectra> {
    let hdr_path = find_header(path)?;
    let header = LibraryHeader::parse(&std::fs::read_to_string(&hdr_path)?)?;
    log::debug!(
        "{}: {} spectra x {} samples",
        hdr_path.display(),
        header.lines,
        header.samples
    );

    let data_path = data_path_for(path);
    let data = read_payload(&data_path, &header)?;

    let header_sensor;
    let sensor = match sensor {
        Some(sensor) => sensor,
        None => {
            let centers = header
                .wavelength
                .clone()
                .ok_or_else(|| SpectraError::invalid_header("missing 'wavelength' list"))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let unit = header.wavelength_units.unwrap_or(WavelengthUnit::Nanometers);
            header_sensor = Sensor::new(name, centers, unit);
            &header_sensor
        }
    };

    Spectra::new(Some(data), sensor, header.spectra_names.clone(), metadata)
}

/// Binary library behind `path`. A header path maps to its data file:
/// `lib.sli.hdr` → `lib.sli` when that exists, otherwise `lib.hdr` → `lib.sli`.
fn data_path_for(path: &Path) -> PathBuf {
    if !path.extension().is_some_and(|e| e.eq_ignore_ascii_case("hdr")) {
        return path.to_path_buf();
    }
    let stripped = path.with_extension("");
    if stripped.extension().is_some() && check_file(&stripped) {
        stripped
    } else {
        output_paths(path).0
    }
}

fn read_payload(path: &Path, header: &LibraryHeader) -> Result<Array2<f32>> {
    let width = header.data_type.byte_size();
    let sizes = header
        .lines
        .checked_mul(header.samples)
        .and_then(|count| Some((count, count.checked_mul(width)?)));
    let Some((count, size)) = sizes else {
        return Err(SpectraError::invalid_header(format!(
            "{} lines x {} samples overflows",
            header.lines, header.samples
        )));
    };

    let mut file = File::open(path)?;
    let available = file.metadata()?.len().saturating_sub(header.header_offset as u64);
    if (size as u64) > available {
        return Err(SpectraError::invalid_header(format!(
            "{} holds {available} bytes after the offset, header declares {count} values",
            path.display()
        )));
    }
    file.seek(SeekFrom::Start(header.header_offset as u64))?;
    let mut bytes = vec![0u8; size];
    file.read_exact(&mut bytes)?;

    let little = header.byte_order == ByteOrder::LittleEndian;
    let values: Vec<f32> = match header.data_type {
        DataType::Float32 => bytes
            .chunks_exact(4)
            .map(|c| {
                let raw = [c[0], c[1], c[2], c[3]];
                if little {
                    f32::from_le_bytes(raw)
                } else {
                    f32::from_be_bytes(raw)
                }
            })
            .collect(),
        DataType::Float64 => bytes
            .chunks_exact(8)
            .map(|c| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(c);
                let v = if little {
                    f64::from_le_bytes(raw)
                } else {
                    f64::from_be_bytes(raw)
                };
                v as f32
            })
            .collect(),
    };

    Array2::from_shape_vec((header.lines, header.samples), values)
        .map_err(|e| SpectraError::shape(e.to_string()))
}

// ---------------------------------------------------------------------------
// JFSP ASCII reader
// ---------------------------------------------------------------------------

/// A mean reflectance spectrum with its ± one standard deviation envelopes.
#[derive(Debug, Clone)]
pub struct JfspSpectrum {
    /// One spectrum on the ASD grid.
    pub spectra: Spectra,
    pub stdev_plus: Array1<f32>,
    pub stdev_minus: Array1<f32>,
}

/// Read a Joint Fire Science Program ASCII spectrum.
///
/// The first line is a header. Each following line holds
/// `label mean +stdev -stdev`, one per ASD band starting at the first.
/// Bands past the end of the file stay zero.
pub fn read_jfsp(path: &Path) -> Result<JfspSpectrum> {
    let asd = supported_sensors()
        .get("ASD")
        .ok_or_else(|| SpectraError::UnsupportedSensor {
            name: "ASD".to_string(),
            supported: supported_sensors().names(),
        })?;
    let n_bands = asd.band_count();

    let mut mean = Array2::<f32>::zeros((1, n_bands));
    let mut stdev_plus = Array1::<f32>::zeros(n_bands);
    let mut stdev_minus = Array1::<f32>::zeros(n_bands);

    let reader = BufReader::new(File::open(path)?);
    let mut i = 0;
    for (row, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if i >= n_bands {
            return Err(SpectraError::shape(format!(
                "{} has more rows than the {n_bands} ASD bands",
                path.display()
            )));
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(SpectraError::shape(format!(
                "{} line {}: expected 4 columns, found {}",
                path.display(),
                row + 1,
                fields.len()
            )));
        }
        let parse = |s: &str| {
            s.parse::<f32>().map_err(|_| {
                let at = path.display();
                SpectraError::shape(format!("{at} line {}: '{s}' is not a number", row + 1))
            })
        };
        mean[[0, i]] = parse(fields[1])?;
        stdev_plus[i] = parse(fields[2])?;
        stdev_minus[i] = parse(fields[3])?;
        i += 1;
    }

    Ok(JfspSpectrum {
        spectra: Spectra::new(Some(mean), asd, None, None)?,
        stdev_plus,
        stdev_minus,
    })
}
