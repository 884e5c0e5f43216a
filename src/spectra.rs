use ndarray::{Array2, ArrayViewMut2, Axis};
use rand::Rng;

use crate::data::filter;
use crate::data::model::MetadataTable;
use crate::error::{Result, SpectraError};
use crate::resample::BandResampler;
use crate::sensor::{Sensor, WavelengthUnit};

/// Water vapor absorption windows in nanometers, open intervals.
const WATER_VAPOR_NM: [(f64, f64); 2] = [(1350.0, 1460.0), (1790.0, 1960.0)];

/// Solar-reflective shortwave domain in nanometers, open interval.
const SHORTWAVE_NM: (f64, f64) = (350.0, 2500.0);

// ---------------------------------------------------------------------------
// Spectra – a set of spectra bound to one wavelength grid
// ---------------------------------------------------------------------------

/// A `(n_spectra, n_bands)` reflectance array with its sensor, names and
/// optional per-spectrum metadata.
///
/// Row count always equals `names.len()` (and the metadata row count when
/// present); column count always equals `sensor.band_count()`. Every
/// operation that drops or reorders rows or bands updates all of them
/// together.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectra {
    data: Array2<f32>,
    sensor: Sensor,
    names: Vec<String>,
    metadata: Option<MetadataTable>,
}

impl Spectra {
    /// Bind spectra to a copy of `sensor`.
    ///
    /// `data` defaults to a single zero spectrum, `names` to
    /// `spectrum_1 .. spectrum_n`.
    pub fn new(
        data: Option<Array2<f32>>,
        sensor: &Sensor,
        names: Option<Vec<String>>,
        metadata: Option<MetadataTable>,
    ) -> Result<Self> {
        sensor.validate()?;
        let data = data.unwrap_or_else(|| Array2::zeros((1, sensor.band_count())));
        let names = names.unwrap_or_else(|| default_names(data.nrows()));
        let spectra = Self {
            data,
            sensor: sensor.clone(),
            names,
            metadata,
        };
        spectra.check_shape()?;
        Ok(spectra)
    }

    fn check_shape(&self) -> Result<()> {
        let (rows, cols) = self.data.dim();
        if cols != self.sensor.band_count() {
            return Err(SpectraError::shape(format!(
                "data has {cols} bands but sensor '{}' has {}",
                self.sensor.name,
                self.sensor.band_count()
            )));
        }
        if rows != self.names.len() {
            return Err(SpectraError::shape(format!(
                "data has {rows} spectra but {} names were given",
                self.names.len()
            )));
        }
        if let Some(metadata) = &self.metadata {
            if metadata.len() != rows {
                return Err(SpectraError::shape(format!(
                    "data has {rows} spectra but metadata has {} rows",
                    metadata.len()
                )));
            }
        }
        Ok(())
    }

    /// Number of spectra.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn band_count(&self) -> usize {
        self.data.ncols()
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Mutable view of the values. The shape is fixed.
    pub fn data_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.data.view_mut()
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn metadata(&self) -> Option<&MetadataTable> {
        self.metadata.as_ref()
    }

    /// Attach (or clear) metadata; the row count must match.
    pub fn set_metadata(&mut self, metadata: Option<MetadataTable>) -> Result<()> {
        let previous = std::mem::replace(&mut self.metadata, metadata);
        if let Err(e) = self.check_shape() {
            self.metadata = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Split into `(data, sensor, names, metadata)`.
    pub fn into_parts(self) -> (Array2<f32>, Sensor, Vec<String>, Option<MetadataTable>) {
        (self.data, self.sensor, self.names, self.metadata)
    }

    // -- band-range queries and masks --

    fn bands_within(&self, (lo, hi): (f64, f64)) -> Vec<usize> {
        let unit = self.sensor.wavelength_unit;
        let lo = WavelengthUnit::Nanometers.convert(lo, unit);
        let hi = WavelengthUnit::Nanometers.convert(hi, unit);
        self.sensor
            .band_centers
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > lo && c < hi)
            .map(|(i, _)| i)
            .collect()
    }

    /// Mask bands inside the water vapor absorption windows
    /// (1350-1460 nm and 1790-1960 nm). Band centers are untouched.
    pub fn remove_water_bands(&mut self, set_nan: bool) {
        let fill = if set_nan { f32::NAN } else { 0.0 };
        let mut masked = 0;
        for window in WATER_VAPOR_NM {
            for band in self.bands_within(window) {
                self.data.column_mut(band).fill(fill);
                masked += 1;
            }
        }
        log::debug!("masked {masked} water vapor bands");
    }

    /// Indices of bands strictly inside 350-2500 nm.
    pub fn shortwave_band_idxs(&self) -> Vec<usize> {
        self.bands_within(SHORTWAVE_NM)
    }

    /// Scale each spectrum to unit L2 norm over `inds` (all bands if `None`).
    ///
    /// The spectra and the sensor are then restricted to `inds`. An empty or
    /// out-of-range index set falls back to all bands with a warning. A
    /// spectrum with zero norm becomes NaN.
    pub fn brightness_normalize(&mut self, inds: Option<&[usize]>) {
        let n_bands = self.band_count();
        let inds: Vec<usize> = match inds {
            Some(inds) if !inds.is_empty() && inds.iter().all(|&i| i < n_bands) => inds.to_vec(),
            Some(_) => {
                log::warn!("Invalid band range set for {n_bands} bands, using all bands");
                (0..n_bands).collect()
            }
            None => (0..n_bands).collect(),
        };

        let mut selected = self.data.select(Axis(1), &inds);
        for mut spectrum in selected.rows_mut() {
            let norm = spectrum
                .iter()
                .map(|&v| f64::from(v).powi(2))
                .sum::<f64>()
                .sqrt();
            if norm > 0.0 {
                spectrum.mapv_inplace(|v| (f64::from(v) / norm) as f32);
            } else {
                spectrum.fill(f32::NAN);
            }
        }
        self.data = selected;
        self.sensor.retain_bands(&inds);
    }

    // -- unit conversion --

    /// Convert band centers (and widths) to nanometers. Data is untouched.
    pub fn to_nanometers(&mut self) {
        self.convert_units(WavelengthUnit::Nanometers);
    }

    /// Convert band centers (and widths) to micrometers. Data is untouched.
    pub fn to_micrometers(&mut self) {
        self.convert_units(WavelengthUnit::Micrometers);
    }

    fn convert_units(&mut self, unit: WavelengthUnit) {
        if self.sensor.wavelength_unit == unit {
            log::warn!("Wavelength unit already in {unit}. No conversion applied.");
            return;
        }
        self.sensor.convert_units(unit);
    }

    // -- resampling --

    /// Resample onto `target`'s bands, returning spectra bound to a copy of
    /// `target`. Target bands outside the source coverage become NaN.
    pub fn to_sensor(&self, target: &Sensor) -> Result<Spectra> {
        let mut source = self.sensor.clone();
        source.convert_units(target.wavelength_unit);
        let resampler = BandResampler::new(
            &source.band_centers,
            &target.band_centers,
            source.band_widths.as_deref(),
            target.band_widths.as_deref(),
        )?;
        let data = resampler.apply(&self.data)?;
        log::debug!(
            "resampled {} spectra from {} to {}",
            self.len(),
            self.sensor.name,
            target.name
        );
        Spectra::new(
            Some(data),
            target,
            Some(self.names.clone()),
            self.metadata.clone(),
        )
    }

    // -- row and band subsets --

    /// Copy of the spectra at `rows`, in that order. Repeats allowed.
    pub fn select_rows(&self, rows: &[usize]) -> Result<Spectra> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.len()) {
            return Err(SpectraError::shape(format!(
                "row {bad} out of range for {} spectra",
                self.len()
            )));
        }
        let metadata = self
            .metadata
            .as_ref()
            .map(|m| m.select(rows))
            .transpose()?;
        Ok(Self {
            data: self.data.select(Axis(0), rows),
            sensor: self.sensor.clone(),
            names: rows.iter().map(|&r| self.names[r].clone()).collect(),
            metadata,
        })
    }

    /// Copy restricted to `bands`, in that order, sensor included.
    pub fn select_bands(&self, bands: &[usize]) -> Result<Spectra> {
        let mut sensor = self.sensor.clone();
        sensor.select_bands(bands)?;
        Ok(Self {
            data: self.data.select(Axis(1), bands),
            sensor,
            names: self.names.clone(),
            metadata: self.metadata.clone(),
        })
    }

    /// Row indices whose metadata matches `label` at its resolved level.
    pub fn type_indices(&self, label: &str) -> Result<Vec<usize>> {
        let metadata = self.metadata.as_ref().ok_or(SpectraError::MissingMetadata)?;
        let level =
            filter::type_level(metadata, label).ok_or_else(|| SpectraError::classification(label))?;
        Ok(filter::matching_indices(metadata, level, label))
    }

    /// Every spectrum of type `label`, in library order.
    pub fn of_type(&self, label: &str) -> Result<Spectra> {
        self.select_rows(&self.type_indices(label)?)
    }

    // -- random subsets --

    /// Draw `n` spectra with replacement, optionally of one land cover type.
    pub fn subsample(&self, n: usize, by_type: Option<&str>) -> Result<Spectra> {
        self.subsample_with_rng(n, by_type, &mut rand::thread_rng())
    }

    /// [`subsample`](Self::subsample) with a caller-supplied generator.
    pub fn subsample_with_rng<R: Rng + ?Sized>(
        &self,
        n: usize,
        by_type: Option<&str>,
        rng: &mut R,
    ) -> Result<Spectra> {
        let pool = match by_type {
            Some(label) => self.type_indices(label)?,
            None => (0..self.len()).collect(),
        };
        if n > 0 && pool.is_empty() {
            return Err(SpectraError::shape("cannot subsample from zero spectra"));
        }
        let picks: Vec<usize> = (0..n).map(|_| pool[rng.gen_range(0..pool.len())]).collect();
        self.select_rows(&picks)
    }
}

fn default_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("spectrum_{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SpectrumRecord;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sensor() -> Sensor {
        Sensor::new("Test", vec![500.0, 1000.0, 1400.0, 1800.0, 2200.0], WavelengthUnit::Nanometers)
            .with_band_widths(vec![10.0; 5])
            .with_band_names(["a", "b", "c", "d", "e"])
    }

    fn labelled() -> Spectra {
        let data = Array2::from_shape_fn((4, 5), |(r, c)| (r * 10 + c) as f32 + 1.0);
        let metadata = MetadataTable::new(vec![
            SpectrumRecord::new("g1", "pervious", "vegetation"),
            SpectrumRecord::new("s1", "pervious", "bare"),
            SpectrumRecord::new("g2", "pervious", "vegetation"),
            SpectrumRecord::new("r1", "impervious", "urban"),
        ]);
        let names = ["g1", "s1", "g2", "r1"].map(String::from).to_vec();
        Spectra::new(Some(data), &sensor(), Some(names), Some(metadata)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let s = Spectra::new(None, &sensor(), None, None).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.band_count(), 5);
        assert!(s.data().iter().all(|&v| v == 0.0));
        assert_eq!(s.names(), &["spectrum_1"]);
    }

    #[test]
    fn test_shape_checks() {
        let bad_bands = Array2::<f32>::zeros((2, 4));
        assert!(Spectra::new(Some(bad_bands), &sensor(), None, None).is_err());

        let data = Array2::<f32>::zeros((2, 5));
        let names = vec!["only_one".to_string()];
        assert!(Spectra::new(Some(data.clone()), &sensor(), Some(names), None).is_err());

        let metadata = MetadataTable::new(vec![SpectrumRecord::new("x", "pervious", "bare")]);
        assert!(Spectra::new(Some(data), &sensor(), None, Some(metadata)).is_err());
    }

    #[test]
    fn test_set_metadata_keeps_previous_on_error() {
        let mut s = labelled();
        let short = MetadataTable::new(vec![SpectrumRecord::new("x", "pervious", "bare")]);
        assert!(s.set_metadata(Some(short)).is_err());
        assert_eq!(s.metadata().map(MetadataTable::len), Some(4));
        s.set_metadata(None).unwrap();
        assert!(s.metadata().is_none());
    }

    #[test]
    fn test_water_bands() {
        let mut s = Spectra::new(Some(Array2::ones((2, 5))), &sensor(), None, None).unwrap();
        s.remove_water_bands(false);
        assert_eq!(s.data().row(0).to_vec(), vec![1.0, 1.0, 0.0, 0.0, 1.0]);

        let mut s = Spectra::new(Some(Array2::ones((2, 5))), &sensor(), None, None).unwrap();
        s.remove_water_bands(true);
        assert!(s.data()[[1, 2]].is_nan());
        assert!(s.data()[[1, 3]].is_nan());
        assert_eq!(s.data()[[1, 1]], 1.0);
        assert_eq!(s.sensor().band_centers, sensor().band_centers);
    }

    #[test]
    fn test_water_window_edges_are_open() {
        let centers = vec![1350.0, 1351.0, 1459.0, 1460.0];
        let edges = Sensor::new("Edges", centers, WavelengthUnit::Nanometers);
        let mut s = Spectra::new(Some(Array2::ones((1, 4))), &edges, None, None).unwrap();
        s.remove_water_bands(false);
        assert_eq!(s.data().row(0).to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_shortwave_in_micrometers() {
        let centers = vec![0.3, 0.35, 0.4, 2.4, 2.5, 2.6];
        let wide = Sensor::new("Wide", centers, WavelengthUnit::Micrometers);
        let s = Spectra::new(None, &wide, None, None).unwrap();
        assert_eq!(s.shortwave_band_idxs(), vec![2, 3]);
    }

    #[test]
    fn test_brightness_zero_norm_row_is_nan() {
        let mut data = Array2::zeros((2, 5));
        data.row_mut(1).assign(&ndarray::arr1(&[3.0, 0.0, 4.0, 0.0, 0.0]));
        let mut s = Spectra::new(Some(data), &sensor(), None, None).unwrap();
        s.brightness_normalize(None);

        assert!(s.data().row(0).iter().all(|v| v.is_nan()));
        let norm: f32 = s.data().row(1).iter().map(|v| v * v).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, max_relative = 1e-6);
        assert_relative_eq!(s.data()[[1, 0]], 0.6, max_relative = 1e-6);
    }

    #[test]
    fn test_unit_round_trip() {
        let mut s = labelled();
        s.to_micrometers();
        assert_eq!(s.sensor().wavelength_unit, WavelengthUnit::Micrometers);
        assert_relative_eq!(s.sensor().band_centers[1], 1.0);
        s.to_micrometers(); // no-op, warns
        assert_relative_eq!(s.sensor().band_centers[1], 1.0);
        s.to_nanometers();
        assert_eq!(s.sensor().wavelength_unit, WavelengthUnit::Nanometers);
        for (a, b) in s.sensor().band_centers.iter().zip(&sensor().band_centers) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_brightness_normalize_all_bands() {
        let mut s = labelled();
        s.brightness_normalize(None);
        assert_eq!(s.band_count(), 5);
        for row in s.data().rows() {
            let norm: f32 = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_brightness_normalize_subset_restricts_bands() {
        let mut s = labelled();
        s.brightness_normalize(Some(&[0, 4]));
        assert_eq!(s.data().dim(), (4, 2));
        assert_eq!(s.sensor().band_centers, vec![500.0, 2200.0]);
        assert_eq!(s.sensor().band_widths.as_ref().map(Vec::len), Some(2));
        assert_eq!(s.sensor().band_names.as_ref().unwrap(), &["a", "e"]);
        // Row 0 was [1, 5] before normalization.
        let expected = 1.0 / 26f32.sqrt();
        assert_relative_eq!(s.data()[[0, 0]], expected, epsilon = 1e-6);
    }

    #[test]
    fn test_brightness_normalize_out_of_range_falls_back() {
        let mut s = labelled();
        s.brightness_normalize(Some(&[0, 99]));
        assert_eq!(s.band_count(), 5);
        let norm: f32 = s.data().row(2).iter().map(|v| v * v).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-6);

        let mut s = labelled();
        s.brightness_normalize(Some(&[]));
        assert_eq!(s.band_count(), 5);
    }

    #[test]
    fn test_to_sensor_leaves_original() {
        let s = labelled();
        let target = Sensor::new("Coarse", vec![700.0, 1900.0], WavelengthUnit::Nanometers)
            .with_band_widths(vec![400.0, 400.0]);
        let out = s.to_sensor(&target).unwrap();
        assert_eq!(out.band_count(), 2);
        assert_eq!(out.sensor().name, "Coarse");
        assert_eq!(out.names(), s.names());
        assert_eq!(out.metadata(), s.metadata());
        assert_eq!(s.band_count(), 5);
    }

    #[test]
    fn test_to_sensor_converts_units() {
        let s = Spectra::new(Some(Array2::from_elem((1, 5), 0.3)), &sensor(), None, None).unwrap();
        let target = Sensor::new("Micro", vec![1.0, 2.2], WavelengthUnit::Micrometers)
            .with_band_widths(vec![0.01, 0.01]);
        let out = s.to_sensor(&target).unwrap();
        assert_relative_eq!(out.data()[[0, 0]], 0.3, epsilon = 1e-6);
        assert_relative_eq!(out.data()[[0, 1]], 0.3, epsilon = 1e-6);
        assert_eq!(out.sensor().wavelength_unit, WavelengthUnit::Micrometers);
    }

    #[test]
    fn test_select_rows_and_bands() {
        let s = labelled();
        let rows = s.select_rows(&[3, 0, 0]).unwrap();
        assert_eq!(rows.names(), &["r1", "g1", "g1"]);
        assert_eq!(rows.data()[[0, 0]], 31.0);
        assert_eq!(rows.metadata().unwrap().records()[0].name, "r1");
        assert!(s.select_rows(&[4]).is_err());

        let bands = s.select_bands(&[1, 3]).unwrap();
        assert_eq!(bands.sensor().band_centers, vec![1000.0, 1800.0]);
        assert_eq!(bands.data()[[1, 1]], 14.0);
        assert!(s.select_bands(&[5]).is_err());
    }

    #[test]
    fn test_subsample_by_type() {
        let s = labelled();
        let mut rng = StdRng::seed_from_u64(7);
        let sub = s.subsample_with_rng(25, Some("vegetation"), &mut rng).unwrap();
        assert_eq!(sub.len(), 25);
        for record in sub.metadata().unwrap().records() {
            assert_eq!(record.level_2, "vegetation");
        }
        for name in sub.names() {
            assert!(name == "g1" || name == "g2");
        }

        let sub = s.subsample_with_rng(6, Some("impervious"), &mut rng).unwrap();
        assert!(sub.names().iter().all(|n| n == "r1"));
    }

    #[test]
    fn test_subsample_without_type() {
        let s = labelled();
        let sub = s.subsample(10, None).unwrap();
        assert_eq!(sub.len(), 10);
        assert_eq!(sub.band_count(), 5);
        assert_eq!(sub.metadata().map(MetadataTable::len), Some(10));
        assert_eq!(s.subsample(0, None).unwrap().len(), 0);
    }

    #[test]
    fn test_subsample_errors() {
        let s = labelled();
        assert!(matches!(
            s.subsample(3, Some("537451794.xyz")),
            Err(SpectraError::Classification { .. })
        ));

        let bare = Spectra::new(Some(Array2::zeros((3, 5))), &sensor(), None, None).unwrap();
        assert!(matches!(
            bare.subsample(3, Some("vegetation")),
            Err(SpectraError::MissingMetadata)
        ));
        assert!(bare.subsample(3, None).is_ok());
    }

    #[test]
    fn test_of_type() {
        let s = labelled();
        let veg = s.of_type("vegetation").unwrap();
        assert_eq!(veg.names(), &["g1", "g2"]);
    }
}
