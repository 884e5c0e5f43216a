//! Band-response weighted resampling between wavelength grids.
//!
//! Every destination band is modelled as a Gaussian response with the band's
//! full-width-half-max. Each source band is treated as a box of its own FWHM;
//! the weight of a source band is the Gaussian mass of the destination
//! response over the intersection of the two boxes. Weights for a destination
//! band are normalised to sum to one.
//!
//! A destination band that intersects no source band has no weights and
//! resamples to NaN. Nothing is extrapolated past the source grid.

use std::f64::consts::SQRT_2;

use ndarray::{Array2, ArrayView1};
use scilib::math::basic::erf;

use crate::error::{Result, SpectraError};

/// sqrt(8 ln 2): ratio between a Gaussian's FWHM and its standard deviation.
const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;

/// Source bands and weights feeding one destination band.
#[derive(Debug, Clone, Default)]
struct BandWeights {
    source: Vec<usize>,
    weights: Vec<f64>,
}

impl BandWeights {
    fn sample(&self, spectrum: ArrayView1<f32>) -> f64 {
        if self.source.is_empty() {
            return f64::NAN;
        }
        self.source
            .iter()
            .zip(&self.weights)
            .map(|(&j, &w)| w * f64::from(spectrum[j]))
            .sum()
    }
}

/// Precomputed resampling from one wavelength grid onto another.
#[derive(Debug, Clone)]
pub struct BandResampler {
    n_source: usize,
    rows: Vec<BandWeights>,
}

impl BandResampler {
    /// Build the resampling weights.
    ///
    /// Missing FWHM arrays are estimated from band spacing. Both grids must
    /// use the same wavelength unit. Source centers need not be sorted.
    pub fn new(
        src_centers: &[f64],
        dst_centers: &[f64],
        src_fwhm: Option<&[f64]>,
        dst_fwhm: Option<&[f64]>,
    ) -> Result<Self> {
        if src_centers.is_empty() {
            return Err(SpectraError::shape("cannot resample from zero source bands"));
        }
        let src_fwhm = resolve_fwhm(src_centers, src_fwhm, "source")?;
        let dst_fwhm = if dst_centers.is_empty() {
            Vec::new()
        } else {
            resolve_fwhm(dst_centers, dst_fwhm, "destination")?
        };
        if let Some(bad) = dst_fwhm.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(SpectraError::shape(format!(
                "destination band widths must be positive, got {bad}"
            )));
        }

        let src_bounds: Vec<(f64, f64)> = src_centers
            .iter()
            .zip(&src_fwhm)
            .map(|(c, w)| (c - w / 2.0, c + w / 2.0))
            .collect();

        let mut uncovered = 0usize;
        let rows = dst_centers
            .iter()
            .zip(&dst_fwhm)
            .map(|(&center, &width)| {
                let row = band_weights(center, width, &src_bounds);
                if row.source.is_empty() {
                    uncovered += 1;
                    log::warn!(
                        "no source band overlaps target band at {center} (fwhm {width}); \
                         output will be NaN"
                    );
                }
                row
            })
            .collect();

        log::debug!(
            "built resampler {} -> {} bands ({uncovered} uncovered)",
            src_centers.len(),
            dst_centers.len()
        );

        Ok(Self {
            n_source: src_centers.len(),
            rows,
        })
    }

    pub fn source_band_count(&self) -> usize {
        self.n_source
    }

    pub fn target_band_count(&self) -> usize {
        self.rows.len()
    }

    /// Dense `(target, source)` weight matrix. Uncovered rows are NaN.
    pub fn matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((self.rows.len(), self.n_source));
        for (i, row) in self.rows.iter().enumerate() {
            if row.source.is_empty() {
                matrix.row_mut(i).fill(f64::NAN);
            }
            for (&j, &w) in row.source.iter().zip(&row.weights) {
                matrix[[i, j]] = w;
            }
        }
        matrix
    }

    /// Resample each row of `data` (spectra × source bands).
    ///
    /// A NaN in a source band only reaches the target bands it feeds.
    pub fn apply(&self, data: &Array2<f32>) -> Result<Array2<f32>> {
        if data.ncols() != self.n_source {
            return Err(SpectraError::shape(format!(
                "resampler expects {} source bands, data has {}",
                self.n_source,
                data.ncols()
            )));
        }
        let mut out = Array2::<f32>::zeros((data.nrows(), self.rows.len()));
        for (spectrum, mut resampled) in data.outer_iter().zip(out.outer_iter_mut()) {
            for (value, row) in resampled.iter_mut().zip(&self.rows) {
                *value = row.sample(spectrum) as f32;
            }
        }
        Ok(out)
    }
}

fn band_weights(center: f64, width: f64, src_bounds: &[(f64, f64)]) -> BandWeights {
    let lo = center - width / 2.0;
    let hi = center + width / 2.0;
    let scale = width / FWHM_PER_SIGMA * SQRT_2;
    let cdf = |x: f64| 0.5 * erf((x - center) / scale);

    let mut row = BandWeights::default();
    for (j, &(s_lo, s_hi)) in src_bounds.iter().enumerate() {
        if s_hi > lo && s_lo < hi {
            let a = s_lo.max(lo);
            let b = s_hi.min(hi);
            row.source.push(j);
            row.weights.push(cdf(b) - cdf(a));
        }
    }

    let total: f64 = row.weights.iter().sum();
    if total > 0.0 {
        row.weights.iter_mut().for_each(|w| *w /= total);
    } else if !row.source.is_empty() {
        // Only zero-width source bands touched this band: average them.
        let even = 1.0 / row.source.len() as f64;
        row.weights.iter_mut().for_each(|w| *w = even);
    }
    row
}

fn resolve_fwhm(centers: &[f64], fwhm: Option<&[f64]>, which: &str) -> Result<Vec<f64>> {
    match fwhm {
        Some(fwhm) if fwhm.len() == centers.len() => Ok(fwhm.to_vec()),
        Some(fwhm) => Err(SpectraError::shape(format!(
            "{which} grid has {} centers but {} band widths",
            centers.len(),
            fwhm.len()
        ))),
        None => estimate_fwhm(centers),
    }
}

/// Estimate band widths from center spacing.
///
/// Interior bands span half the distance between their neighbours; the edge
/// bands take the gap to their single neighbour. Works on unsorted input.
pub fn estimate_fwhm(centers: &[f64]) -> Result<Vec<f64>> {
    let n = centers.len();
    if n < 2 {
        return Err(SpectraError::shape(
            "band widths can only be estimated for two or more bands",
        ));
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| centers[a].total_cmp(&centers[b]));

    let mut fwhm = vec![0.0; n];
    for (rank, &idx) in order.iter().enumerate() {
        let c = |r: usize| centers[order[r]];
        fwhm[idx] = if rank == 0 {
            c(1) - c(0)
        } else if rank == n - 1 {
            c(n - 1) - c(n - 2)
        } else {
            (c(rank + 1) - c(rank - 1)) / 2.0
        };
    }
    Ok(fwhm)
}
