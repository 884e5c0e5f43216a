use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use earthspec::{supported_sensors, write_library, MetadataTable, Spectra, SpectrumRecord};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Reflectance shaped as a sloped baseline plus absorption/reflectance
/// features, clamped to [0, 1].
fn generate_spectrum(
    wavelengths: &[f64],
    baseline: (f64, f64),
    features: &[(f64, f64, f64)],
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Vec<f32> {
    let (offset, slope) = baseline;
    wavelengths
        .iter()
        .map(|&wl| {
            let signal: f64 = features
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp))
                .sum();
            let trend = offset + slope * (wl - 350.0) / 2150.0;
            let value = trend + signal + noise.sample(rng);
            value.clamp(0.0, 1.0) as f32
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| ".".to_string()));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let sensor = supported_sensors()
        .get("Earthlib")
        .context("Earthlib sensor missing from the registry")?;
    let wavelengths = &sensor.band_centers;

    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.002).context("invalid noise level")?;

    // (level_1, level_2, level_4, baseline, features)
    type Class = (&'static str, &'static str, &'static str, (f64, f64), Vec<(f64, f64, f64)>);
    let classes: Vec<Class> = vec![
        (
            "pervious",
            "vegetation",
            "grass",
            (0.05, 0.1),
            vec![(850.0, 180.0, 0.4), (1650.0, 120.0, 0.2), (550.0, 30.0, 0.05)],
        ),
        (
            "pervious",
            "vegetation",
            "tree",
            (0.04, 0.08),
            vec![(900.0, 200.0, 0.35), (1700.0, 100.0, 0.15)],
        ),
        ("pervious", "npv", "litter", (0.1, 0.3), vec![(2100.0, 60.0, -0.08)]),
        (
            "pervious",
            "bare",
            "soil",
            (0.12, 0.25),
            vec![(2200.0, 30.0, -0.05), (900.0, 150.0, 0.03)],
        ),
        ("pervious", "burn", "char", (0.03, 0.02), vec![]),
        ("impervious", "urban", "roof", (0.2, 0.05), vec![(1730.0, 40.0, -0.04)]),
    ];
    let per_class = 5;

    let mut rows: Vec<f32> = Vec::with_capacity(classes.len() * per_class * wavelengths.len());
    let mut records = Vec::with_capacity(classes.len() * per_class);
    for (l1, l2, l4, baseline, features) in &classes {
        for i in 0..per_class {
            let brightness = 0.8 + 0.1 * i as f64;
            let scaled: Vec<(f64, f64, f64)> = features
                .iter()
                .map(|&(mu, sigma, amp)| (mu, sigma, amp * brightness))
                .collect();
            let base = (baseline.0 * brightness, baseline.1 * brightness);
            rows.extend(generate_spectrum(wavelengths, base, &scaled, &noise, &mut rng));

            let mut record = SpectrumRecord::new(format!("{l4}_{:03}", i + 1), *l1, *l2);
            record.level_3 = "simulated".to_string();
            record.level_4 = Some(l4.to_string());
            record.source = Some("generate_sample".to_string());
            records.push(record);
        }
    }

    let data = Array2::from_shape_vec((records.len(), wavelengths.len()), rows)
        .context("assembling spectra array")?;
    let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
    let metadata = MetadataTable::new(records.clone());
    let spectra = Spectra::new(Some(data), sensor, Some(names), Some(metadata))?;

    let (sli, hdr) = write_library(&spectra, &out_dir.join("sample_library.sli"), None, None)
        .context("writing spectral library")?;

    let csv_path = out_dir.join("sample_library.csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    println!(
        "Generated {} spectra x {} bands → {}, {}, {}",
        spectra.len(),
        spectra.band_count(),
        sli.display(),
        hdr.display(),
        csv_path.display()
    );
    Ok(())
}
