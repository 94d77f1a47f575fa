//! End-to-end runs of the preparation pipeline on small on-disk fixtures.

use std::path::Path;

use specslice::app::pipeline::{align_prepared, prepare_ingested, prepare_observation, rebin_model};
use specslice::data::{SynthConfig, generate_observation};
use specslice::domain::{CalibrationSlack, NormalizeConfig, PrepConfig, RowSpan, SliceConfig};
use specslice::error::PrepError;
use specslice::io::{parse_observations, write_observation_rows};
use specslice::retrieval::{EnsembleAxis, build_ensemble, run_ensemble};
use specslice::species::{Species, scattering_properties};

const NIR_HEADER: &str = "0 0 0 0 0 0 20000 0.6 0 10000.0\n";

fn prep_config(data_path: &Path, band_order: Option<Vec<usize>>) -> PrepConfig {
    PrepConfig {
        data_path: data_path.to_path_buf(),
        dataconv: 2.0,
        databin: 3.0,
        normalize: band_order.map(|band_order| NormalizeConfig { band_order }),
        export: None,
    }
}

fn write_opacity_dir(dir: &Path) {
    let gases = dir.join("gases");
    std::fs::create_dir_all(&gases).unwrap();
    std::fs::write(gases.join("h2o.nir.dat"), NIR_HEADER).unwrap();
    std::fs::write(gases.join("h2o.lores.dat"), "0 0 0 0 0 0 500 0.6 0 100.0\n").unwrap();
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[test]
fn two_band_rows_split_and_pass_through_unbinned() {
    let text = "\
# wavelo wavehi wavemid errlo errhi flux
1.0 1.1 1.05 0.1 0.1 1.0
1.1 1.2 1.15 0.1 0.1 2.0
2.0 2.1 2.05 0.1 0.1 3.0
2.1 2.2 2.15 0.1 0.1 4.0
";
    let raw = parse_observations(text).unwrap();
    let config = PrepConfig {
        data_path: "inline".into(),
        dataconv: 1.0,
        databin: 1.0,
        normalize: None,
        export: None,
    };
    let prepared = prepare_ingested(raw, &config).unwrap();

    assert_eq!(prepared.bands.len(), 2);
    assert_eq!(prepared.spans(), &[RowSpan::new(0, 2), RowSpan::new(2, 4)]);
    assert_eq!(prepared.series().flux, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(prepared.series().wavelo, vec![1.0, 1.1, 2.0, 2.1]);
}

#[test]
fn synthetic_observation_is_prepared_sliced_and_rebinned() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("obs.dat");
    let synth = SynthConfig {
        bins_per_band: 60,
        ..SynthConfig::default()
    };
    write_observation_rows(&data, &generate_observation(&synth).unwrap()).unwrap();
    write_opacity_dir(dir.path());

    // Pivot search walks bands 2, 0, 1: the inversion is at position 1, so
    // the continuum is fitted through bands 0 and 1.
    let prepared = prepare_observation(&prep_config(&data, Some(vec![2, 0, 1]))).unwrap();
    assert_eq!(prepared.raw.rows_read, 180);
    assert_eq!(prepared.series().len(), 60);
    assert_eq!(prepared.spans(), &[RowSpan::new(0, 20), RowSpan::new(20, 40), RowSpan::new(40, 60)]);

    let normalized = prepared.series();
    for span in &prepared.spans()[..2] {
        let m = mean(&normalized.flux[span.start..span.end]);
        assert!((m - 1.0).abs() < 0.15, "band mean {m} is not close to 1");
    }
    assert!(normalized.err_lo.is_none());

    let config = SliceConfig {
        prep: prep_config(&data, Some(vec![2, 0, 1])),
        opacity_dir: dir.path().to_path_buf(),
        catalog: String::new(),
        degrade: 1.0,
        slack: CalibrationSlack { min_dl: -0.01, max_dl: 0.01 },
        with_teff: true,
        export: None,
    };
    let run = align_prepared(prepared, &config).unwrap();

    assert_eq!(run.catalog, "nir");
    assert!(run.usable.is_some());
    assert_eq!(run.full_grid_len, 20000);
    assert_eq!(run.teff_grid.as_ref().map(Vec::len), Some(500));
    assert_eq!(run.alignment.windows.len(), 3);
    assert!(run.alignment.wavelengths.windows(2).all(|p| p[0] < p[1]));
    assert_eq!(run.bins.len(), run.prepared.series().len());
    assert!(run.sensitivity.is_some());

    let ones = vec![1.0; run.alignment.wavelengths.len()];
    for delta in [0.0, 5.0, -5.0] {
        let rebinned = rebin_model(&run, &ones, delta).unwrap();
        assert_eq!(rebinned.len(), 60);
        for v in rebinned {
            assert!((v - 1.0).abs() < 1e-9, "constant model rebinned to {v} at delta {delta}");
        }
    }

    assert!(matches!(rebin_model(&run, &ones[1..], 0.0), Err(PrepError::MalformedInput(_))));
}

#[test]
fn calibration_offset_needs_slack() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("obs.dat");
    let synth = SynthConfig {
        bins_per_band: 30,
        ..SynthConfig::default()
    };
    write_observation_rows(&data, &generate_observation(&synth).unwrap()).unwrap();
    write_opacity_dir(dir.path());

    let config = SliceConfig {
        prep: prep_config(&data, None),
        opacity_dir: dir.path().to_path_buf(),
        catalog: "nir".to_string(),
        degrade: 2.0,
        slack: CalibrationSlack::default(),
        with_teff: false,
        export: None,
    };
    let prepared = prepare_observation(&config.prep).unwrap();
    let run = align_prepared(prepared, &config).unwrap();

    assert!(run.usable.is_none());
    assert!(run.sensitivity.is_none());
    assert_eq!(run.full_grid_len, 10000);

    let ones = vec![1.0; run.alignment.wavelengths.len()];
    assert!(rebin_model(&run, &ones, 0.0).is_ok());
    assert!(matches!(rebin_model(&run, &ones, 1.0), Err(PrepError::InvalidRange(_))));
}

#[test]
fn missing_opacity_table_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("obs.dat");
    write_observation_rows(&data, &generate_observation(&SynthConfig::default()).unwrap()).unwrap();

    let config = SliceConfig {
        prep: prep_config(&data, None),
        opacity_dir: dir.path().join("missing"),
        catalog: String::new(),
        degrade: 1.0,
        slack: CalibrationSlack::default(),
        with_teff: false,
        export: None,
    };
    let prepared = prepare_observation(&config.prep).unwrap();
    let err = align_prepared(prepared, &config).unwrap_err();
    assert!(matches!(err, PrepError::Io { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn ensemble_rows_evaluate_in_order() {
    let axes = vec![
        EnsembleAxis::from_range(1, "logg", 4.0, 5.0, 0.5).unwrap(),
        EnsembleAxis::from_range(0, "teff", 1000.0, 1200.0, 100.0).unwrap(),
    ];
    let ensemble = build_ensemble(&[0.0, 0.0, 7.0], axes, |_| false).unwrap();
    assert_eq!(ensemble.len(), 9);

    let sums = run_ensemble(&ensemble, |row| Ok(row.iter().sum::<f64>())).unwrap();
    assert_eq!(sums[0], 1000.0 + 4.0 + 7.0);
    assert_eq!(sums[1], 1000.0 + 4.5 + 7.0);
    assert_eq!(sums[3], 1100.0 + 4.0 + 7.0);
    assert_eq!(sums[8], 1200.0 + 5.0 + 7.0);
}

#[test]
fn filler_gas_takes_the_remaining_fraction() {
    let props = scattering_properties(&["h2", "he", "h2o"], &[-1.0, -3.0]).unwrap();
    let h2 = props.species.iter().position(|s| *s == Species::H2).unwrap();
    let filler_ratio = 1.0 - 0.1 - 0.001;
    assert!((props.molecular_weight[h2] - Species::H2.molecular_weight() * filler_ratio).abs() < 1e-12);
    assert!(props.species.contains(&Species::He));
}
