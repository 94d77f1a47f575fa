//! Retrieval setup helpers.
//!
//! Small, pure functions that turn run settings into the values the sampler and
//! the radiative-transfer engine are configured with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{CalibrationSlack, RetrievalParameter};
use crate::error::PrepError;
use crate::retrieval::tp;

/// Bounds of the `deltaL` parameter are in nanometres; slack is in microns.
const DELTA_L_TO_MICRONS: f64 = 0.001;

/// Boundary between the near- and mid-infrared catalogs (microns).
const NIR_MIR_SPLIT: f64 = 5.0;
const CATALOG_MIN_WAVELENGTH: f64 = 0.6;
const CATALOG_MAX_WAVELENGTH: f64 = 30.0;

/// One parsec in Earth radii.
pub const PARSEC_IN_REARTH: f64 = 4.838e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampler {
    Emcee,
    Dynesty,
}

impl FromStr for Sampler {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emcee" => Ok(Sampler::Emcee),
            "dynesty" => Ok(Sampler::Dynesty),
            other => Err(PrepError::UnsupportedSampler(other.to_string())),
        }
    }
}

/// Number of walkers for `sampler` with `ndim` free parameters.
///
/// `requested == 0` asks for the default of `8 * ndim`. emcee needs at least
/// `2 * ndim` walkers and an even count; dynesty runs a single live-point set.
/// `override_run` ignores everything else and returns the minimum `2 * ndim + 2`.
pub fn walker_count(sampler: &str, ndim: usize, requested: usize, override_run: bool) -> Result<usize, PrepError> {
    if override_run {
        return Ok(2 * ndim + 2);
    }
    match sampler.parse::<Sampler>()? {
        Sampler::Emcee => {
            let mut n = if requested == 0 { 8 * ndim } else { requested };
            if n < 2 * ndim {
                n = 2 * ndim + 2;
            }
            if n % 2 == 1 {
                n += 1;
            }
            Ok(n)
        }
        Sampler::Dynesty => Ok(1),
    }
}

/// Sampler settings that a quick check run replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerSettings {
    pub parallel: bool,
    pub printfull: bool,
    pub nsteps: usize,
    /// Requested walkers; 0 picks the sampler default.
    pub nwalkers: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            printfull: false,
            nsteps: 30_000,
            nwalkers: 0,
        }
    }
}

/// Replacement values for an override (smoke-test) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerOverrides {
    pub parallel: bool,
    pub printfull: bool,
    pub nsteps: usize,
}

impl Default for SamplerOverrides {
    fn default() -> Self {
        Self {
            parallel: false,
            printfull: true,
            nsteps: 2,
        }
    }
}

impl SamplerOverrides {
    pub fn apply(&self, settings: SamplerSettings) -> SamplerSettings {
        SamplerSettings {
            parallel: self.parallel,
            printfull: self.printfull,
            nsteps: self.nsteps,
            ..settings
        }
    }
}

/// Wavelength-calibration slack from the optional `deltaL` parameter.
pub fn calibration_slack(delta_l: Option<&RetrievalParameter>) -> CalibrationSlack {
    match delta_l {
        Some(p) => CalibrationSlack {
            min_dl: p.bounds.0 * DELTA_L_TO_MICRONS,
            max_dl: p.bounds.1 * DELTA_L_TO_MICRONS,
        },
        None => CalibrationSlack::default(),
    }
}

/// Overall wavelength extent of the data, widened by the calibration slack.
pub fn data_wavelength_limits(
    wavelo: &[f64],
    wavehi: &[f64],
    slack: CalibrationSlack,
) -> Result<(f64, f64), PrepError> {
    if wavelo.is_empty() || wavehi.is_empty() {
        return Err(PrepError::malformed("no wavelength bins to take limits of"));
    }
    // TODO: the retrieval driver took max(wavelo) and min(wavehi) here, which
    // gives the innermost bin rather than the extent; confirm which one the
    // opacity table selection expects before matching it.
    let lo = wavelo.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = wavehi.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok((lo + slack.min_dl, hi + slack.max_dl))
}

/// Radius (Earth radii) from a log10 area ratio and a distance in parsecs.
pub fn area_ratio_to_radius(area_ratio: f64, dist: f64) -> f64 {
    10f64.powf(area_ratio) * dist.powi(2) * PARSEC_IN_REARTH.powi(2)
}

/// Re-express a `logf` area-ratio parameter as a `Rad` parameter.
///
/// Value, guess, prior mean and bounds are converted directly. The log-space
/// width `sigma` becomes `guess * (10^sigma - 1) * mu` in radius units.
pub fn area_parameter_to_radius_parameter(param: &RetrievalParameter, dist: f64) -> RetrievalParameter {
    let guess = area_ratio_to_radius(param.guess, dist);
    let mu = area_ratio_to_radius(param.mu, dist);
    RetrievalParameter {
        name: "Rad".to_string(),
        value: area_ratio_to_radius(param.value, dist),
        guess,
        mu,
        sigma: guess * (10f64.powf(param.sigma) - 1.0) * mu,
        bounds: (
            area_ratio_to_radius(param.bounds.0, dist),
            area_ratio_to_radius(param.bounds.1, dist),
        ),
    }
}

/// Default high-resolution opacity catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultCatalog {
    Nir,
    Wide,
    Mir,
}

impl DefaultCatalog {
    pub fn name(self) -> &'static str {
        match self {
            DefaultCatalog::Nir => "nir",
            DefaultCatalog::Wide => "wide",
            DefaultCatalog::Mir => "mir",
        }
    }
}

impl fmt::Display for DefaultCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A default catalog and the part of the requested range it can model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalogChoice {
    pub catalog: DefaultCatalog,
    pub usable: (f64, f64),
}

/// Choose the default catalog covering `[wavei, wavef]` microns.
///
/// The usable range is clamped to what the catalogs tabulate (0.6 to 30 µm).
pub fn select_default_opacity_table(wavei: f64, wavef: f64) -> Result<CatalogChoice, PrepError> {
    let lo = wavei.max(CATALOG_MIN_WAVELENGTH);
    let hi = wavef.min(CATALOG_MAX_WAVELENGTH);

    let choice = if wavei < NIR_MIR_SPLIT && wavef < NIR_MIR_SPLIT {
        CatalogChoice {
            catalog: DefaultCatalog::Nir,
            usable: (lo, wavef),
        }
    } else if wavei < NIR_MIR_SPLIT && wavef > NIR_MIR_SPLIT {
        CatalogChoice {
            catalog: DefaultCatalog::Wide,
            usable: (lo, hi),
        }
    } else if wavei > NIR_MIR_SPLIT && wavef > NIR_MIR_SPLIT {
        CatalogChoice {
            catalog: DefaultCatalog::Mir,
            usable: (wavei, hi),
        }
    } else {
        return Err(PrepError::InvalidRange(format!(
            "no default opacity table covers {wavei}-{wavef} um"
        )));
    };

    if choice.usable != (wavei, wavef) {
        log::warn!(
            "data range {wavei}-{wavef} um clipped to {}-{} um by the {} tables",
            choice.usable.0,
            choice.usable.1,
            choice.catalog
        );
    }
    Ok(choice)
}

/// Layer pressures from `max_p` down to `min_p` (log10 bar), evenly spaced.
pub fn pressure_grid(layers: usize, min_p: f64, max_p: f64) -> Result<Vec<f64>, PrepError> {
    if layers < 2 {
        return Err(PrepError::malformed(format!(
            "pressure grid needs at least 2 layers, got {layers}"
        )));
    }
    let denom = (layers - 1) as f64;
    Ok((0..layers)
        .map(|i| max_p + (min_p - max_p) * i as f64 / denom)
        .collect())
}

/// Engine switch for the T-P parameterization.
///
/// Layered profiles (including every registered model) are 0, the
/// parametric profile is 1.
pub fn tp_model_index(atmtype: &str) -> Result<u8, PrepError> {
    if atmtype == "Layers" || tp::find_model(atmtype).is_some() {
        Ok(0)
    } else if atmtype == "Parametric" {
        Ok(1)
    } else {
        Err(PrepError::UnknownModel(atmtype.to_string()))
    }
}

/// Parameters the sampler varies (non-zero prior width).
pub fn free_parameters(params: &[RetrievalParameter]) -> Vec<&RetrievalParameter> {
    params.iter().filter(|p| p.sigma > 0.0).collect()
}

/// File-name stem for retrieval outputs.
///
/// Short names are `/{name}.`; long ones also record mode, parameter count and
/// thousands of steps, e.g. `/example.Resolved.12params30k.`.
pub fn output_file_stem(short: bool, name: &str, mode: &str, n_params: usize, nsteps: usize) -> String {
    if short {
        format!("/{name}.")
    } else {
        format!("/{name}.{mode}.{n_params}params{}k.", nsteps / 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, sigma: f64, bounds: (f64, f64)) -> RetrievalParameter {
        RetrievalParameter {
            name: name.to_string(),
            value: 0.0,
            guess: 0.0,
            mu: 0.0,
            sigma,
            bounds,
        }
    }

    #[test]
    fn emcee_walker_rules() {
        assert_eq!(walker_count("emcee", 5, 0, false).unwrap(), 40);
        assert_eq!(walker_count("emcee", 5, 7, false).unwrap(), 12);
        assert_eq!(walker_count("emcee", 5, 13, false).unwrap(), 14);
        assert_eq!(walker_count("emcee", 5, 20, false).unwrap(), 20);
    }

    #[test]
    fn dynesty_and_override() {
        assert_eq!(walker_count("dynesty", 5, 100, false).unwrap(), 1);
        assert_eq!(walker_count("anything", 5, 100, true).unwrap(), 12);
        assert!(matches!(
            walker_count("zeus", 5, 0, false),
            Err(PrepError::UnsupportedSampler(ref s)) if s == "zeus"
        ));
    }

    #[test]
    fn overrides_replace_run_settings() {
        let s = SamplerOverrides::default().apply(SamplerSettings::default());
        assert_eq!(
            s,
            SamplerSettings {
                parallel: false,
                printfull: true,
                nsteps: 2,
                nwalkers: 0,
            }
        );
    }

    #[test]
    fn slack_scales_delta_l_bounds() {
        let p = param("deltaL", 1.0, (-10.0, 10.0));
        let slack = calibration_slack(Some(&p));
        assert!((slack.min_dl + 0.01).abs() < 1e-15);
        assert!((slack.max_dl - 0.01).abs() < 1e-15);
        assert_eq!(calibration_slack(None), CalibrationSlack::default());
    }

    #[test]
    fn limits_span_all_bins() {
        let slack = CalibrationSlack {
            min_dl: -0.01,
            max_dl: 0.02,
        };
        let (lo, hi) = data_wavelength_limits(&[1.2, 1.0, 2.0], &[1.3, 1.1, 2.1], slack).unwrap();
        assert!((lo - 0.99).abs() < 1e-12);
        assert!((hi - 2.12).abs() < 1e-12);
    }

    #[test]
    fn default_catalogs() {
        let nir = select_default_opacity_table(0.5, 2.5).unwrap();
        assert_eq!(nir.catalog, DefaultCatalog::Nir);
        assert_eq!(nir.usable, (0.6, 2.5));

        let wide = select_default_opacity_table(1.0, 40.0).unwrap();
        assert_eq!(wide.catalog, DefaultCatalog::Wide);
        assert_eq!(wide.usable, (1.0, 30.0));

        let mir = select_default_opacity_table(6.0, 12.0).unwrap();
        assert_eq!(mir.catalog, DefaultCatalog::Mir);
        assert_eq!(mir.usable, (6.0, 12.0));

        assert!(matches!(
            select_default_opacity_table(5.0, 12.0),
            Err(PrepError::InvalidRange(_))
        ));
    }

    #[test]
    fn pressure_grid_runs_from_max_to_min() {
        let p = pressure_grid(5, 0.0, 8.0).unwrap();
        assert_eq!(p, vec![8.0, 6.0, 4.0, 2.0, 0.0]);
        assert!(pressure_grid(1, 0.0, 8.0).is_err());
    }

    #[test]
    fn tp_indices() {
        assert_eq!(tp_model_index("Layers").unwrap(), 0);
        assert_eq!(tp_model_index("gray").unwrap(), 0);
        assert_eq!(tp_model_index("Parametric").unwrap(), 1);
        assert!(matches!(tp_model_index("Spline"), Err(PrepError::UnknownModel(_))));
    }

    #[test]
    fn free_parameters_have_positive_sigma() {
        let params = [param("a", 0.0, (0.0, 1.0)), param("b", 0.1, (0.0, 1.0))];
        let free = free_parameters(&params);
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].name, "b");
    }

    #[test]
    fn output_stems() {
        assert_eq!(output_file_stem(true, "example", "Resolved", 12, 30000), "/example.");
        assert_eq!(
            output_file_stem(false, "example", "Resolved", 12, 30000),
            "/example.Resolved.12params30k."
        );
    }

    #[test]
    fn area_ratio_scales_with_distance_squared() {
        assert!((area_ratio_to_radius(0.0, 1.0) - PARSEC_IN_REARTH.powi(2)).abs() < 1.0);
        let near = area_ratio_to_radius(-20.0, 10.0);
        let far = area_ratio_to_radius(-20.0, 20.0);
        assert!((far / near - 4.0).abs() < 1e-12);
        assert!((area_ratio_to_radius(-19.0, 10.0) / near - 10.0).abs() < 1e-12);
    }

    #[test]
    fn area_parameter_converts_every_field() {
        let logf = RetrievalParameter {
            name: "logf".to_string(),
            value: -20.0,
            guess: -20.0,
            mu: -20.5,
            sigma: 0.1,
            bounds: (-22.0, -18.0),
        };
        let dist = 10.0;
        let rad = area_parameter_to_radius_parameter(&logf, dist);
        let guess = area_ratio_to_radius(-20.0, dist);
        let mu = area_ratio_to_radius(-20.5, dist);

        assert_eq!(rad.name, "Rad");
        assert_eq!(rad.value, guess);
        assert_eq!(rad.guess, guess);
        assert_eq!(rad.mu, mu);
        assert!((rad.sigma - guess * (10f64.powf(0.1) - 1.0) * mu).abs() <= 1e-12 * rad.sigma.abs());
        assert_eq!(rad.bounds.0, area_ratio_to_radius(-22.0, dist));
        assert_eq!(rad.bounds.1, area_ratio_to_radius(-18.0, dist));
        assert!(rad.bounds.0 < rad.value && rad.value < rad.bounds.1);
    }
}
