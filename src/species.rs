//! Gas species codes shared with the radiative-transfer engine.
//!
//! The engine reads opacity tables by integer species code, so the order of
//! `Species::ALL` is a wire format: codes are positions in that list. Bump
//! `SPECIES_TABLE_VERSION` whenever the list changes and check the engine's
//! copy with `check_engine_table` at the boundary.

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Version of the species code table.
pub const SPECIES_TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    H2,
    H2Only,
    He,
    HMinus,
    H2O,
    CH4,
    CO,
    CO2,
    NH3,
    H2S,
    BurrowsAlk,
    LupuAlk,
    Na,
    K,
    CrH,
    FeH,
    TiO,
    VO,
    HCN,
    N2,
    PH3,
}

impl Species {
    /// Every species, in code order.
    pub const ALL: [Species; 21] = [
        Species::H2,
        Species::H2Only,
        Species::He,
        Species::HMinus,
        Species::H2O,
        Species::CH4,
        Species::CO,
        Species::CO2,
        Species::NH3,
        Species::H2S,
        Species::BurrowsAlk,
        Species::LupuAlk,
        Species::Na,
        Species::K,
        Species::CrH,
        Species::FeH,
        Species::TiO,
        Species::VO,
        Species::HCN,
        Species::N2,
        Species::PH3,
    ];

    /// Integer code understood by the engine.
    pub fn code(self) -> usize {
        self as usize
    }

    /// Name used in opacity table file names and configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Species::H2 => "h2",
            Species::H2Only => "h2only",
            Species::He => "he",
            Species::HMinus => "h-",
            Species::H2O => "h2o",
            Species::CH4 => "ch4",
            Species::CO => "co",
            Species::CO2 => "co2",
            Species::NH3 => "nh3",
            Species::H2S => "h2s",
            Species::BurrowsAlk => "Burrows_alk",
            Species::LupuAlk => "Lupu_alk",
            Species::Na => "na",
            Species::K => "k",
            Species::CrH => "crh",
            Species::FeH => "feh",
            Species::TiO => "tio",
            Species::VO => "vo",
            Species::HCN => "hcn",
            Species::N2 => "n2",
            Species::PH3 => "ph3",
        }
    }

    pub fn from_name(name: &str) -> Result<Species, PrepError> {
        Species::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .ok_or_else(|| PrepError::UnknownSpecies(name.to_string()))
    }

    /// Mean molecular weight (amu).
    pub fn molecular_weight(self) -> f64 {
        match self {
            Species::H2 => 2.28,
            Species::H2Only => 2.00,
            Species::He => 4.00,
            Species::HMinus => 1.00,
            Species::H2O => 18.0,
            Species::CH4 => 16.0,
            Species::CO => 28.0,
            Species::CO2 => 44.0,
            Species::NH3 => 17.0,
            Species::H2S => 34.1,
            Species::BurrowsAlk | Species::LupuAlk => 24.1,
            Species::Na => 23.0,
            Species::K => 39.1,
            Species::CrH => 53.0,
            Species::FeH => 56.8,
            Species::TiO => 63.9,
            Species::VO => 66.9,
            Species::HCN => 27.0,
            Species::N2 => 28.0,
            Species::PH3 => 34.0,
        }
    }

    /// Rayleigh scattering cross-section (cm²), where one is tabulated.
    ///
    /// `h2` is the H2+He mixture. H-, CrH, TiO and VO are model estimates and
    /// FeH reuses the CrH value. Atomic Na and K have no entry.
    pub fn scattering_cross_section(self) -> Option<f64> {
        let v = match self {
            Species::H2 => 0.672e-27,
            Species::H2Only => 0.605e-27,
            Species::He => 0.047e-27,
            Species::HMinus => 19.36e-27,
            Species::H2O => 2.454e-27,
            Species::CH4 => 6.50e-27,
            Species::CO => 4.14e-27,
            Species::CO2 => 6.82e-27,
            Species::NH3 => 4.80e-27,
            Species::H2S => 14.36e-27,
            Species::BurrowsAlk | Species::LupuAlk => 718.9e-27,
            Species::CrH | Species::FeH => 84.0e-27,
            Species::TiO => 183.3e-27,
            Species::VO => 131.3e-27,
            Species::HCN => 7.32e-27,
            Species::N2 => 3.18e-27,
            Species::PH3 => 19.55e-27,
            Species::Na | Species::K => return None,
        };
        Some(v)
    }
}

/// Engine codes for a list of species names.
pub fn species_codes(names: &[&str]) -> Result<Vec<usize>, PrepError> {
    names
        .iter()
        .map(|name| Species::from_name(name).map(Species::code))
        .collect()
}

/// Verify that the engine's species table matches ours.
///
/// `engine_names[i]` is the name the engine associates with code `i`.
pub fn check_engine_table(engine_version: u32, engine_names: &[&str]) -> Result<(), PrepError> {
    if engine_version != SPECIES_TABLE_VERSION {
        return Err(PrepError::malformed(format!(
            "species table version mismatch: engine has {engine_version}, expected {SPECIES_TABLE_VERSION}"
        )));
    }
    if engine_names.len() != Species::ALL.len() {
        return Err(PrepError::malformed(format!(
            "engine species table has {} entries, expected {}",
            engine_names.len(),
            Species::ALL.len()
        )));
    }
    for (code, (theirs, ours)) in engine_names.iter().zip(Species::ALL).enumerate() {
        if *theirs != ours.name() {
            return Err(PrepError::malformed(format!(
                "species code {code} is '{theirs}' in the engine but '{}' here",
                ours.name()
            )));
        }
    }
    Ok(())
}

/// Mixing-ratio-weighted molecular weights and scattering cross-sections.
///
/// Entries follow code order and skip species without a scattering entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatteringProperties {
    pub species: Vec<Species>,
    pub molecular_weight: Vec<f64>,
    pub cross_section: Vec<f64>,
}

/// Scattering properties of an atmosphere.
///
/// `gases[0]` is the filler gas; the rest come with log10 mixing ratios in
/// `log_abundances`. The filler takes whatever fraction remains. An unknown
/// filler falls back to `h2` with a warning.
pub fn scattering_properties(gases: &[&str], log_abundances: &[f64]) -> Result<ScatteringProperties, PrepError> {
    let Some((filler_name, others)) = gases.split_first() else {
        return Err(PrepError::malformed("no gases given for scattering properties"));
    };
    if others.len() != log_abundances.len() {
        return Err(PrepError::malformed(format!(
            "{} non-filler gases but {} abundances",
            others.len(),
            log_abundances.len()
        )));
    }

    let filler = Species::from_name(filler_name).unwrap_or_else(|_| {
        log::warn!("filler gas '{filler_name}' is not in the species table, using h2");
        Species::H2
    });

    let other_ratios: Vec<f64> = log_abundances.iter().map(|a| 10f64.powf(*a)).collect();
    let filler_ratio = 1.0 - other_ratios.iter().sum::<f64>();

    let mut mixture: Vec<(Species, f64)> = vec![(filler, filler_ratio)];
    for (name, ratio) in others.iter().zip(other_ratios) {
        mixture.push((Species::from_name(name)?, ratio));
    }

    let mut out = ScatteringProperties {
        species: Vec::new(),
        molecular_weight: Vec::new(),
        cross_section: Vec::new(),
    };
    for species in Species::ALL {
        let Some(sigma) = species.scattering_cross_section() else {
            continue;
        };
        // First listed entry wins when a species is repeated.
        if let Some((_, ratio)) = mixture.iter().find(|(s, _)| *s == species) {
            out.species.push(species);
            out.molecular_weight.push(species.molecular_weight() * ratio);
            out.cross_section.push(sigma * ratio);
        }
    }
    Ok(out)
}

/// [`scattering_properties`] with linear mixing ratios instead of log10 ones.
pub fn scattering_properties_linear(gases: &[&str], abundances: &[f64]) -> Result<ScatteringProperties, PrepError> {
    let mut log_abundances = Vec::with_capacity(abundances.len());
    for (i, a) in abundances.iter().enumerate() {
        if !(*a > 0.0) {
            return Err(PrepError::malformed(format!("abundance {i} must be positive, got {a}")));
        }
        log_abundances.push(a.log10());
    }
    scattering_properties(gases, &log_abundances)
}
