//! Temperature-pressure profile models.
//!
//! Models are looked up by name in a static registry. Each model maps a layer
//! count and its parameter vector to a temperature per layer, ordered from the
//! top of the atmosphere down.

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Temperatures per atmospheric layer (K).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpProfile {
    pub temperatures: Vec<f64>,
}

pub type TpModelFn = fn(usize, &[f64]) -> Result<TpProfile, PrepError>;

/// A registered T-P model.
#[derive(Debug, Clone, Copy)]
pub struct TpModel {
    pub name: &'static str,
    pub eval: TpModelFn,
}

impl TpModel {
    pub fn profile(&self, layers: usize, params: &[f64]) -> Result<TpProfile, PrepError> {
        (self.eval)(layers, params)
    }
}

/// Default temperature of the gray test atmosphere.
pub const DEFAULT_GRAY_TEMPERATURE: f64 = 1500.0;

pub const GRAY: TpModel = TpModel {
    name: "gray",
    eval: gray_profile,
};

pub const VERBATIM: TpModel = TpModel {
    name: "verbatim",
    eval: verbatim_profile,
};

static REGISTRY: &[TpModel] = &[GRAY, VERBATIM];

/// Names of every registered model.
pub fn model_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|m| m.name)
}

pub fn find_model(name: &str) -> Option<TpModel> {
    REGISTRY.iter().copied().find(|m| m.name == name)
}

/// Pick the T-P model for a run.
///
/// `gray` forces the gray model. Otherwise `atmtype` must name a registered
/// model; an unknown name is an error unless `verbatim_fallback` is set.
pub fn select_model(gray: bool, atmtype: &str, verbatim_fallback: bool) -> Result<TpModel, PrepError> {
    if gray {
        return Ok(GRAY);
    }
    match find_model(atmtype) {
        Some(model) => Ok(model),
        None if verbatim_fallback => {
            log::warn!("unknown T-P model '{atmtype}', interpolating the profile verbatim");
            Ok(VERBATIM)
        }
        None => Err(PrepError::UnknownModel(atmtype.to_string())),
    }
}

/// Isothermal profile at `params[0]`, or the default gray temperature.
fn gray_profile(layers: usize, params: &[f64]) -> Result<TpProfile, PrepError> {
    let t = params.first().copied().unwrap_or(DEFAULT_GRAY_TEMPERATURE);
    if !(t > 0.0) {
        return Err(PrepError::malformed(format!("gray temperature must be positive, got {t}")));
    }
    Ok(TpProfile {
        temperatures: vec![t; layers],
    })
}

/// Node temperatures linearly interpolated onto `layers` evenly spaced layers.
fn verbatim_profile(layers: usize, params: &[f64]) -> Result<TpProfile, PrepError> {
    match params.len() {
        0 => Err(PrepError::malformed("verbatim T-P profile needs at least one node")),
        1 => Ok(TpProfile {
            temperatures: vec![params[0]; layers],
        }),
        nodes => {
            let temperatures = (0..layers)
                .map(|i| {
                    let u = if layers > 1 {
                        i as f64 * (nodes - 1) as f64 / (layers - 1) as f64
                    } else {
                        0.0
                    };
                    let k = (u.floor() as usize).min(nodes - 2);
                    let f = u - k as f64;
                    params[k] * (1.0 - f) + params[k + 1] * f
                })
                .collect();
            Ok(TpProfile { temperatures })
        }
    }
}
