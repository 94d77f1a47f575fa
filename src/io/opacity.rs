//! Opacity-table headers.
//!
//! Only the first line of a table is read here; the tables themselves are
//! consumed by the radiative-transfer engine. Header fields (whitespace
//! separated, zero-based):
//!
//! - 6: number of wavelength points
//! - 7: minimum wavelength (microns)
//! - 9: resolving power
//!
//! The table samples wavelength logarithmically, so the grid is rebuilt as
//! `lmin * exp(i * degrade / R)`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Species whose table header defines the model wavelength grid.
pub const FIDUCIAL_SPECIES: &str = "h2o";

/// Low-resolution catalog used for the effective-temperature grid.
pub const TEFF_CATALOG: &str = "lores";

const FIELD_COUNT: usize = 6;
const FIELD_LMIN: usize = 7;
const FIELD_RESOLVING_POWER: usize = 9;

/// Grid description parsed from a table header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpacityHeader {
    pub n_points: usize,
    pub lmin: f64,
    pub resolving_power: f64,
}

impl OpacityHeader {
    /// Wavelength grid at `degrade` times coarser sampling.
    ///
    /// Length is `floor(n_points / degrade)`.
    pub fn wavelengths(&self, degrade: f64) -> Result<Vec<f64>, PrepError> {
        if !(degrade > 0.0 && degrade.is_finite()) {
            return Err(PrepError::malformed(format!(
                "degrade factor must be positive, got {degrade}"
            )));
        }
        let len = (self.n_points as f64 / degrade).floor() as usize;
        let step = degrade / self.resolving_power;
        Ok((0..len).map(|i| self.lmin * (i as f64 * step).exp()).collect())
    }
}

/// `{dir}/gases/{species}.{catalog}.dat`
pub fn table_path(opacity_dir: &Path, species: &str, catalog: &str) -> PathBuf {
    opacity_dir.join("gases").join(format!("{species}.{catalog}.dat"))
}

/// Parse the header line of an opacity table.
pub fn parse_header(line: &str) -> Result<OpacityHeader, PrepError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() <= FIELD_RESOLVING_POWER {
        return Err(PrepError::malformed(format!(
            "opacity header has {} fields, need at least {}",
            fields.len(),
            FIELD_RESOLVING_POWER + 1
        )));
    }

    let n_points: usize = fields[FIELD_COUNT].parse().map_err(|_| {
        PrepError::malformed(format!("invalid point count '{}' in opacity header", fields[FIELD_COUNT]))
    })?;
    let lmin = parse_positive(fields[FIELD_LMIN], "minimum wavelength")?;
    let resolving_power = parse_positive(fields[FIELD_RESOLVING_POWER], "resolving power")?;

    Ok(OpacityHeader {
        n_points,
        lmin,
        resolving_power,
    })
}

fn parse_positive(raw: &str, name: &str) -> Result<f64, PrepError> {
    match raw.parse::<f64>() {
        Ok(v) if v > 0.0 && v.is_finite() => Ok(v),
        _ => Err(PrepError::malformed(format!("invalid {name} '{raw}' in opacity header"))),
    }
}

/// Read the header of `path`.
pub fn read_header(path: &Path) -> Result<OpacityHeader, PrepError> {
    let file = File::open(path).map_err(|e| PrepError::io(path, e))?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|e| PrepError::io(path, e))?;
    parse_header(&first)
}

/// Full-resolution model wavelengths for `catalog`, degraded by `degrade`.
pub fn model_wavelengths(opacity_dir: &Path, catalog: &str, degrade: f64) -> Result<Vec<f64>, PrepError> {
    let path = table_path(opacity_dir, FIDUCIAL_SPECIES, catalog);
    let header = read_header(&path)?;
    log::debug!(
        "opacity header {}: {} points from {} um at R={}",
        path.display(),
        header.n_points,
        header.lmin,
        header.resolving_power
    );
    header.wavelengths(degrade)
}

/// Wavelengths used for the effective-temperature integration.
pub fn teff_wavelengths(opacity_dir: &Path) -> Result<Vec<f64>, PrepError> {
    model_wavelengths(opacity_dir, TEFF_CATALOG, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "18 1.0e-6 1.0e3 36 75.0 4000.0 21205 0.6 5.0 10000.0\n";

    #[test]
    fn parses_header_fields() {
        let h = parse_header(HEADER).unwrap();
        assert_eq!(h.n_points, 21205);
        assert_eq!(h.lmin, 0.6);
        assert_eq!(h.resolving_power, 10000.0);
    }

    #[test]
    fn degraded_grid_is_logarithmic() {
        let h = OpacityHeader {
            n_points: 10,
            lmin: 1.0,
            resolving_power: 100.0,
        };
        let g = h.wavelengths(3.0).unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g[0], 1.0);
        assert!((g[2] - (0.06f64).exp()).abs() < 1e-12);
        assert!((g[1] / g[0] - g[2] / g[1]).abs() < 1e-12);
    }

    #[test]
    fn short_header_is_rejected() {
        assert!(matches!(
            parse_header("1 2 3 4 5 6 7"),
            Err(PrepError::MalformedInput(_))
        ));
    }

    #[test]
    fn table_path_layout() {
        let p = table_path(Path::new("/opac"), "h2o", "nir");
        assert_eq!(p, PathBuf::from("/opac/gases/h2o.nir.dat"));
    }

    #[test]
    fn reads_teff_grid_from_lores_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("gases")).unwrap();
        std::fs::write(
            dir.path().join("gases").join("h2o.lores.dat"),
            "0 0 0 0 0 0 5 0.6 0 200.0\n1 2 3\n",
        )
        .unwrap();
        let g = teff_wavelengths(dir.path()).unwrap();
        assert_eq!(g.len(), 5);
        assert_eq!(g[0], 0.6);

        assert!(matches!(
            model_wavelengths(dir.path(), "nir", 1.0),
            Err(PrepError::Io { .. })
        ));
    }
}
