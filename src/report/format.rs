//! Formatted terminal output.
//!
//! Formatting lives here so the spectral code stays free of presentation and
//! output changes stay localized.

use crate::app::pipeline::{PreparedObservation, SliceRun};
use crate::domain::{Band, PrepConfig, RowSpan};

/// Dataset stats, preparation settings and the band table.
pub fn format_prep_summary(prepared: &PreparedObservation, config: &PrepConfig) -> String {
    let mut out = String::new();
    let stats = &prepared.raw.stats;

    out.push_str("=== specslice - observation ===\n");
    out.push_str(&format!("Input: {}\n", config.data_path.display()));
    out.push_str(&format!(
        "Rows: n={} | wave=[{:.5}, {:.5}]um | flux=[{:.4e}, {:.4e}]\n",
        stats.n_rows, stats.wave_min, stats.wave_max, stats.flux_min, stats.flux_max
    ));
    out.push_str(&format!(
        "Convolve: {} | Bin: {} | Normalized: {}\n",
        fmt_factor(config.dataconv),
        fmt_factor(config.databin),
        if prepared.normalized.is_some() { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "Total flux: {:.4e} erg/s/cm2\n",
        prepared.raw.series.total_flux_cgs()
    ));

    out.push_str("\nBands:\n");
    out.push_str(&format_band_table(&prepared.bands, prepared.spans()));
    out
}

/// One row per band: raw rows, wavelength limits and binned rows.
pub fn format_band_table(bands: &[Band], binned: &[RowSpan]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:>12} {:>10} {:>10} {:>8}\n",
            "band", "rows", "start", "end", "binned"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<12} {:-<10} {:-<10} {:-<8}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for (i, band) in bands.iter().enumerate() {
        let (start, end) = band.limits();
        let binned_rows = binned.get(i).map(RowSpan::len).unwrap_or(0);
        out.push_str(
            format!(
                "{:>4} {:>12} {:>10.5} {:>10.5} {:>8}\n",
                i,
                format!("{}-{}", band.rows.first_row(), band.rows.last_row()),
                start,
                end,
                binned_rows
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Catalog choice, grid reduction and the per-window remap.
pub fn format_slice_summary(run: &SliceRun) -> String {
    let mut out = String::new();
    out.push_str("=== specslice - model grid ===\n");
    out.push_str(&format!("Catalog: {}", run.catalog));
    if let Some((lo, hi)) = run.usable {
        out.push_str(&format!(" (default, usable {lo:.3}-{hi:.3}um)"));
    }
    out.push('\n');

    let kept = run.alignment.wavelengths.len();
    out.push_str(&format!(
        "Grid: {} -> {} points ({:.1}%)\n",
        run.full_grid_len,
        kept,
        100.0 * kept as f64 / run.full_grid_len.max(1) as f64
    ));
    if let Some(teff) = &run.teff_grid {
        out.push_str(&format!("Teff grid: {} points\n", teff.len()));
    }
    out.push_str(&format!("Observation bins on grid: {}\n", run.bins.len()));
    out.push_str(&format!(
        "Calibration offset: {}\n",
        if run.sensitivity.is_some() { "fitted" } else { "off (no slack)" }
    ));

    out.push_str("\nWindows:\n");
    out.push_str(format!("{:>4} {:>14} {:>14}\n", "band", "grid", "sliced").trim_end());
    out.push('\n');
    for ((band, window), span) in run
        .alignment
        .band_order
        .iter()
        .zip(&run.alignment.windows)
        .zip(&run.alignment.remap.offsets)
    {
        out.push_str(
            format!(
                "{:>4} {:>14} {:>14}\n",
                band,
                format!("{}..{}", window.start_index, window.end_index),
                format!("{}..{}", span.start, span.end)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_factor(v: f64) -> String {
    if v <= 1.0 { "off".to_string() } else { format!("{v}") }
}
