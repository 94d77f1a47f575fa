//! Opacity-grid slicing.
//!
//! The opacity tables sample wavelength far more finely than any observation,
//! and the radiative-transfer engine is expensive per grid point. We therefore
//! hand it only the grid segments that the observed bands need:
//!
//! 1. For each band, widen `[band_start, band_end]` by the calibration slack and
//!    find the smallest index window covering it, with one extra grid point on
//!    each side.
//! 2. Sort the windows by start index (bands need not arrive in wavelength order).
//! 3. Concatenate the windows into one compact wavelength array, storing grid
//!    points shared by overlapping neighbours only once.
//! 4. Record where each window starts and ends inside the compact array.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::domain::{CalibrationSlack, IndexRemap, IndexWindow, RowSpan};
use crate::error::PrepError;

/// Result of aligning a model grid to a set of bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAlignment {
    /// Windows in ascending `start_index` order.
    pub windows: Vec<IndexWindow>,
    /// `band_order[i]` is the input band index of `windows[i]`.
    pub band_order: Vec<usize>,
    pub remap: IndexRemap,
    /// The compact, strictly ascending wavelength array.
    pub wavelengths: Vec<f64>,
}

impl GridAlignment {
    /// Slice of the compact array that covers input band `band`.
    pub fn band_wavelengths(&self, band: usize) -> Option<&[f64]> {
        let pos = self.band_order.iter().position(|&b| b == band)?;
        let span = self.remap.offsets[pos];
        self.wavelengths.get(span.start..span.end)
    }
}

/// Align `grid` to `band_limits`, returning windows, remap and sliced wavelengths.
pub fn align_model_grid(
    grid: &[f64],
    band_limits: &[(f64, f64)],
    slack: CalibrationSlack,
) -> Result<GridAlignment, PrepError> {
    if band_limits.is_empty() {
        return Err(PrepError::malformed("no bands to align the model grid to"));
    }

    let mut indexed: Vec<(usize, IndexWindow)> = band_limits
        .iter()
        .enumerate()
        .map(|(band, &(start, end))| band_window(grid, start, end, slack).map(|w| (band, w)))
        .collect::<Result<_, _>>()?;
    indexed.sort_by_key(|(_, w)| w.start_index);

    let band_order: Vec<usize> = indexed.iter().map(|(band, _)| *band).collect();
    let windows: Vec<IndexWindow> = indexed.into_iter().map(|(_, w)| w).collect();

    let remap = remap_windows(&windows);
    let wavelengths = slice_wavelengths(grid, &windows);

    log::debug!(
        "sliced {} grid points down to {} across {} window(s)",
        grid.len(),
        wavelengths.len(),
        windows.len()
    );

    Ok(GridAlignment {
        windows,
        band_order,
        remap,
        wavelengths,
    })
}

/// Covering window for one band.
///
/// `start_index` is one before the first grid point above `start`, `end_index`
/// one past the first grid point above `end`. Both are clamped to the grid.
pub fn band_window(
    grid: &[f64],
    band_start: f64,
    band_end: f64,
    slack: CalibrationSlack,
) -> Result<IndexWindow, PrepError> {
    let start = band_start + slack.min_dl;
    let end = band_end + slack.max_dl;

    let first_above_start = first_above(grid, start).ok_or_else(|| {
        PrepError::InvalidRange(format!(
            "no model grid point above {start} (grid ends at {:?})",
            grid.last()
        ))
    })?;
    let first_above_end = first_above(grid, end).ok_or_else(|| {
        PrepError::InvalidRange(format!(
            "no model grid point above {end} (grid ends at {:?})",
            grid.last()
        ))
    })?;

    Ok(IndexWindow {
        start_index: first_above_start.saturating_sub(1),
        end_index: (first_above_end + 1).min(grid.len()),
    })
}

fn first_above(grid: &[f64], x: f64) -> Option<usize> {
    grid.iter().position(|&g| g > x)
}

/// Where one window lands in the compact array.
struct Placement {
    /// `[out_start, out_end)` of the whole window in the compact array.
    span: RowSpan,
    /// Grid indices this window adds that no earlier window covered.
    appended: Range<usize>,
}

/// Walk the windows (sorted by start) with one coverage cursor.
///
/// `covered_end` is the furthest grid index any earlier window reached. The
/// compact array always ends at `covered_end` and its tail is contiguous back
/// to the start of the last gap, so a window starting below `covered_end`
/// begins `covered_end - start_index` points before the end of the output.
fn place_windows(windows: &[IndexWindow]) -> Vec<Placement> {
    let mut placements = Vec::with_capacity(windows.len());
    let mut out_len = 0usize;
    let mut covered_end = 0usize;

    for window in windows {
        let (out_start, from) = if !placements.is_empty() && window.start_index < covered_end {
            (out_len - (covered_end - window.start_index), covered_end)
        } else {
            (out_len, window.start_index)
        };
        let appended = from..window.end_index.max(from);

        placements.push(Placement {
            span: RowSpan::new(out_start, out_start + window.len()),
            appended: appended.clone(),
        });
        out_len += appended.len();
        covered_end = covered_end.max(window.end_index);
    }
    placements
}

/// Output offsets of each window inside the compact array.
///
/// A window that overlaps (or sits inside) an earlier one starts inside it, so
/// the shared grid points are addressed rather than duplicated.
pub fn remap_windows(windows: &[IndexWindow]) -> IndexRemap {
    IndexRemap {
        offsets: place_windows(windows).into_iter().map(|p| p.span).collect(),
    }
}

/// Concatenate window ranges of `grid`, appending each grid point at most once.
pub fn slice_wavelengths(grid: &[f64], windows: &[IndexWindow]) -> Vec<f64> {
    let mut out = Vec::new();
    for placement in place_windows(windows) {
        out.extend_from_slice(&grid[placement.appended]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_grid(lmin: f64, n: usize, resolving: f64) -> Vec<f64> {
        (0..n).map(|i| lmin * (i as f64 / resolving).exp()).collect()
    }

    #[test]
    fn margin_rule_on_small_grid() {
        let grid = [1.0, 1.5, 2.0, 2.5, 3.0];
        let w = band_window(&grid, 1.6, 2.4, CalibrationSlack::default()).unwrap();
        // First point above 1.6 is index 2 -> 1; first above 2.4 is index 3 -> 4.
        assert_eq!(w, IndexWindow { start_index: 1, end_index: 4 });
    }

    #[test]
    fn slack_widens_the_window() {
        let grid = [1.0, 1.5, 2.0, 2.5, 3.0];
        let slack = CalibrationSlack { min_dl: -0.2, max_dl: 0.2 };
        let w = band_window(&grid, 1.6, 2.4, slack).unwrap();
        assert_eq!(w, IndexWindow { start_index: 0, end_index: 5 });
    }

    #[test]
    fn window_is_clamped_to_the_grid() {
        let grid = [1.0, 1.5, 2.0, 2.5, 3.0];
        let w = band_window(&grid, 0.5, 2.9, CalibrationSlack::default()).unwrap();
        assert_eq!(w, IndexWindow { start_index: 0, end_index: 5 });
    }

    #[test]
    fn uncovered_range_is_an_error() {
        let grid = [1.0, 1.5, 2.0];
        let err = band_window(&grid, 1.2, 2.5, CalibrationSlack::default());
        assert!(matches!(err, Err(PrepError::InvalidRange(_))));
    }

    #[test]
    fn overlapping_windows_share_grid_points() {
        let grid: Vec<f64> = (0..20).map(|i| 1.0 + 0.1 * i as f64).collect();
        let windows = [
            IndexWindow { start_index: 2, end_index: 8 },
            IndexWindow { start_index: 6, end_index: 12 },
            IndexWindow { start_index: 15, end_index: 18 },
        ];
        let remap = remap_windows(&windows);
        assert_eq!(
            remap.offsets,
            vec![RowSpan::new(0, 6), RowSpan::new(4, 10), RowSpan::new(10, 13)]
        );

        let sliced = slice_wavelengths(&grid, &windows);
        // 6 + 6 + 3 points minus the 2 shared ones.
        assert_eq!(sliced.len(), 13);
        assert!(sliced.windows(2).all(|p| p[0] < p[1]));

        // Each window's remap span reproduces its grid segment.
        for (window, span) in windows.iter().zip(&remap.offsets) {
            assert_eq!(&sliced[span.start..span.end], &grid[window.start_index..window.end_index]);
        }
    }

    #[test]
    fn bands_out_of_order_are_sorted_and_tracked() {
        let grid = log_grid(0.6, 4000, 2000.0);
        let limits = [(2.0, 2.2), (1.0, 1.1), (1.05, 1.3)];
        let slack = CalibrationSlack { min_dl: -0.001, max_dl: 0.001 };
        let aligned = align_model_grid(&grid, &limits, slack).unwrap();

        assert_eq!(aligned.band_order, vec![1, 2, 0]);
        assert!(aligned.windows.windows(2).all(|w| w[0].start_index <= w[1].start_index));
        assert!(aligned.wavelengths.windows(2).all(|p| p[0] < p[1]));

        let trims: usize = aligned
            .windows
            .windows(2)
            .map(|w| w[0].end_index.saturating_sub(w[1].start_index))
            .sum();
        let total: usize = aligned.windows.iter().map(IndexWindow::len).sum();
        assert_eq!(aligned.wavelengths.len(), total - trims);

        // Every band, slack included, lies inside its slice of the compact grid.
        for (band, &(lo, hi)) in limits.iter().enumerate() {
            let wl = aligned.band_wavelengths(band).unwrap();
            assert!(wl[0] <= lo + slack.min_dl);
            assert!(*wl.last().unwrap() > hi + slack.max_dl);
        }
    }

    #[test]
    fn nested_window_does_not_duplicate_or_reorder() {
        let grid: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let windows = [
            IndexWindow { start_index: 2, end_index: 20 },
            IndexWindow { start_index: 5, end_index: 10 },
            IndexWindow { start_index: 15, end_index: 25 },
        ];
        let sliced = slice_wavelengths(&grid, &windows);
        assert_eq!(sliced, (2..25).map(|i| i as f64).collect::<Vec<_>>());

        let remap = remap_windows(&windows);
        assert_eq!(
            remap.offsets,
            vec![RowSpan::new(0, 18), RowSpan::new(3, 8), RowSpan::new(13, 23)]
        );
        for (window, span) in windows.iter().zip(&remap.offsets) {
            assert_eq!(&sliced[span.start..span.end], &grid[window.start_index..window.end_index]);
        }
    }

    #[test]
    fn nested_band_recovers_its_own_segment() {
        let grid = log_grid(0.6, 4000, 2000.0);
        let limits = [(1.0, 2.0), (1.2, 1.4), (1.8, 2.5)];
        let aligned = align_model_grid(&grid, &limits, CalibrationSlack::default()).unwrap();

        for (band, &(lo, hi)) in limits.iter().enumerate() {
            let wl = aligned.band_wavelengths(band).unwrap();
            assert!(wl[0] <= lo && wl[1] > lo, "band {band} starts at {}", wl[0]);
            assert!(*wl.last().unwrap() > hi, "band {band} ends at {}", wl.last().unwrap());
            assert!(wl.windows(2).all(|p| p[0] < p[1]));
        }
        let last = aligned.remap.offsets.last().unwrap();
        assert_eq!(last.end, aligned.wavelengths.len());
    }
}
