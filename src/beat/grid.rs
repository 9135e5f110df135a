// Beat-subdivision grid
// Candidate snap points between consecutive beats, at several resolutions

/// Round a time to millisecond precision (3 decimal digits).
pub(crate) fn round_ms(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Build the flat grid of candidate snap points.
///
/// For every consecutive beat pair `(start, end)` and every division
/// count `div`, this emits `div` points `start + j * (end - start) / div`
/// for `j = 0..div`, rounded to millisecond precision. Points are
/// concatenated in generation order; that order is what breaks ties
/// during nearest-point search.
///
/// Fewer than two beat times, or an empty division list, yields an empty
/// grid. Division counts of zero contribute nothing.
pub fn build_grid(beat_times: &[f64], divisions: &[u32]) -> Vec<f64> {
    let mut grid = Vec::new();

    for pair in beat_times.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        for &div in divisions {
            if div == 0 {
                continue;
            }
            let step = (end - start) / div as f64;
            for j in 0..div {
                grid.push(round_ms(start + step * j as f64));
            }
        }
    }

    grid
}

/// Find the grid point nearest to `t`. Ties break to the earliest point
/// in generation order (strict `<` during the scan). Returns `None` on
/// an empty grid.
pub fn nearest_grid_point(grid: &[f64], t: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;

    for &g in grid {
        let distance = (g - t).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((g, distance)),
        }
    }

    best.map(|(g, _)| g)
}
