//! Statistics the renderers need to draw a geometry.

use std::cmp::Ordering;

/// Resolution of density and smoothing curves.
pub const CURVE_POINTS: usize = 128;

pub const DEFAULT_BINS: usize = 30;

/// Finite values only, sorted ascending.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Min and max over the finite values.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Linear-interpolated percentile of sorted data, `p` in `[0, 1]`.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Tukey box summary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let ys = sorted_finite(values);
    if ys.is_empty() {
        return None;
    }

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // whiskers reach the most extreme points inside the fences
    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);
    let outliers = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

/// Silverman's rule of thumb for bandwidth selection
pub fn silverman_bandwidth(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if n < 2.0 { return 1.0; }

    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    let sorted = sorted_finite(data);
    let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);

    // h = 0.9 * min(std, IQR/1.34) * n^(-1/5)
    let scale = if iqr > 0.0 { std_dev.min(iqr / 1.34) } else { std_dev };
    if scale <= 0.0 { return 1.0; }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Gaussian KDE on an evenly spaced grid spanning the data plus three bandwidths.
///
/// Returns `(grid, density)`; the density integrates to one.
pub fn kde(data: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let data = sorted_finite(data);
    let n = data.len() as f64;
    if data.is_empty() { return (vec![], vec![]); }

    let bandwidth = silverman_bandwidth(&data);
    let (min, max) = (data[0], data[data.len() - 1]);
    let start = min - 3.0 * bandwidth;
    let end = max + 3.0 * bandwidth;
    let step = (end - start) / (CURVE_POINTS - 1) as f64;

    let mut grid = Vec::with_capacity(CURVE_POINTS);
    let mut density = Vec::with_capacity(CURVE_POINTS);
    for i in 0..CURVE_POINTS {
        let y = start + i as f64 * step;
        let d: f64 = data.iter().map(|&xi| gaussian_kernel((y - xi) / bandwidth)).sum();
        grid.push(y);
        density.push(d / (n * bandwidth));
    }
    (grid, density)
}

/// Density scaled so its peak is 1, for violin outlines.
pub fn kde_normalized(data: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let (grid, mut density) = kde(data);
    let peak = density.iter().fold(0.0f64, |a, &b| a.max(b));
    if peak > 0.0 {
        for d in &mut density {
            *d /= peak;
        }
    }
    (grid, density)
}

/// Equal-width histogram bins.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Bin the finite values into `bins` equal-width intervals over `range`
/// (the data range when `None`). The last bin is closed.
pub fn histogram(values: &[f64], bins: usize, range: Option<(f64, f64)>) -> Vec<Bin> {
    let bins = bins.max(1);
    let Some((min, max)) = range.or_else(|| min_max(values)) else {
        return Vec::new();
    };
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            start: min + i as f64 * width,
            end: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for v in values.iter().copied().filter(|v| v.is_finite()) {
        if v < min || v > max {
            continue;
        }
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Least-squares line through the points; `None` when x has no spread.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let pts: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pts.len() < 2 {
        return None;
    }

    let n = pts.len() as f64;
    let sum_x: f64 = pts.iter().map(|p| p.0).sum();
    let sum_y: f64 = pts.iter().map(|p| p.1).sum();
    let sum_xx: f64 = pts.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = pts.iter().map(|p| p.0 * p.1).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((slope, intercept))
}

/// Default loess neighbourhood.
pub const DEFAULT_SPAN: f64 = 0.75;

/// Locally weighted linear regression with a tricube kernel, evaluated on a grid.
pub fn loess(xs: &[f64], ys: &[f64], span: f64) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pts.len() < 3 {
        return pts;
    }
    pts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let n = pts.len();
    let k = ((span * n as f64).ceil() as usize).clamp(3, n);
    let (lo, hi) = (pts[0].0, pts[n - 1].0);
    if hi <= lo {
        return pts;
    }

    let step = (hi - lo) / (CURVE_POINTS - 1) as f64;
    (0..CURVE_POINTS)
        .map(|i| {
            let x0 = lo + i as f64 * step;
            (x0, local_fit(&pts, x0, k))
        })
        .collect()
}

fn local_fit(pts: &[(f64, f64)], x0: f64, k: usize) -> f64 {
    let mut dists: Vec<f64> = pts.iter().map(|p| (p.0 - x0).abs()).collect();
    dists.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let radius = dists[k - 1].max(f64::EPSILON) * 1.000_001;

    let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for &(x, y) in pts {
        let u = (x - x0).abs() / radius;
        if u >= 1.0 {
            continue;
        }
        let w = (1.0 - u * u * u).powi(3);
        sw += w;
        swx += w * x;
        swy += w * y;
        swxx += w * x * x;
        swxy += w * x * y;
    }
    if sw <= 0.0 {
        return f64::NAN;
    }

    let denom = sw * swxx - swx * swx;
    if denom.abs() < 1e-12 {
        return swy / sw;
    }
    let slope = (sw * swxy - swx * swy) / denom;
    let intercept = (swy - slope * swx) / sw;
    intercept + slope * x0
}

/// Pad a range by 5% on each side; a degenerate range is widened by one unit.
pub fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 0.5), 2.5);
        assert_eq!(percentile(&data, 1.0), 4.0);
    }

    #[test]
    fn test_box_stats_outlier() {
        let stats = box_stats(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        assert_eq!(stats.median, 3.5);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.lower_whisker, 1.0);
    }

    #[test]
    fn test_box_stats_empty() {
        assert!(box_stats(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let data: Vec<f64> = (0..50).map(|i| (i % 10) as f64).collect();
        let (grid, density) = kde(&data);
        assert_eq!(grid.len(), CURVE_POINTS);
        let step = grid[1] - grid[0];
        let area: f64 = density.iter().sum::<f64>() * step;
        assert!((area - 1.0).abs() < 0.05, "area was {}", area);
    }

    #[test]
    fn test_kde_normalized_peak() {
        let (_, density) = kde_normalized(&[1.0, 2.0, 2.5, 3.0]);
        let peak = density.iter().fold(0.0f64, |a, &b| a.max(b));
        assert!((peak - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_counts_all_values() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let bins = histogram(&values, 5, None);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[4].count, 3);
    }

    #[test]
    fn test_histogram_single_value() {
        let bins = histogram(&[2.0, 2.0], 3, None);
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn test_linear_fit() {
        let (slope, intercept) = linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
        assert!(linear_fit(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_loess_recovers_line() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x + 2.0).collect();
        let curve = loess(&xs, &ys, DEFAULT_SPAN);
        assert_eq!(curve.len(), CURVE_POINTS);
        for (x, y) in curve {
            assert!((y - (3.0 * x + 2.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_pad_range() {
        assert_eq!(pad_range(0.0, 10.0), (-0.5, 10.5));
        assert_eq!(pad_range(3.0, 3.0), (2.0, 4.0));
    }
}
