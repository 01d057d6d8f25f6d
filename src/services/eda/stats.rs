//! Moment statistics, kernel density estimation and correlation over plain `f64` slices.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("need at least {needed} values, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("values have zero variance")]
    ZeroVariance,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn sample_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Adjusted Fisher-Pearson skewness. `None` below three values; zero for constant data.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    if is_constant(values) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), v| {
        let d = v - m;
        (m2 + d * d, m3 + d * d * d)
    });
    let n = n as f64;
    Some((n * (n - 1.0).sqrt() / (n - 2.0)) * (m3 / m2.powf(1.5)))
}

/// Bias-corrected excess kurtosis. `None` below four values; zero for constant data.
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 4 {
        return None;
    }
    if is_constant(values) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let (m2, m4) = values.iter().fold((0.0, 0.0), |(m2, m4), v| {
        let d2 = (v - m).powi(2);
        (m2 + d2, m4 + d2 * d2)
    });
    let n = n as f64;
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    let numerator = n * (n + 1.0) * (n - 1.0) * m4;
    let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
    Some(numerator / denominator - adj)
}

pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Gaussian kernel density estimate with Scott's rule bandwidth.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    points: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    pub fn fit(values: &[f64]) -> Result<Self, StatsError> {
        if values.len() < 2 {
            return Err(StatsError::InsufficientData {
                needed: 2,
                got: values.len(),
            });
        }
        let variance = sample_variance(values).unwrap_or(0.0);
        if variance <= 0.0 || !variance.is_finite() {
            return Err(StatsError::ZeroVariance);
        }
        let factor = (values.len() as f64).powf(-0.2);

        Ok(Self {
            points: values.to_vec(),
            bandwidth: variance.sqrt() * factor,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn density(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let norm = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * h * self.points.len() as f64);
        self.points
            .iter()
            .map(|p| {
                let z = (x - p) / h;
                (-0.5 * z * z).exp()
            })
            .sum::<f64>()
            * norm
    }

    pub fn evaluate(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&x| self.density(x)).collect()
    }
}

/// Grid locations whose density is strictly above both neighbours.
pub fn find_peaks(grid: &[f64], density: &[f64]) -> Vec<f64> {
    if density.len() < 3 {
        return Vec::new();
    }
    (1..density.len() - 1)
        .filter(|&i| density[i] > density[i - 1] && density[i] > density[i + 1])
        .filter_map(|i| grid.get(i).copied())
        .collect()
}

/// Pearson correlation over the rows where both sides are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Result<f64, StatsError> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2 {
        return Err(StatsError::InsufficientData {
            needed: 2,
            got: pairs.len(),
        });
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxy, sxx, syy) = pairs.iter().fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (x, y)| {
        let dx = x - mx;
        let dy = y - my;
        (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
    });

    if sxx == 0.0 || syy == 0.0 {
        return Err(StatsError::ZeroVariance);
    }
    Ok((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_skewness_matches_adjusted_estimator() {
        // m2 = 10, m3 = 0 for a symmetric sample
        assert!(close(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), 0.0));

        // 1,2,3,10: mean 4, deviations -3,-2,-1,6 -> m2 = 50, m3 = 180
        let expected = (4.0 * 3f64.sqrt() / 2.0) * (180.0 / 50f64.powf(1.5));
        assert!(close(skewness(&[1.0, 2.0, 3.0, 10.0]).unwrap(), expected));
        assert!(skewness(&[1.0, 2.0]).is_none());
        assert_eq!(skewness(&[4.0, 4.0, 4.0]), Some(0.0));
    }

    #[test]
    fn test_kurtosis_matches_adjusted_estimator() {
        // 1..=5: m2 = 10, m4 = 34 -> 5*6*4*34 / (3*2*100) - 3*16/6 = 6.8 - 8 = -1.2
        assert!(close(kurtosis(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), -1.2));
        assert!(kurtosis(&[1.0, 2.0, 3.0]).is_none());
        assert_eq!(kurtosis(&[2.0, 2.0, 2.0, 2.0]), Some(0.0));
    }

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(0.0, 1.0, 200);
        assert_eq!(grid.len(), 200);
        assert_eq!(grid[0], 0.0);
        assert!(close(grid[199], 1.0));
    }

    #[test]
    fn test_kde_rejects_degenerate_input() {
        assert_eq!(
            GaussianKde::fit(&[1.0]).unwrap_err(),
            StatsError::InsufficientData { needed: 2, got: 1 }
        );
        assert_eq!(GaussianKde::fit(&[3.0, 3.0, 3.0]).unwrap_err(), StatsError::ZeroVariance);
    }

    #[test]
    fn test_kde_density_integrates_to_one() {
        let kde = GaussianKde::fit(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        let grid = linspace(-20.0, 23.0, 4001);
        let step = grid[1] - grid[0];
        let area: f64 = kde.evaluate(&grid).iter().sum::<f64>() * step;
        assert!((area - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_kde_finds_two_peaks_in_bimodal_sample() {
        let mut values: Vec<f64> = (0..50).map(|i| i as f64 * 0.02).collect();
        values.extend((0..50).map(|i| 10.0 + i as f64 * 0.02));
        let kde = GaussianKde::fit(&values).unwrap();
        let grid = linspace(0.0, 10.98, 200);
        let peaks = find_peaks(&grid, &kde.evaluate(&grid));

        assert_eq!(peaks.len(), 2);
        assert!(peaks[0] < 2.0);
        assert!(peaks[1] > 9.0);
    }

    #[test]
    fn test_find_peaks_requires_strict_neighbours() {
        let grid = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let density = [0.0, 2.0, 1.0, 1.0, 3.0, 3.0];
        assert_eq!(find_peaks(&grid, &density), vec![1.0]);
    }

    #[test]
    fn test_pearson_pairwise_complete() {
        let xs = [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), None];
        let ys = [Some(2.0), Some(4.0), Some(5.0), Some(4.0), Some(5.0), Some(100.0)];
        assert!(close(pearson(&xs, &ys).unwrap(), 6.0 / 60f64.sqrt()));

        let flat = [Some(1.0), Some(1.0), Some(1.0)];
        let other = [Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(pearson(&flat, &other).unwrap_err(), StatsError::ZeroVariance);
        assert!(matches!(
            pearson(&[Some(1.0), None], &[None, Some(2.0)]),
            Err(StatsError::InsufficientData { .. })
        ));
    }
}
