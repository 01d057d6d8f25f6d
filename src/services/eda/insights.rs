use smallvec::SmallVec;

use super::stats::{self, GaussianKde, StatsError};
use super::summarizer::{percentage, CategoricalProfile, NumericProfile, Summary};
use crate::models::Insight;

pub const IQR_MULTIPLIER: f64 = 1.5;
pub const SKEW_THRESHOLD: f64 = 0.5;
pub const TAIL_KURTOSIS: f64 = 1.0;
pub const KDE_GRID_POINTS: usize = 200;
pub const TOP_CATEGORIES: usize = 3;
pub const RARE_CATEGORY_SHARE: f64 = 0.05;
pub const STRONG_CORRELATION: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct InsightOutcome {
    pub insights: Vec<Insight>,
    pub strong_correlations: usize,
}

/// A column pair whose absolute Pearson correlation exceeds the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct StrongCorrelation<'a> {
    pub left: &'a str,
    pub right: &'a str,
    pub coefficient: f64,
}

pub struct InsightEngine<'a> {
    summary: &'a Summary,
}

impl<'a> InsightEngine<'a> {
    pub fn new(summary: &'a Summary) -> Self {
        Self { summary }
    }

    pub fn run(&self) -> InsightOutcome {
        let mut insights = Vec::new();
        let total_rows = self.summary.dataset.total_rows;

        for profile in &self.summary.numeric {
            insights.extend(outlier_insight(profile, total_rows));
            insights.extend(distribution_insight(profile));
            insights.extend(multimodal_insight(profile));
        }

        for profile in &self.summary.categorical {
            insights.extend(top_categories_insight(profile, total_rows));
            insights.extend(rare_categories_insight(profile, total_rows));
        }

        let correlations = strong_correlations(&self.summary.numeric);
        insights.extend(correlations.iter().map(correlation_insight));

        insights.push(self.overall_summary(correlations.len()));

        InsightOutcome {
            insights,
            strong_correlations: correlations.len(),
        }
    }

    fn overall_summary(&self, strong_correlations: usize) -> Insight {
        let dataset = &self.summary.dataset;
        Insight::new(
            "Overall Data Summary",
            format!(
                "Analyzed {} numeric and {} categorical features across {} rows. \
                 Found {} strong correlations. Overall, {:.1}% of values are missing.",
                self.summary.numeric.len(),
                self.summary.categorical.len(),
                dataset.total_rows,
                strong_correlations,
                dataset.missing_percentage()
            ),
        )
    }
}

pub fn outlier_bounds(q1: f64, q3: f64) -> (f64, f64) {
    let iqr = q3 - q1;
    (q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr)
}

fn outlier_insight(profile: &NumericProfile, total_rows: usize) -> Option<Insight> {
    let (q1, q3) = (profile.summary.q1?, profile.summary.q3?);
    let (lower, upper) = outlier_bounds(q1, q3);
    let outliers = profile
        .values
        .iter()
        .flatten()
        .filter(|&&v| v < lower || v > upper)
        .count();

    if outliers == 0 {
        return None;
    }
    Some(Insight::new(
        format!("Outliers Detected in {}", profile.name),
        format!(
            "{} has {} potential outliers ({:.1}% of rows) outside the range [{:.2}, {:.2}].",
            profile.name,
            outliers,
            percentage(outliers, total_rows),
            lower,
            upper
        ),
    ))
}

pub fn describe_shape(skew: f64, kurtosis: f64) -> String {
    let shape = if skew.abs() < SKEW_THRESHOLD {
        "approximately normal".to_string()
    } else if skew > 0.0 {
        format!("right-skewed (skewness: {:.2})", skew)
    } else {
        format!("left-skewed (skewness: {:.2})", skew)
    };

    let tails = if kurtosis > TAIL_KURTOSIS {
        " with heavy tails"
    } else if kurtosis < -TAIL_KURTOSIS {
        " with light tails"
    } else {
        ""
    };

    format!("{}{}", shape, tails)
}

fn distribution_insight(profile: &NumericProfile) -> Option<Insight> {
    let s = &profile.summary;
    let (q1, median, q3) = (s.q1?, s.median?, s.q3?);
    let values = profile.present();
    let skew = stats::skewness(&values).unwrap_or(0.0);
    let kurtosis = stats::kurtosis(&values).unwrap_or(0.0);

    Some(Insight::new(
        format!("Distribution of {}", profile.name),
        format!(
            "{} is {}. Q1: {:.2}, Median: {:.2}, Q3: {:.2}.",
            profile.name,
            describe_shape(skew, kurtosis),
            q1,
            median,
            q3
        ),
    ))
}

pub fn density_peaks(values: &[f64]) -> Result<Vec<f64>, StatsError> {
    let kde = GaussianKde::fit(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let grid = stats::linspace(min, max, KDE_GRID_POINTS);
    Ok(stats::find_peaks(&grid, &kde.evaluate(&grid)))
}

fn multimodal_insight(profile: &NumericProfile) -> Option<Insight> {
    let peaks = match density_peaks(&profile.present()) {
        Ok(peaks) => peaks,
        Err(e) => {
            tracing::debug!("Skipping multimodality check for '{}': {}", profile.name, e);
            return None;
        }
    };

    if peaks.len() < 2 {
        return None;
    }
    let locations: Vec<String> = peaks.iter().map(|p| format!("{:.2}", p)).collect();
    Some(Insight::new(
        format!("Multiple Peaks in {}", profile.name),
        format!(
            "{} appears multimodal with {} peaks at {}.",
            profile.name,
            peaks.len(),
            locations.join(", ")
        ),
    ))
}

fn top_categories_insight(profile: &CategoricalProfile, total_rows: usize) -> Option<Insight> {
    let top: SmallVec<[String; TOP_CATEGORIES]> = profile
        .counts
        .iter()
        .take(TOP_CATEGORIES)
        .map(|(value, count)| format!("'{}' ({:.1}%)", value, percentage(*count, total_rows)))
        .collect();

    if top.is_empty() {
        return None;
    }
    Some(Insight::new(
        format!("Category Distribution in {}", profile.name),
        format!("Most frequent values in {}: {}.", profile.name, top.join(", ")),
    ))
}

fn rare_categories_insight(profile: &CategoricalProfile, total_rows: usize) -> Option<Insight> {
    if total_rows == 0 {
        return None;
    }
    let rare: Vec<usize> = profile
        .counts
        .iter()
        .map(|(_, count)| *count)
        .filter(|&count| (count as f64 / total_rows as f64) < RARE_CATEGORY_SHARE)
        .collect();

    if rare.is_empty() {
        return None;
    }
    Some(Insight::new(
        format!("Rare Categories in {}", profile.name),
        format!(
            "{} categories in {} each appear in less than 5% of rows, together accounting for {:.1}% of the data.",
            rare.len(),
            profile.name,
            percentage(rare.iter().sum(), total_rows)
        ),
    ))
}

/// Pairs scanned in `i < j` order over the numeric columns.
pub fn strong_correlations(numeric: &[NumericProfile]) -> Vec<StrongCorrelation<'_>> {
    let mut found = Vec::new();
    for (i, left) in numeric.iter().enumerate() {
        for right in &numeric[i + 1..] {
            match stats::pearson(&left.values, &right.values) {
                Ok(r) if r.abs() > STRONG_CORRELATION => found.push(StrongCorrelation {
                    left: &left.name,
                    right: &right.name,
                    coefficient: r,
                }),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("No correlation for '{}'/'{}': {}", left.name, right.name, e);
                }
            }
        }
    }
    found
}

fn correlation_insight(c: &StrongCorrelation<'_>) -> Insight {
    let (direction, relation) = if c.coefficient > 0.0 {
        ("positive", "associated with")
    } else {
        ("negative", "inversely associated with")
    };
    Insight::new(
        "Strong Correlation",
        format!(
            "{} and {} have a strong {} correlation ({:.2}): changes in {} are {} changes in {}.",
            c.left,
            c.right,
            direction,
            c.coefficient.abs(),
            c.left,
            relation,
            c.right
        ),
    )
}
