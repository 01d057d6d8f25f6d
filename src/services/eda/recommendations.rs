use super::summarizer::DatasetStats;

/// Data-preparation advice, in a fixed order. The transformation hint is always present.
pub fn recommend(dataset: &DatasetStats, strong_correlations: usize) -> Vec<String> {
    let mut recommendations = Vec::new();

    if dataset.missing_values > 0 {
        recommendations.push(format!(
            "Consider handling {} missing values ({:.1}% of total data)",
            dataset.missing_values,
            dataset.missing_percentage()
        ));
    }

    if dataset.duplicate_rows > 0 {
        recommendations.push(format!(
            "Review {} duplicate rows ({:.1}% of data)",
            dataset.duplicate_rows,
            dataset.duplicate_percentage()
        ));
    }

    recommendations.push(
        "Consider applying transformations (e.g., log or square root) or feature engineering \
         to skewed numeric variables"
            .to_string(),
    );

    if strong_correlations > 0 {
        recommendations.push(
            "Review strongly correlated features to avoid multicollinearity in predictive models"
                .to_string(),
        );
    }

    recommendations
}
