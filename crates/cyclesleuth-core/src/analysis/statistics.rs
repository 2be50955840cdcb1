//! Descriptive statistics and flagged iterations for one series.
//!
//! Outliers use the boxplot rule: strictly below `Q1 - 1.5 * IQR` or
//! strictly above `Q3 + 1.5 * IQR`. Positions in the input slice map to
//! iteration indices (`position + 1`).
use super::percentiles::percentile_sorted;
use crate::model::{IndexTag, IterationIndex, Role, WorkstationId};

/// Width of the IQR fences.
pub const FENCE_FACTOR: f64 = 1.5;

/// A flagged iteration and its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlier {
    pub index: IterationIndex,
    pub value: f64,
}

/// Summary of one workstation's restore times.
///
/// Derived and immutable. An empty input gives the `Default` summary:
/// zero counts, zeroed figures and no flagged iterations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub range: f64,
    /// In iteration order, not magnitude order.
    pub outliers: Vec<Outlier>,
    /// Iteration whose value is closest to `median`; earliest on ties.
    pub median_index: Option<IterationIndex>,
    /// Every iteration equal to `min`.
    pub min_indices: Vec<IterationIndex>,
    /// Every iteration equal to `max`.
    pub max_indices: Vec<IterationIndex>,
}

impl StatisticsSummary {
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        let median = percentile_sorted(&sorted, 50.0);
        let q1 = percentile_sorted(&sorted, 25.0);
        let q3 = percentile_sorted(&sorted, 75.0);
        let iqr = q3 - q1;
        let lower_bound = q1 - FENCE_FACTOR * iqr;
        let upper_bound = q3 + FENCE_FACTOR * iqr;
        let min = sorted[0];
        let max = sorted[count - 1];

        Self {
            count,
            mean,
            median,
            q1,
            q3,
            iqr,
            lower_bound,
            upper_bound,
            min,
            max,
            std_dev: variance.sqrt(),
            range: max - min,
            outliers: find_outliers(values, lower_bound, upper_bound),
            median_index: closest_index(values, median),
            min_indices: indices_equal_to(values, min),
            max_indices: indices_equal_to(values, max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn outlier_indices(&self) -> Vec<IterationIndex> {
        self.outliers.iter().map(|o| o.index).collect()
    }

    /// Index-store tags for this summary: median, then abnormal, min, max.
    pub fn tags(&self, workstation: &WorkstationId) -> Vec<IndexTag> {
        let tag = |role, index| IndexTag::new(workstation.clone(), role, index);
        let mut tags = Vec::new();
        if let Some(idx) = self.median_index {
            tags.push(tag(Role::Median, idx));
        }
        tags.extend(self.outliers.iter().map(|o| tag(Role::Abnormal, o.index)));
        tags.extend(self.min_indices.iter().map(|&i| tag(Role::Min, i)));
        tags.extend(self.max_indices.iter().map(|&i| tag(Role::Max, i)));
        tags
    }

    /// Free-text remark listing the extreme iterations, e.g.
    /// `Min at loops: 2; Max at loops: 5, 9`.
    pub fn remark(&self) -> String {
        let join = |idx: &[IterationIndex]| {
            idx.iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut parts = Vec::new();
        if !self.min_indices.is_empty() {
            parts.push(format!("Min at loops: {}", join(&self.min_indices)));
        }
        if !self.max_indices.is_empty() {
            parts.push(format!("Max at loops: {}", join(&self.max_indices)));
        }
        parts.join("; ")
    }
}

/// Values strictly outside `[lower, upper]`, in iteration order.
pub fn find_outliers(values: &[f64], lower: f64, upper: f64) -> Vec<Outlier> {
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v < lower || v > upper)
        .map(|(pos, &value)| Outlier {
            index: IterationIndex::from_position(pos),
            value,
        })
        .collect()
}

/// Iteration with the smallest `|value - target|`.
///
/// The scan uses a strict `<`, so the earliest iteration wins a tie.
pub fn closest_index(values: &[f64], target: f64) -> Option<IterationIndex> {
    let mut best: Option<(usize, f64)> = None;
    for (pos, &v) in values.iter().enumerate() {
        let diff = (v - target).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((pos, diff)),
        }
    }
    best.map(|(pos, _)| IterationIndex::from_position(pos))
}

/// Every iteration whose value is exactly `target`.
pub fn indices_equal_to(values: &[f64], target: f64) -> Vec<IterationIndex> {
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == target)
        .map(|(pos, _)| IterationIndex::from_position(pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(list: &[u32]) -> Vec<IterationIndex> {
        list.iter().map(|&i| IterationIndex(i)).collect()
    }

    #[test]
    fn boxplot_figures() {
        let s = StatisticsSummary::compute(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert_eq!(s.q1, 2.0);
        assert_eq!(s.q3, 4.0);
        assert_eq!(s.iqr, 2.0);
        assert_eq!(s.lower_bound, -1.0);
        assert_eq!(s.upper_bound, 7.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.median_index, Some(IterationIndex(3)));
        assert_eq!(
            s.outliers,
            vec![Outlier {
                index: IterationIndex(5),
                value: 100.0
            }]
        );
        assert_eq!(s.mean, 22.0);
        assert_eq!(s.range, 99.0);
    }

    /// The first of two equally close iterations is the median index.
    #[test]
    fn median_tie_takes_first_occurrence() {
        let s = StatisticsSummary::compute(&[5.0, 1.0, 3.0, 3.0, 9.0]);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.median_index, Some(IterationIndex(3)));
    }

    /// Equidistant neighbours of an interpolated median: earliest wins.
    #[test]
    fn median_tie_between_neighbours() {
        // median = 2.5; |2 - 2.5| == |3 - 2.5|
        let s = StatisticsSummary::compute(&[3.0, 1.0, 2.0, 4.0]);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.median_index, Some(IterationIndex(1)));
    }

    #[test]
    fn extremes_report_every_duplicate() {
        let s = StatisticsSummary::compute(&[2.0, 2.0, 5.0, 5.0, 2.0]);
        assert_eq!(s.min_indices, idx(&[1, 2, 5]));
        assert_eq!(s.max_indices, idx(&[3, 4]));
    }

    /// Outliers keep iteration order even when values descend.
    #[test]
    fn outliers_in_iteration_order() {
        let s = StatisticsSummary::compute(&[500.0, 10.0, 11.0, 12.0, 10.5, 11.5, 400.0, -300.0]);
        let got: Vec<u32> = s.outliers.iter().map(|o| o.index.get()).collect();
        assert_eq!(got, vec![1, 7, 8]);
    }

    /// Values exactly on a fence are not outliers.
    #[test]
    fn fence_values_are_inside() {
        // q1 = 2, q3 = 4, upper = 7
        let s = StatisticsSummary::compute(&[1.0, 2.0, 3.0, 4.0, 7.0]);
        assert_eq!(s.upper_bound, 7.0);
        assert!(s.outliers.is_empty());
    }

    #[test]
    fn empty_series() {
        let s = StatisticsSummary::compute(&[]);
        assert!(s.is_empty());
        assert_eq!(s.median_index, None);
        assert!(s.outliers.is_empty());
        assert!(s.tags(&WorkstationId::new("WS-1")).is_empty());
        assert_eq!(s.remark(), "");
    }

    #[test]
    fn single_value() {
        let s = StatisticsSummary::compute(&[42.0]);
        assert_eq!(s.median_index, Some(IterationIndex(1)));
        assert_eq!(s.min_indices, idx(&[1]));
        assert_eq!(s.max_indices, idx(&[1]));
        assert_eq!(s.std_dev, 0.0);
        assert!(s.outliers.is_empty());
    }

    #[test]
    fn population_std_dev() {
        let s = StatisticsSummary::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.std_dev, 2.0);
    }

    #[test]
    fn tags_in_emission_order() {
        let ws = WorkstationId::new("WS-1");
        let s = StatisticsSummary::compute(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let rendered: Vec<String> = s
            .tags(&ws)
            .iter()
            .map(|t| format!("{}:{}", t.role, t.index))
            .collect();
        assert_eq!(rendered, vec!["median:3", "abnormal:5", "min:1", "max:5"]);
    }

    #[test]
    fn remark_lists_extremes() {
        let s = StatisticsSummary::compute(&[2.0, 2.0, 5.0]);
        assert_eq!(s.remark(), "Min at loops: 1, 2; Max at loops: 3");
    }
}
