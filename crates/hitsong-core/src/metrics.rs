//! Binary classification metrics.
//!
//! Labels and predictions are `f64` slices with values in {0, 1}; anything
//! above 0.5 counts as the positive class. Degenerate inputs (empty slices,
//! length mismatches, single-class AUC) return `NaN` rather than erroring,
//! leaving the policy to the caller.

/// Fraction of predictions matching the true labels.
pub fn accuracy_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.len() != y_pred.len() || y_true.is_empty() {
        return f64::NAN;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| is_positive(**t) == is_positive(**p))
        .count();
    correct as f64 / y_true.len() as f64
}

/// Precision for the positive class; 0.0 when nothing was predicted positive.
pub fn precision_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let (tp, fp, _, _) = counts(y_true, y_pred);
    if tp + fp == 0 {
        return 0.0;
    }
    tp as f64 / (tp + fp) as f64
}

/// Recall for the positive class; 0.0 when there are no positive labels.
pub fn recall_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let (tp, _, fn_, _) = counts(y_true, y_pred);
    if tp + fn_ == 0 {
        return 0.0;
    }
    tp as f64 / (tp + fn_) as f64
}

/// Harmonic mean of precision and recall; 0.0 when both are zero.
pub fn f1_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let p = precision_score(y_true, y_pred);
    let r = recall_score(y_true, y_pred);
    if p + r == 0.0 {
        return 0.0;
    }
    2.0 * p * r / (p + r)
}

/// 2x2 confusion matrix: rows are actual (non-hit, hit), columns are
/// predicted (non-hit, hit).
pub fn confusion_matrix(y_true: &[f64], y_pred: &[f64]) -> [[usize; 2]; 2] {
    let mut cm = [[0usize; 2]; 2];
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let row = usize::from(is_positive(*t));
        let col = usize::from(is_positive(*p));
        cm[row][col] += 1;
    }
    cm
}

/// ROC curve as (false positive rate, true positive rate) points, ordered
/// from (0, 0) to (1, 1). Empty when only one class is present.
pub fn roc_curve(y_true: &[f64], y_score: &[f64]) -> Vec<(f64, f64)> {
    let n_pos = y_true.iter().filter(|t| is_positive(**t)).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || y_true.len() != y_score.len() {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..y_true.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[b]
            .partial_cmp(&y_score[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![(0.0, 0.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let threshold = y_score[order[i]];
        // Consume all samples tied at this threshold before emitting a point.
        while i < order.len() && y_score[order[i]] == threshold {
            if is_positive(y_true[order[i]]) {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push((fp as f64 / n_neg as f64, tp as f64 / n_pos as f64));
    }
    points
}

/// Area under the ROC curve via the rank statistic (tie-aware). `NaN` when
/// only one class is present.
pub fn roc_auc_score(y_true: &[f64], y_score: &[f64]) -> f64 {
    let n_pos = y_true.iter().filter(|t| is_positive(**t)).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || y_true.len() != y_score.len() {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..y_true.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[a]
            .partial_cmp(&y_score[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks across ties, then sum ranks of positives.
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j < order.len() && y_score[order[j]] == y_score[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            if is_positive(y_true[idx]) {
                rank_sum_pos += avg_rank;
            }
        }
        i = j;
    }

    let n_pos_f = n_pos as f64;
    (rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64)
}

/// Per-class precision/recall/F1/support table with macro and weighted
/// averages, in the familiar text layout.
pub fn classification_report(y_true: &[f64], y_pred: &[f64], target_names: [&str; 2]) -> String {
    let inverted_true: Vec<f64> = y_true.iter().map(|t| 1.0 - t).collect();
    let inverted_pred: Vec<f64> = y_pred.iter().map(|p| 1.0 - p).collect();

    // Class 0 metrics come from treating non-hit as the positive class.
    let rows = [
        (
            target_names[0],
            precision_score(&inverted_true, &inverted_pred),
            recall_score(&inverted_true, &inverted_pred),
            f1_score(&inverted_true, &inverted_pred),
            y_true.iter().filter(|t| !is_positive(**t)).count(),
        ),
        (
            target_names[1],
            precision_score(y_true, y_pred),
            recall_score(y_true, y_pred),
            f1_score(y_true, y_pred),
            y_true.iter().filter(|t| is_positive(**t)).count(),
        ),
    ];

    let total = y_true.len();
    let mut report = format!(
        "{:>14}  {:>9}  {:>6}  {:>8}  {:>7}\n\n",
        "", "precision", "recall", "f1-score", "support"
    );
    for (name, precision, recall, f1, support) in rows {
        report.push_str(&format!(
            "{:>14}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}\n",
            name, precision, recall, f1, support
        ));
    }

    let accuracy = accuracy_score(y_true, y_pred);
    let (macro_p, macro_r, macro_f) = (
        (rows[0].1 + rows[1].1) / 2.0,
        (rows[0].2 + rows[1].2) / 2.0,
        (rows[0].3 + rows[1].3) / 2.0,
    );
    let weight = |support: usize| support as f64 / total.max(1) as f64;
    let (weighted_p, weighted_r, weighted_f) = (
        rows[0].1 * weight(rows[0].4) + rows[1].1 * weight(rows[1].4),
        rows[0].2 * weight(rows[0].4) + rows[1].2 * weight(rows[1].4),
        rows[0].3 * weight(rows[0].4) + rows[1].3 * weight(rows[1].4),
    );

    report.push_str(&format!(
        "\n{:>14}  {:>9}  {:>6}  {:>8.2}  {:>7}\n",
        "accuracy", "", "", accuracy, total
    ));
    report.push_str(&format!(
        "{:>14}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}\n",
        "macro avg", macro_p, macro_r, macro_f, total
    ));
    report.push_str(&format!(
        "{:>14}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}\n",
        "weighted avg", weighted_p, weighted_r, weighted_f, total
    ));
    report
}

/// Pearson correlation coefficient; `NaN` for degenerate inputs.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return f64::NAN;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a < 1e-20 || var_b < 1e-20 {
        return f64::NAN;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

fn is_positive(value: f64) -> bool {
    value > 0.5
}

fn counts(y_true: &[f64], y_pred: &[f64]) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;
    let mut tn = 0;
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (is_positive(*t), is_positive(*p)) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => tn += 1,
        }
    }
    (tp, fp, fn_, tn)
}

#[cfg(test)]
mod tests {
    use super::*;

    const Y_TRUE: [f64; 6] = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
    const Y_PRED: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 1.0];

    #[test]
    fn test_accuracy() {
        assert!((accuracy_score(&Y_TRUE, &Y_PRED) - 4.0 / 6.0).abs() < 1e-10);
        assert!(accuracy_score(&[], &[]).is_nan());
    }

    #[test]
    fn test_precision_recall_f1() {
        // tp=2, fp=1, fn=1
        assert!((precision_score(&Y_TRUE, &Y_PRED) - 2.0 / 3.0).abs() < 1e-10);
        assert!((recall_score(&Y_TRUE, &Y_PRED) - 2.0 / 3.0).abs() < 1e-10);
        assert!((f1_score(&Y_TRUE, &Y_PRED) - 2.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let y_true = [0.0, 0.0];
        let y_pred = [0.0, 0.0];
        assert_eq!(precision_score(&y_true, &y_pred), 0.0);
        assert_eq!(recall_score(&y_true, &y_pred), 0.0);
        assert_eq!(f1_score(&y_true, &y_pred), 0.0);
    }

    #[test]
    fn test_confusion_matrix_sums_to_samples() {
        let cm = confusion_matrix(&Y_TRUE, &Y_PRED);
        assert_eq!(cm, [[2, 1], [1, 2]]);
        let total: usize = cm.iter().flatten().sum();
        assert_eq!(total, Y_TRUE.len());
    }

    #[test]
    fn test_roc_auc_perfect_separation() {
        let y_true = [0.0, 0.0, 1.0, 1.0];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc_score(&y_true, &scores) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_roc_auc_random_scores() {
        let y_true = [0.0, 1.0, 0.0, 1.0];
        let scores = [0.5, 0.5, 0.5, 0.5];
        // All tied: AUC is exactly 0.5.
        assert!((roc_auc_score(&y_true, &scores) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_roc_auc_single_class_is_nan() {
        assert!(roc_auc_score(&[1.0, 1.0], &[0.2, 0.8]).is_nan());
        assert!(roc_auc_score(&[0.0, 0.0], &[0.2, 0.8]).is_nan());
    }

    #[test]
    fn test_roc_curve_endpoints() {
        let y_true = [0.0, 0.0, 1.0, 1.0];
        let scores = [0.1, 0.4, 0.35, 0.8];
        let curve = roc_curve(&y_true, &scores);
        assert_eq!(curve.first(), Some(&(0.0, 0.0)));
        assert_eq!(curve.last(), Some(&(1.0, 1.0)));
        // Monotone non-decreasing in both coordinates.
        for pair in curve.windows(2) {
            assert!(pair[1].0 >= pair[0].0);
            assert!(pair[1].1 >= pair[0].1);
        }
    }

    #[test]
    fn test_roc_curve_single_class_is_empty() {
        assert!(roc_curve(&[1.0, 1.0], &[0.1, 0.9]).is_empty());
    }

    #[test]
    fn test_classification_report_contains_classes() {
        let report = classification_report(&Y_TRUE, &Y_PRED, ["Non-Hit", "Hit"]);
        assert!(report.contains("Non-Hit"));
        assert!(report.contains("Hit"));
        assert!(report.contains("macro avg"));
        assert!(report.contains("weighted avg"));
    }

    #[test]
    fn test_pearson() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-10);
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-10);
        assert!(pearson(&a, &[1.0, 1.0, 1.0, 1.0]).is_nan());
    }
}
