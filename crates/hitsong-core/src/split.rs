//! Stratified splitting utilities.
//!
//! Both splitters work on index sets so callers can slice whatever row
//! representation they hold. Shuffling is seeded; identical inputs and seeds
//! produce identical splits.

use crate::error::{CoreError, Result};
use rand::prelude::*;

/// Stratified train/test split over binary labels.
///
/// Each class is shuffled independently and `test_ratio` of it held out
/// (at least one sample per class when the class has two or more members).
/// Returned index sets are sorted.
pub fn stratified_train_test_split(
    y: &[f64],
    test_ratio: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(CoreError::InvalidParameter {
            name: "test_ratio".to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }
    if y.len() < 4 {
        return Err(CoreError::InsufficientData {
            required: 4,
            actual: y.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class_positive in [false, true] {
        let mut indices: Vec<usize> = (0..y.len())
            .filter(|&i| (y[i] > 0.5) == class_positive)
            .collect();
        if indices.is_empty() {
            continue;
        }
        indices.shuffle(&mut rng);

        let n = indices.len();
        let n_test = if n == 1 {
            0
        } else {
            ((n as f64 * test_ratio).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Stratified k-fold splits over binary labels.
///
/// Shuffled class members are dealt round-robin into `k` folds; each fold in
/// turn becomes the held-out set. Returns `(train_indices, test_indices)`
/// pairs with sorted index sets.
pub fn stratified_k_fold(y: &[f64], k: usize, seed: u64) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if k < 2 {
        return Err(CoreError::InvalidParameter {
            name: "k".to_string(),
            reason: "must be at least 2".to_string(),
        });
    }
    if y.len() < k {
        return Err(CoreError::InsufficientData {
            required: k,
            actual: y.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];

    for class_positive in [false, true] {
        let mut indices: Vec<usize> = (0..y.len())
            .filter(|&i| (y[i] > 0.5) == class_positive)
            .collect();
        indices.shuffle(&mut rng);
        for (offset, index) in indices.into_iter().enumerate() {
            folds[offset % k].push(index);
        }
    }

    let splits = (0..k)
        .map(|fold| {
            let mut test = folds[fold].clone();
            let mut train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            train.sort_unstable();
            test.sort_unstable();
            (train, test)
        })
        .collect();
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_neg: usize, n_pos: usize) -> Vec<f64> {
        let mut y = vec![0.0; n_neg];
        y.extend(vec![1.0; n_pos]);
        y
    }

    #[test]
    fn test_split_is_partition() {
        let y = labels(30, 10);
        let (train, test) = stratified_train_test_split(&y, 0.25, 42).unwrap();

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_preserves_class_ratio() {
        let y = labels(60, 20);
        let (_, test) = stratified_train_test_split(&y, 0.25, 42).unwrap();
        let test_pos = test.iter().filter(|&&i| y[i] > 0.5).count();
        assert_eq!(test.len(), 20);
        assert_eq!(test_pos, 5);
    }

    #[test]
    fn test_split_deterministic_for_seed() {
        let y = labels(25, 15);
        let a = stratified_train_test_split(&y, 0.25, 42).unwrap();
        let b = stratified_train_test_split(&y, 0.25, 42).unwrap();
        assert_eq!(a, b);

        let c = stratified_train_test_split(&y, 0.25, 7).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_invalid_ratio() {
        let y = labels(5, 5);
        assert!(matches!(
            stratified_train_test_split(&y, 0.0, 42),
            Err(CoreError::InvalidParameter { .. })
        ));
        assert!(matches!(
            stratified_train_test_split(&y, 1.0, 42),
            Err(CoreError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_split_too_few_samples() {
        assert!(matches!(
            stratified_train_test_split(&[1.0, 0.0], 0.25, 42),
            Err(CoreError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_k_fold_covers_every_index_once() {
        let y = labels(20, 10);
        let splits = stratified_k_fold(&y, 5, 42).unwrap();
        assert_eq!(splits.len(), 5);

        let mut seen: Vec<usize> = splits.iter().flat_map(|(_, test)| test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..30).collect::<Vec<_>>());

        for (train, test) in &splits {
            assert_eq!(train.len() + test.len(), 30);
            assert!(test.iter().all(|i| !train.contains(i)));
        }
    }

    #[test]
    fn test_k_fold_stratification() {
        let y = labels(20, 10);
        let splits = stratified_k_fold(&y, 5, 42).unwrap();
        for (_, test) in &splits {
            let pos = test.iter().filter(|&&i| y[i] > 0.5).count();
            assert_eq!(pos, 2);
            assert_eq!(test.len(), 6);
        }
    }

    #[test]
    fn test_k_fold_invalid_k() {
        let y = labels(5, 5);
        assert!(matches!(
            stratified_k_fold(&y, 1, 42),
            Err(CoreError::InvalidParameter { .. })
        ));
        assert!(matches!(
            stratified_k_fold(&y, 11, 42),
            Err(CoreError::InsufficientData { .. })
        ));
    }
}
