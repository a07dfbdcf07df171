//! # hitsong-core
//!
//! Shared building blocks for the hit-song prediction pipeline: the
//! column-oriented [`Frame`] table, a fit-once-apply-many
//! [`StandardScaler`], binary classification metrics, and stratified
//! splitting utilities.

pub mod error;
pub mod frame;
pub mod metrics;
pub mod scaler;
pub mod split;

pub use error::{CoreError, Result};
pub use frame::{median, Column, Frame, EXCLUDED_COLUMNS};
pub use scaler::StandardScaler;
pub use split::{stratified_k_fold, stratified_train_test_split};
