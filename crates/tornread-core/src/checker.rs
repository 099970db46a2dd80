//! Consistency checker

use crate::error::AnomalyError;
use crate::model::PairView;

/// Check one observed view against the pair invariant
///
/// # Errors
/// `AnomalyError` when the segment is absent or its value differs from the
/// head's.
pub fn check(view: &PairView, iteration: u64) -> Result<(), AnomalyError> {
    if view.is_consistent() {
        return Ok(());
    }
    Err(AnomalyError {
        expected_head_value: view.head.value,
        observed_segment_value: view.segment_value(),
        iteration,
    })
}
