//! Folding partial accumulators of one entity into a single result.

use crate::accumulator::Accumulator;
use crate::error::AccumError;

/// Folds a non-empty sequence of same-entity accumulators left to right.
///
/// The result does not depend on input order beyond floating-point summation
/// order.
///
/// # Errors
///
/// [`AccumError::EmptyInput`] on an empty input, or the first merge error
/// encountered (see [`Accumulator::merge`]).
pub fn merge_accumulators<I>(accumulators: I) -> Result<Accumulator, AccumError>
where
    I: IntoIterator<Item = Accumulator>,
{
    let mut iter = accumulators.into_iter();
    let mut merged = iter.next().ok_or(AccumError::EmptyInput)?;
    for acc in iter {
        merged.merge(&acc)?;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::GridIndex;

    #[test]
    fn test_empty_input_fails() {
        let err = merge_accumulators(Vec::new()).unwrap_err();
        assert_eq!(err, AccumError::EmptyInput);
    }

    #[test]
    fn test_single_input_is_identity() {
        let mut acc = Accumulator::gridpoint(GridIndex::new(2, 3), 0.0, 0.0, &[1.0]);
        acc.update(&[1.0, 2.0], &[2.0, 1.0], None).unwrap();
        let merged = merge_accumulators(vec![acc.clone()]).unwrap();
        assert_eq!(merged, acc);
    }

    #[test]
    fn test_propagates_mismatch() {
        let a = Accumulator::gridpoint(GridIndex::new(0, 0), 0.0, 0.0, &[]);
        let b = Accumulator::gridpoint(GridIndex::new(0, 1), 0.0, 0.0, &[]);
        let err = merge_accumulators([a, b]).unwrap_err();
        assert!(matches!(err, AccumError::EntityMismatch { .. }));
    }
}
