//! Per-chunk results and their reduction into a global result.

use serde::Serialize;

/// Minimum and maximum of a set of integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MinMax {
    pub min: i32,
    pub max: i32,
}

impl MinMax {
    /// The reduction identity: merging it into any value leaves that value unchanged.
    pub const IDENTITY: MinMax = MinMax {
        min: i32::MAX,
        max: i32::MIN,
    };

    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Linear scan over `values`. An empty slice yields the identity.
    pub fn of(values: &[i32]) -> Self {
        values
            .iter()
            .fold(Self::IDENTITY, |acc, &v| acc.merge(Self::new(v, v)))
    }

    pub fn merge(self, other: MinMax) -> MinMax {
        MinMax {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The values as printed to the operator: identity components read as `0`.
    pub fn clamped(&self) -> (i32, i32) {
        let min = if self.min == i32::MAX { 0 } else { self.min };
        let max = if self.max == i32::MIN { 0 } else { self.max };
        (min, max)
    }
}

impl Default for MinMax {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Fold per-chunk results into one global result.
///
/// Missing results contribute the identity, so the outcome is independent of
/// which chunks reported and in what order.
pub fn aggregate<I>(results: I) -> MinMax
where
    I: IntoIterator<Item = Option<MinMax>>,
{
    results
        .into_iter()
        .map(Option::unwrap_or_default)
        .fold(MinMax::IDENTITY, MinMax::merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of() {
        assert_eq!(MinMax::of(&[3, -7, 12, 0]), MinMax::new(-7, 12));
        assert_eq!(MinMax::of(&[5]), MinMax::new(5, 5));
        assert!(MinMax::of(&[]).is_identity());
    }

    #[test]
    fn test_aggregate_matches_whole_array() {
        let values = crate::generate::generate_array(9, 5000);
        let ranges = crate::partition::partition(values.len(), 7).unwrap();
        let parts = ranges
            .iter()
            .map(|r| Some(MinMax::of(&values[r.as_range()])));
        assert_eq!(aggregate(parts), MinMax::of(&values));
    }

    #[test]
    fn test_aggregate_order_independent() {
        let parts = vec![
            Some(MinMax::new(4, 9)),
            None,
            Some(MinMax::new(-2, 3)),
            Some(MinMax::new(0, 11)),
        ];
        let forward = aggregate(parts.clone());
        let backward = aggregate(parts.into_iter().rev());
        assert_eq!(forward, MinMax::new(-2, 11));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_all_missing_is_identity() {
        let result = aggregate(vec![None, None, None, None]);
        assert!(result.is_identity());
        assert_eq!(result.clamped(), (0, 0));
    }

    #[test]
    fn test_clamped_keeps_real_values() {
        assert_eq!(MinMax::new(-5, 8).clamped(), (-5, 8));
    }
}
