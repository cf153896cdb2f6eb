//! Saturating deltas for monotonic kernel counters.

/// Returns `current - previous`, or 0 when the counter went backwards
/// (reset, overflow or a racy read).
#[inline]
pub fn delta(previous: u64, current: u64) -> u64 {
    current.saturating_sub(previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_forward() {
        assert_eq!(delta(30, 100), 70);
        assert_eq!(delta(0, 0), 0);
        assert_eq!(delta(5, 5), 0);
    }

    #[test]
    fn test_delta_retrogression_is_zero() {
        assert_eq!(delta(100, 30), 0);
        assert_eq!(delta(u64::MAX, 0), 0);
        assert_eq!(delta(1, 0), 0);
    }

    #[test]
    fn test_delta_full_range() {
        assert_eq!(delta(0, u64::MAX), u64::MAX);
    }
}
