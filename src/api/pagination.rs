use serde::Serialize;

pub(crate) const MAX_PAGE_SIZE: i64 = 1000;

pub(crate) const fn default_limit() -> i64 {
    100
}

/// Normalizes raw skip/limit query values into a usable window: negative
/// offsets become 0 and the page size is forced into [1, MAX_PAGE_SIZE].
pub(crate) fn clamp_window(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(1, MAX_PAGE_SIZE))
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_window_bounds_both_sides() {
        assert_eq!(clamp_window(-5, 0), (0, 1));
        assert_eq!(clamp_window(10, 50), (10, 50));
        assert_eq!(clamp_window(0, 9999), (0, MAX_PAGE_SIZE));
    }
}
