//! Limit/offset pagination shared by list endpoints

/// Default number of rows per request when none is given
pub const DEFAULT_LIMIT: i64 = 50;

/// Upper bound for `limit`
pub const MAX_LIMIT: i64 = 100;

/// Sanitized limit/offset pair for SQL LIMIT/OFFSET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

/// Clamp a requested limit/offset into valid bounds
///
/// Limit falls back to `default_limit` and is kept within `[1, max_limit]`.
/// Negative offsets become 0.
///
/// # Examples
/// ```
/// use interio_rt::pagination::calculate_pagination;
///
/// let p = calculate_pagination(None, None, 50, 100);
/// assert_eq!((p.limit, p.offset), (50, 0));
///
/// let p = calculate_pagination(Some(500), Some(-3), 50, 100);
/// assert_eq!((p.limit, p.offset), (100, 0));
/// ```
pub fn calculate_pagination(
    requested_limit: Option<i64>,
    requested_offset: Option<i64>,
    default_limit: i64,
    max_limit: i64,
) -> Pagination {
    let max_limit = max_limit.max(1);
    let limit = requested_limit.unwrap_or(default_limit).clamp(1, max_limit);
    let offset = requested_offset.unwrap_or(0).max(0);

    Pagination { limit, offset }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = calculate_pagination(None, None, DEFAULT_LIMIT, MAX_LIMIT);
        assert_eq!(p.limit, 50);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_within_bounds() {
        let p = calculate_pagination(Some(10), Some(20), DEFAULT_LIMIT, MAX_LIMIT);
        assert_eq!(p.limit, 10);
        assert_eq!(p.offset, 20);
    }

    #[test]
    fn test_pagination_limit_too_high() {
        let p = calculate_pagination(Some(1000), None, DEFAULT_LIMIT, MAX_LIMIT);
        assert_eq!(p.limit, 100); // Clamped to max
    }

    #[test]
    fn test_pagination_limit_too_low() {
        let p = calculate_pagination(Some(0), None, DEFAULT_LIMIT, MAX_LIMIT);
        assert_eq!(p.limit, 1);
        let p = calculate_pagination(Some(-5), None, DEFAULT_LIMIT, MAX_LIMIT);
        assert_eq!(p.limit, 1);
    }

    #[test]
    fn test_pagination_negative_offset() {
        let p = calculate_pagination(None, Some(-10), DEFAULT_LIMIT, MAX_LIMIT);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_default_above_max() {
        let p = calculate_pagination(None, None, 500, 20);
        assert_eq!(p.limit, 20);
    }
}
