//! Computes the date window a refresh fetches transactions for.

use std::ops::RangeInclusive;

use time::{Date, Duration};

/// How far back an orchestrated refresh looks for transactions.
const SYNC_WINDOW_DAYS: i64 = 30;

/// The inclusive date range a refresh covers: the trailing 30 days ending on
/// `today`.
///
/// Computed fresh on every refresh; never persisted.
pub fn sync_window(today: Date) -> RangeInclusive<Date> {
    today.saturating_sub(Duration::days(SYNC_WINDOW_DAYS))..=today
}

#[cfg(test)]
mod window_tests {
    use time::macros::date;

    use super::sync_window;

    #[test]
    fn window_ends_today_and_starts_thirty_days_earlier() {
        let today = date!(2024 - 03 - 15);

        let window = sync_window(today);

        assert_eq!(*window.end(), today);
        assert_eq!(*window.start(), date!(2024 - 02 - 14));
    }

    #[test]
    fn window_spans_month_boundaries() {
        let window = sync_window(date!(2024 - 01 - 05));

        assert_eq!(*window.start(), date!(2023 - 12 - 06));
    }
}
