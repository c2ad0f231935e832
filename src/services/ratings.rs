//! Rating aggregation.
//!
//! Averages are never stored; every read of a meal recomputes them from the
//! current review set.

use rust_decimal::{Decimal, RoundingStrategy};

/// Aggregate of a meal's review ratings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSummary {
    /// Mean rating rounded half-up to one decimal place, `0` when unrated
    pub average_rating: Decimal,
    pub review_count: u64,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            average_rating: Decimal::ZERO,
            review_count: 0,
        }
    }
}

/// Summarizes a set of ratings.
///
/// The mean is computed in exact decimal arithmetic so that midpoints such as
/// `4.25` round to `4.3` rather than drifting through a float representation.
pub fn summarize<I>(ratings: I) -> RatingSummary
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0i64, 0u64), |(sum, count), rating| {
            (sum + i64::from(rating), count + 1)
        });

    if count == 0 {
        return RatingSummary::default();
    }

    let mean = Decimal::from(sum) / Decimal::from(count);
    RatingSummary {
        average_rating: mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
        review_count: count,
    }
}
