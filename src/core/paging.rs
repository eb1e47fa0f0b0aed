//! Page slicing over business day sequences.

use crate::core::error::{RateError, RateResult};
use chrono::NaiveDate;

/// One page of business days and the upstream range that covers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
    pub days: Vec<NaiveDate>,
}

impl PageSlice {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// `[first, last]` of the slice; `None` for an empty page.
    pub fn fetch_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.days.first()?, *self.days.last()?))
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.days.binary_search(date).is_ok()
    }
}

pub struct Paginator;

impl Paginator {
    /// Skips `(page - 1) * page_size` days and takes `page_size`.
    ///
    /// A page past the end is empty, not an error.
    pub fn page(business_days: &[NaiveDate], page: i64, page_size: i64) -> RateResult<PageSlice> {
        if page <= 0 {
            return Err(RateError::validation("Page must be 1 or greater."));
        }
        if page_size <= 0 {
            return Err(RateError::validation("PageSize must be 1 or greater."));
        }

        let skip = (page - 1)
            .checked_mul(page_size)
            .and_then(|skip| usize::try_from(skip).ok())
            .unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);

        Ok(PageSlice {
            days: business_days.iter().skip(skip).take(take).copied().collect(),
        })
    }
}
