use std::fmt;
use std::str::FromStr;

use crate::models::{Category, CategoryStatus, ParseStatusError};
use crate::utils::contains_ignore_case;

/// Status selector; `All` applies no filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(CategoryStatus),
}

impl StatusFilter {
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => category.effective_status() == *status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseStatusError;

    /// `""` and `"all"` select everything; otherwise a status name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Only(status) => write!(f, "{}", status),
        }
    }
}

/// Transient search/filter input from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub query: String,
    pub status: StatusFilter,
}

impl ViewFilter {
    pub fn new(query: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            query: query.into(),
            status,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.status == StatusFilter::All
    }

    pub fn matches(&self, category: &Category) -> bool {
        let query = self.query.trim();
        (query.is_empty() || contains_ignore_case(&category.name, query))
            && self.status.matches(category)
    }
}

/// Records matching `filter`, in their original order.
pub fn derive_view(records: &[Category], filter: &ViewFilter) -> Vec<Category> {
    if filter.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|c| filter.matches(c))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books_and_games() -> Vec<Category> {
        vec![
            Category::new(1, "Books", Some(CategoryStatus::Active)),
            Category::new(2, "Games", Some(CategoryStatus::Inactive)),
        ]
    }

    fn sample() -> Vec<Category> {
        vec![
            Category::new(4, "Board Games", Some(CategoryStatus::Active)),
            Category::new(1, "Books", Some(CategoryStatus::Active)),
            Category::new(2, "Games", Some(CategoryStatus::Inactive)),
            Category::new(3, "Music", None),
            Category::new(5, "Audio Books", Some(CategoryStatus::Inactive)),
        ]
    }

    fn filters() -> Vec<ViewFilter> {
        vec![
            ViewFilter::default(),
            ViewFilter::new("bo", StatusFilter::All),
            ViewFilter::new("  GAMES ", StatusFilter::All),
            ViewFilter::new("", StatusFilter::Only(CategoryStatus::Active)),
            ViewFilter::new("", StatusFilter::Only(CategoryStatus::Inactive)),
            ViewFilter::new("books", StatusFilter::Only(CategoryStatus::Inactive)),
            ViewFilter::new("zzz", StatusFilter::All),
        ]
    }

    #[test]
    fn test_query_matches_name_case_insensitively() {
        let view = derive_view(&books_and_games(), &ViewFilter::new("bo", StatusFilter::All));
        assert_eq!(view, vec![Category::new(1, "Books", Some(CategoryStatus::Active))]);
    }

    #[test]
    fn test_status_filter() {
        let filter = ViewFilter::new("", StatusFilter::Only(CategoryStatus::Inactive));
        let view = derive_view(&books_and_games(), &filter);
        assert_eq!(view, vec![Category::new(2, "Games", Some(CategoryStatus::Inactive))]);
    }

    #[test]
    fn test_missing_status_counts_as_active() {
        let filter = ViewFilter::new("", StatusFilter::Only(CategoryStatus::Active));
        let ids: Vec<i64> = derive_view(&sample(), &filter).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 1, 3]);
    }

    #[test]
    fn test_query_is_trimmed() {
        let ids: Vec<i64> = derive_view(&sample(), &ViewFilter::new("  GAMES ", StatusFilter::All))
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![4, 2]);

        let blank = ViewFilter::new("   ", StatusFilter::All);
        assert!(blank.is_empty());
        assert_eq!(derive_view(&sample(), &blank), sample());
    }

    #[test]
    fn test_filters_compose_by_intersection() {
        let filter = ViewFilter::new("books", StatusFilter::Only(CategoryStatus::Inactive));
        let view = derive_view(&sample(), &filter);
        assert_eq!(view, vec![Category::new(5, "Audio Books", Some(CategoryStatus::Inactive))]);
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        assert_eq!(derive_view(&sample(), &ViewFilter::default()), sample());
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(derive_view(&sample(), &ViewFilter::new("zzz", StatusFilter::All)).is_empty());
        assert!(derive_view(&[], &ViewFilter::default()).is_empty());
    }

    #[test]
    fn test_view_is_an_ordered_subset() {
        let records = sample();
        for filter in filters() {
            let view = derive_view(&records, &filter);
            let positions = view
                .iter()
                .map(|c| records.iter().position(|r| r == c).expect("fabricated record"));
            let mut last = None;
            for position in positions {
                assert!(last < Some(position), "order changed for {:?}", filter);
                last = Some(position);
            }
        }
    }

    #[test]
    fn test_derive_view_is_idempotent() {
        let records = sample();
        for filter in filters() {
            let once = derive_view(&records, &filter);
            assert_eq!(derive_view(&once, &filter), once, "{:?}", filter);
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let records = sample();
        let _ = derive_view(&records, &ViewFilter::new("bo", StatusFilter::All));
        assert_eq!(records, sample());
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("All".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(
            "inactive".parse::<StatusFilter>(),
            Ok(StatusFilter::Only(CategoryStatus::Inactive))
        );
        assert!("pending".parse::<StatusFilter>().is_err());
        assert_eq!(StatusFilter::Only(CategoryStatus::Active).to_string(), "active");
    }
}
