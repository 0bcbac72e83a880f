use chrono::NaiveDate;

use crate::config::MAX_PAGE_SIZE;
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortField {
    Name,
    Billed,
    Paid,
    Pending,
    Date,
}

impl SortField {
    fn wire_name(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Billed => "billedAmount",
            SortField::Paid => "paidAmount",
            SortField::Pending => "pendingAmount",
            SortField::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn wire_name(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Page, filter and sort settings for a collection request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// 1-based
    pub page: u32,
    pub page_size: usize,
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort: Option<SortSpec>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 15,
            search: None,
            category: None,
            min_amount: None,
            max_amount: None,
            from: None,
            to: None,
            sort: None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl ListQuery {
    /// Check ranges and return a normalized copy (blank text filters dropped).
    pub fn validate(&self) -> Result<ListQuery> {
        if self.page == 0 {
            return Err(LedgerError::invalid_query("page", "pages start at 1"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(LedgerError::invalid_query(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        for (name, value) in [("min", self.min_amount), ("max", self.max_amount)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(LedgerError::invalid_query(name, "must be a finite number"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(LedgerError::invalid_query(
                    "min",
                    format!("{min} is greater than max {max}"),
                ));
            }
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(LedgerError::invalid_query(
                    "from",
                    format!("{from} is after {to}"),
                ));
            }
        }

        Ok(ListQuery {
            search: non_blank(&self.search),
            category: non_blank(&self.category),
            ..self.clone()
        })
    }

    /// Query-string pairs in a fixed order; absent filters are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(min) = self.min_amount {
            pairs.push(("minAmount", min.to_string()));
        }
        if let Some(max) = self.max_amount {
            pairs.push(("maxAmount", max.to_string()));
        }
        if let Some(from) = self.from {
            pairs.push(("startDate", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("endDate", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sortBy", sort.field.wire_name().to_string()));
            pairs.push(("sortOrder", sort.direction.wire_name().to_string()));
        }
        pairs
    }
}

pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_sends_only_paging() {
        let pairs = ListQuery::default().to_pairs();
        assert_eq!(
            pairs,
            vec![("page", "1".to_string()), ("limit", "15".to_string())]
        );
    }

    #[test]
    fn full_query_pairs_are_ordered() {
        let query = ListQuery {
            page: 3,
            page_size: 50,
            search: Some("acme".into()),
            category: Some("wholesale".into()),
            min_amount: Some(10.0),
            max_amount: Some(2500.5),
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: NaiveDate::from_ymd_opt(2024, 3, 31),
            sort: Some(SortSpec {
                field: SortField::Pending,
                direction: SortDirection::Desc,
            }),
        };
        let keys: Vec<&str> = query.to_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            [
                "page",
                "limit",
                "search",
                "category",
                "minAmount",
                "maxAmount",
                "startDate",
                "endDate",
                "sortBy",
                "sortOrder"
            ]
        );
        let pairs = query.to_pairs();
        assert!(pairs.contains(&("maxAmount", "2500.5".to_string())));
        assert!(pairs.contains(&("startDate", "2024-01-01".to_string())));
        assert!(pairs.contains(&("sortBy", "pendingAmount".to_string())));
        assert!(pairs.contains(&("sortOrder", "desc".to_string())));
    }

    #[test]
    fn validate_trims_and_drops_blank_search() {
        let query = ListQuery {
            search: Some("   ".into()),
            category: Some(" retail ".into()),
            ..ListQuery::default()
        };
        let normalized = query.validate().unwrap();
        assert_eq!(normalized.search, None);
        assert_eq!(normalized.category.as_deref(), Some("retail"));
    }

    #[test]
    fn validate_rejects_inverted_ranges() {
        let query = ListQuery {
            min_amount: Some(100.0),
            max_amount: Some(5.0),
            ..ListQuery::default()
        };
        assert!(matches!(
            query.validate(),
            Err(LedgerError::InvalidQuery { ref name, .. }) if name == "min"
        ));

        let query = ListQuery {
            from: NaiveDate::from_ymd_opt(2024, 5, 1),
            to: NaiveDate::from_ymd_opt(2024, 4, 1),
            ..ListQuery::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_paging() {
        let zero_page = ListQuery {
            page: 0,
            ..ListQuery::default()
        };
        assert!(zero_page.validate().is_err());

        let huge = ListQuery {
            page_size: MAX_PAGE_SIZE + 1,
            ..ListQuery::default()
        };
        assert!(huge.validate().is_err());

        let nan = ListQuery {
            min_amount: Some(f64::NAN),
            ..ListQuery::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 15), 0);
        assert_eq!(total_pages(15, 15), 1);
        assert_eq!(total_pages(16, 15), 2);
    }
}
