use tracing::debug;

use super::client::Page;
use crate::error::Result;

/// Identifies one issued fetch. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    Failed,
    /// A newer request was issued; the result was dropped.
    Stale,
}

/// The in-memory copy of one screen's collection.
///
/// Only the most recently issued request may change it, whatever order
/// responses arrive in. A failed fetch keeps the previous page visible and
/// records the error text instead.
#[derive(Debug, Default)]
pub struct CollectionView {
    latest: u64,
    page: Option<Page>,
    error: Option<String>,
    loading: bool,
}

impl CollectionView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Ticket {
        self.latest += 1;
        self.loading = true;
        Ticket(self.latest)
    }

    pub fn apply(&mut self, ticket: Ticket, result: Result<Page>) -> Applied {
        if ticket.0 != self.latest {
            debug!(ticket = ticket.0, latest = self.latest, "discarding stale response");
            return Applied::Stale;
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.page = Some(page);
                self.error = None;
                Applied::Updated
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Applied::Failed
            }
        }
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    fn page_of(count: usize) -> Page {
        Page {
            total_count: count,
            ..Page::default()
        }
    }

    #[test]
    fn latest_request_wins_regardless_of_completion_order() {
        let mut view = CollectionView::new();
        let first = view.begin();
        let second = view.begin();

        assert_eq!(view.apply(second, Ok(page_of(2))), Applied::Updated);
        assert_eq!(view.apply(first, Ok(page_of(1))), Applied::Stale);
        assert_eq!(view.page().unwrap().total_count, 2);
        assert!(!view.is_loading());
    }

    #[test]
    fn stale_response_does_not_clear_loading() {
        let mut view = CollectionView::new();
        let first = view.begin();
        let _second = view.begin();
        assert_eq!(view.apply(first, Ok(page_of(1))), Applied::Stale);
        assert!(view.is_loading());
        assert!(view.page().is_none());
    }

    #[test]
    fn failure_keeps_previous_page() {
        let mut view = CollectionView::new();
        let t = view.begin();
        view.apply(t, Ok(page_of(5)));

        let t = view.begin();
        let outcome = view.apply(
            t,
            Err(LedgerError::Api {
                status: 502,
                message: "bad gateway".into(),
            }),
        );
        assert_eq!(outcome, Applied::Failed);
        assert_eq!(view.page().unwrap().total_count, 5);
        assert!(view.error().unwrap().contains("bad gateway"));

        let t = view.begin();
        view.apply(t, Ok(page_of(0)));
        assert!(view.error().is_none());
        assert_eq!(view.page().unwrap().total_count, 0);
    }
}
