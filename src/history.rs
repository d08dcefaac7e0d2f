//! Processing history table: newest question first, paged.

use crate::api::ResultSummary;

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    Loaded(Vec<ResultSummary>),
    NextPage,
    PreviousPage,
    GoTo(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    rows: Vec<ResultSummary>,
    rows_per_page: usize,
    page: usize,
}

impl HistoryView {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            rows: Vec::new(),
            rows_per_page: rows_per_page.max(1),
            page: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// `ceil(rows / rows_per_page)`; zero when there is no history.
    pub fn total_pages(&self) -> usize {
        self.rows.len().div_ceil(self.rows_per_page)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Rows of the current page, highest id first.
    pub fn visible(&self) -> &[ResultSummary] {
        let start = ((self.page - 1) * self.rows_per_page).min(self.rows.len());
        let end = (start + self.rows_per_page).min(self.rows.len());
        &self.rows[start..end]
    }

    pub fn apply(&self, event: HistoryEvent) -> HistoryView {
        let mut next = self.clone();
        match event {
            HistoryEvent::Loaded(mut rows) => {
                rows.sort_by(|a, b| b.id.cmp(&a.id));
                next.rows = rows;
            }
            HistoryEvent::NextPage => next.page += 1,
            HistoryEvent::PreviousPage => next.page = next.page.saturating_sub(1),
            HistoryEvent::GoTo(page) => next.page = page,
        }
        next.page = next.page.clamp(1, next.total_pages().max(1));
        next
    }
}
