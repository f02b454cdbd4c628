//! Pagination window for list queries

/// Limit/offset window over a listing in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// Page size used when the caller passes a zero limit
    pub const DEFAULT_LIMIT: usize = 10;

    /// Create a page; a zero limit falls back to [`Page::DEFAULT_LIMIT`]
    pub fn new(limit: usize, offset: usize) -> Self {
        Self::with_default_limit(limit, offset, Self::DEFAULT_LIMIT)
    }

    /// Create a page; a zero limit falls back to `default_limit`
    pub fn with_default_limit(limit: usize, offset: usize, default_limit: usize) -> Self {
        let limit = if limit == 0 { default_limit } else { limit };
        Page { limit, offset }
    }

    /// Apply the window to an iterator
    pub fn apply<I: Iterator>(&self, items: I) -> impl Iterator<Item = I::Item> {
        items.skip(self.offset).take(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(Self::DEFAULT_LIMIT, 0)
    }
}
