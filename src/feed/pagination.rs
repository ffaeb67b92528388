use std::collections::HashSet;

/// Anything the accumulator can de-duplicate.
pub trait Identified {
    fn item_id(&self) -> &str;
}

/// One page as returned by a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// Infinite-scroll state: the next cursor, the items seen so far and the two gates that suppress
/// a sentinel trigger.
///
/// Pages are appended in arrival order. Items keep the position of their first appearance.
#[derive(Debug)]
pub struct Paginator<T> {
    first_page: u32,
    next_page: u32,
    items: Vec<T>,
    seen: HashSet<String>,
    loading: bool,
    exhausted: bool,
}

impl<T: Identified> Paginator<T> {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_page: u32) -> Self {
        Self {
            first_page,
            next_page: first_page,
            items: Vec::new(),
            seen: HashSet::new(),
            loading: false,
            exhausted: false,
        }
    }

    /// Called when the end-of-list sentinel scrolls into view. Returns the page to fetch, or
    /// `None` while a fetch is in flight or after the last page.
    pub fn on_sentinel_visible(&mut self) -> Option<u32> {
        if self.loading || self.exhausted {
            return None;
        }

        self.loading = true;
        Some(self.next_page)
    }

    /// Appends the unseen items of `page` and returns how many were new.
    pub fn append_page(&mut self, page: Page<T>) -> usize {
        self.loading = false;
        self.next_page += 1;

        if page.items.is_empty() || !page.has_more {
            self.exhausted = true;
        }

        let before = self.items.len();
        for item in page.items {
            if self.seen.insert(item.item_id().to_string()) {
                self.items.push(item);
            }
        }

        let added = self.items.len() - before;
        tracing::trace!(
            added,
            total = self.items.len(),
            exhausted = self.exhausted,
            "Page appended"
        );
        added
    }

    /// Re-opens the loading gate after a failed fetch so the sentinel can retry the same page.
    pub fn fail_page(&mut self) {
        self.loading = false;
    }

    pub fn reset(&mut self) {
        self.next_page = self.first_page;
        self.items.clear();
        self.seen.clear();
        self.loading = false;
        self.exhausted = false;
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl<T: Identified> Default for Paginator<T> {
    fn default() -> Self {
        Self::new()
    }
}
