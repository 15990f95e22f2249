//! Layout cursor
//!
//! The single piece of mutable state of a composition pass. Owned by one
//! layout run and never shared.

use super::page::PageConfig;

/// Tolerance for float comparisons against the page bottom
const EPSILON: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCursor {
    page: usize,
    y: f32,
    top: f32,
    limit: f32,
    /// Collapsed spacing owed before the next block
    pending_gap: f32,
}

impl LayoutCursor {
    /// Top margin of the first page
    pub fn new(config: &PageConfig) -> Self {
        Self {
            page: 0,
            y: config.margin_top,
            top: config.margin_top,
            limit: config.content_bottom(),
            pending_gap: 0.0,
        }
    }

    /// Zero-based page index
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn at_page_top(&self) -> bool {
        (self.y - self.top).abs() < EPSILON
    }

    /// Whether `height` fits below the cursor
    pub fn fits(&self, height: f32) -> bool {
        self.y + height <= self.limit + EPSILON
    }

    /// Request spacing before the next block; consecutive gaps collapse to the largest.
    pub fn gap(&mut self, gap: f32) {
        self.pending_gap = self.pending_gap.max(gap);
    }

    pub fn pending_gap(&self) -> f32 {
        self.pending_gap
    }

    pub fn clear_gap(&mut self) {
        self.pending_gap = 0.0;
    }

    /// Consume the pending gap on the current page
    pub fn apply_gap(&mut self) {
        self.y += self.pending_gap;
        self.pending_gap = 0.0;
    }

    pub fn advance(&mut self, height: f32) {
        self.y += height;
    }

    /// Move to the top of the next page; pending spacing is dropped.
    pub fn new_page(&mut self) {
        self.page += 1;
        self.y = self.top;
        self.pending_gap = 0.0;
    }
}
