//! Generation Usage Accounting
//!
//! Per-request counters for generated sections, fallbacks, and tokens.
//! Thread-safe for concurrent section resolution.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Usage summary returned with every report for cost accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationUsage {
    pub sections_generated: u32,
    pub sections_fallback: u32,
    pub total_tokens: u64,
}

/// Lock-free usage counters shared by all sections of one report request.
pub struct UsageTracker {
    sections_generated: AtomicU32,
    sections_fallback: AtomicU32,
    total_tokens: AtomicU64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            sections_generated: AtomicU32::new(0),
            sections_fallback: AtomicU32::new(0),
            total_tokens: AtomicU64::new(0),
        }
    }

    /// Record a successfully generated section
    pub fn record_generated(&self, tokens: u32) {
        self.sections_generated.fetch_add(1, Ordering::Relaxed);
        self.total_tokens
            .fetch_add(u64::from(tokens), Ordering::Relaxed);
    }

    /// Record a section that fell back to literal content.
    ///
    /// Tokens spent on failed attempts still count toward cost.
    pub fn record_fallback(&self, tokens: u32) {
        self.sections_fallback.fetch_add(1, Ordering::Relaxed);
        self.total_tokens
            .fetch_add(u64::from(tokens), Ordering::Relaxed);
    }

    pub fn summary(&self) -> GenerationUsage {
        GenerationUsage {
            sections_generated: self.sections_generated.load(Ordering::Relaxed),
            sections_fallback: self.sections_fallback.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}
