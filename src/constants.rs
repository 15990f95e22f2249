//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Formatting conventions shared by the resolver and the generation context
pub mod locale {
    /// chrono format for all rendered dates (15/01/2025)
    pub const DATE_FORMAT: &str = "%d/%m/%Y";

    pub const THOUSANDS_SEPARATOR: char = '.';

    pub const DECIMAL_SEPARATOR: char = ',';

    pub const CURRENCY_SYMBOL: &str = "$";
}

/// Generation constants
pub mod generation {
    /// Default system persona for generation-assisted sections
    pub const DEFAULT_PERSONA: &str = "You are a technical writer for construction supervision reports. \
Write factual, concise prose in a formal register, using only the data provided. \
Format the answer with the tags <p>, <ul>, <ol>, <li>, <strong> and <em> only.";

    /// Default output token budget per section
    pub const DEFAULT_MAX_TOKENS: u32 = 800;

    /// Default per-section timeout (seconds), first attempt and retry included
    pub const DEFAULT_SECTION_TIMEOUT_SECS: u64 = 60;

    /// Default character budget for the data context sent with a prompt
    pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

    /// Sections resolved concurrently
    pub const DEFAULT_MAX_CONCURRENT_SECTIONS: usize = 4;

    /// Delay before the single retry of a transient failure (milliseconds)
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

    /// Retries after the first attempt
    pub const MAX_RETRIES: usize = 1;

    /// Shown when a fallback section has no literal content of its own
    pub const FALLBACK_NOTICE: &str =
        "<p><em>Content for this section could not be produced for this period.</em></p>";
}

/// Data collection constants
pub mod collection {
    /// Aggregate timeout for all collector reads (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

/// Page layout constants (PDF points, 1/72 inch)
pub mod layout {
    pub const A4_WIDTH: f32 = 595.28;
    pub const A4_HEIGHT: f32 = 841.89;
    pub const LETTER_WIDTH: f32 = 612.0;
    pub const LETTER_HEIGHT: f32 = 792.0;

    pub const DEFAULT_MARGIN: f32 = 56.0;

    pub const BODY_FONT_SIZE: f32 = 10.0;
    pub const TITLE_FONT_SIZE: f32 = 18.0;
    pub const SECTION_TITLE_FONT_SIZE: f32 = 13.0;
    pub const FOOTER_FONT_SIZE: f32 = 8.0;

    /// Line height as a multiple of font size
    pub const LINE_SPACING: f32 = 1.4;

    pub const SIGNATURE_ROW_HEIGHT: f32 = 90.0;

    /// Signature grid is always two columns wide
    pub const SIGNATURE_COLUMNS: usize = 2;

    /// Height of an `<img>` placeholder without an explicit height
    pub const DEFAULT_IMAGE_HEIGHT: f32 = 140.0;

    /// Vertical gap after paragraphs, lists, and sections
    pub const BLOCK_GAP: f32 = 6.0;

    /// Indentation of list items
    pub const LIST_INDENT: f32 = 14.0;
}

/// Local storage constants
pub mod storage {
    pub const APP_DIR: &str = ".sitereport";

    pub const DATABASE_FILE: &str = "sitereport.db";

    pub const OUTPUT_DIR: &str = "reports";
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
}
