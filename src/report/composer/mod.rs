//! Document Composer
//!
//! Lays resolved sections, the period summary, and the signature grid onto
//! pages in one deterministic pass, then renders the pages to PDF.
//!
//! ## Phases
//!
//! 1. Header: title and project/period lines
//! 2. Sections: title, then content markup, in template order
//! 3. Summary: statistics computed by the collector
//! 4. Signatures: fixed two-column grid, one atomic row at a time
//!
//! Before any atomic block (a wrapped line, an image, a summary row, a
//! signature row) is placed, the cursor checks the remaining height and moves
//! to a new page when the block does not fit. A block taller than an empty
//! page is a [`ReportError::CompositionOverflow`].

mod cursor;
mod markup;
mod page;
mod pdf;
mod text;

pub use cursor::LayoutCursor;
pub use page::PageConfig;
pub use text::{FontStyle, TextRun, text_width};

use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use super::collector::PeriodSummary;
use super::context::{format_decimal, format_percent};
use crate::constants::layout::{BLOCK_GAP, LIST_INDENT, SIGNATURE_COLUMNS};
use crate::types::{ReportError, ResolvedSection, Result, SignatureEntry, SignatureMark};
use markup::Block;
use text::{Inline, words, wrap};

/// Spacing requested before a section title
const SECTION_GAP: f32 = BLOCK_GAP * 2.0;

const OVERFLOW_EPSILON: f32 = 0.01;

// =============================================================================
// Page Model
// =============================================================================

/// What a drawn block shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockContent {
    Text {
        runs: Vec<TextRun>,
        font_size: f32,
    },
    Rule,
    /// Framed placeholder for an image
    Image {
        alt: String,
    },
    Signature {
        signer_name: String,
        role: String,
        mark: SignatureMark,
        signed_at: Option<NaiveDate>,
    },
    /// Page numbering, drawn in the bottom margin
    Footer {
        text: String,
        font_size: f32,
    },
}

/// A block placed on a page; `y` is measured down from the top edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnBlock {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub content: BlockContent,
}

impl DrawnBlock {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_footer(&self) -> bool {
        matches!(self.content, BlockContent::Footer { .. })
    }

    /// Concatenated run text of a text block
    pub fn text(&self) -> Option<String> {
        match &self.content {
            BlockContent::Text { runs, .. } => Some(
                runs.iter()
                    .map(|r| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            BlockContent::Footer { text, .. } => Some(text.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based page number
    pub number: usize,
    pub blocks: Vec<DrawnBlock>,
}

impl Page {
    fn new(number: usize) -> Self {
        Self {
            number,
            blocks: Vec::new(),
        }
    }

    /// Number of signature cells on this page
    pub fn signature_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b.content, BlockContent::Signature { .. }))
            .count()
    }
}

/// The finished, immutable report artifact
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pages: Vec<Page>,
    bytes: Vec<u8>,
    digest: String,
}

impl ComposedDocument {
    fn new(pages: Vec<Page>, bytes: Vec<u8>) -> Self {
        let digest = format!("{:x}", Sha256::digest(&bytes));
        Self {
            pages,
            bytes,
            digest,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Hex sha256 of the rendered bytes
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

// =============================================================================
// Composer Input
// =============================================================================

/// Title block drawn at the top of page 1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentHeader {
    pub title: String,
    pub lines: Vec<String>,
}

impl DocumentHeader {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }
}

/// Label/value rows of the summary phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryTable {
    pub rows: Vec<(String, String)>,
}

impl SummaryTable {
    /// Rows for statistics the collector already derived
    pub fn from_summary(summary: &PeriodSummary) -> Self {
        let mut rows = vec![
            ("Daily log entries".to_string(), summary.total_entries.to_string()),
            (
                "Days with activity".to_string(),
                summary.days_with_activity.to_string(),
            ),
            ("Personnel-days".to_string(), summary.personnel_days.to_string()),
            (
                "Average personnel".to_string(),
                format_decimal(summary.average_personnel),
            ),
            (
                "Quality samples".to_string(),
                format!(
                    "{} (passed {}, failed {}, pending {})",
                    summary.samples_total,
                    summary.samples_passed,
                    summary.samples_failed,
                    summary.samples_pending
                ),
            ),
            (
                "Sample pass rate".to_string(),
                format_percent(summary.sample_pass_rate),
            ),
            ("Photos".to_string(), summary.photo_count.to_string()),
        ];
        if !summary.weather_days.is_empty() {
            let weather = summary
                .weather_days
                .iter()
                .map(|(condition, days)| format!("{} {}", condition, days))
                .collect::<Vec<_>>()
                .join(", ");
            rows.push(("Weather".to_string(), weather));
        }
        Self { rows }
    }
}

/// Everything one composition pass lays out
#[derive(Debug, Clone, Copy)]
pub struct ComposeInput<'a> {
    pub header: &'a DocumentHeader,
    /// Already in template display order
    pub sections: &'a [ResolvedSection],
    pub summary: Option<&'a SummaryTable>,
    pub signatures: &'a [SignatureEntry],
}

// =============================================================================
// Composer
// =============================================================================

#[derive(Debug, Clone)]
pub struct Composer {
    config: PageConfig,
}

impl Composer {
    pub fn new(config: PageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Lay out and render the document
    #[instrument(skip_all, fields(sections = input.sections.len(), signatures = input.signatures.len()))]
    pub fn compose(&self, input: &ComposeInput<'_>) -> Result<ComposedDocument> {
        let pages = self.layout(input)?;
        let bytes = pdf::render(&pages, &self.config)?;
        let document = ComposedDocument::new(pages, bytes);
        info!(
            "Composed {} pages ({} bytes)",
            document.page_count(),
            document.byte_size()
        );
        Ok(document)
    }

    /// The page model alone, without rendering
    pub fn layout(&self, input: &ComposeInput<'_>) -> Result<Vec<Page>> {
        let mut builder = PageBuilder::new(&self.config);

        builder.header(input.header)?;
        for section in input.sections {
            builder.section(section)?;
        }
        if let Some(summary) = input.summary {
            builder.summary(summary)?;
        }
        if !input.signatures.is_empty() {
            builder.signatures(input.signatures)?;
        }

        let pages = builder.finish();
        debug!(pages = pages.len(), "Layout complete");
        Ok(pages)
    }
}

/// Single-use layout state for one document
struct PageBuilder<'c> {
    config: &'c PageConfig,
    cursor: LayoutCursor,
    pages: Vec<Page>,
}

impl<'c> PageBuilder<'c> {
    fn new(config: &'c PageConfig) -> Self {
        Self {
            config,
            cursor: LayoutCursor::new(config),
            pages: vec![Page::new(1)],
        }
    }

    fn left(&self) -> f32 {
        self.config.margin_left
    }

    fn body_line(&self) -> f32 {
        self.config.line_height(self.config.body_font_size)
    }

    /// Reserve `height` for an atomic block and return its top y.
    ///
    /// `keep_with` is extra room the following block needs on the same page.
    fn place(&mut self, height: f32, keep_with: f32, section_key: &str) -> Result<f32> {
        let available = self.config.usable_height();
        if height > available + OVERFLOW_EPSILON {
            return Err(ReportError::CompositionOverflow {
                section_key: section_key.to_string(),
                required_height: height,
                available_height: available,
            });
        }

        if self.cursor.at_page_top() {
            self.cursor.clear_gap();
        }
        let needed = self.cursor.pending_gap() + height + keep_with;
        if !self.cursor.fits(needed) && !self.cursor.at_page_top() {
            self.cursor.new_page();
            self.pages.push(Page::new(self.pages.len() + 1));
        }
        self.cursor.apply_gap();

        let y = self.cursor.y();
        self.cursor.advance(height);
        Ok(y)
    }

    fn push(&mut self, block: DrawnBlock) {
        let page = self.cursor.page();
        if let Some(page) = self.pages.get_mut(page) {
            page.blocks.push(block);
        }
    }

    /// Wrap `inlines` and place each line atomically
    fn text_lines(
        &mut self,
        inlines: &[Inline],
        font_size: f32,
        indent: f32,
        marker: Option<&str>,
        keep_last_with: f32,
        section_key: &str,
    ) -> Result<()> {
        let text_x = if marker.is_some() { LIST_INDENT } else { 0.0 };
        let width = self.config.content_width() - indent - text_x;
        let line_height = self.config.line_height(font_size);
        let lines = wrap(inlines, width.max(font_size), font_size);
        let count = lines.len();

        for (i, line) in lines.into_iter().enumerate() {
            let keep = if i + 1 == count { keep_last_with } else { 0.0 };
            let y = self.place(line_height, keep, section_key)?;

            let mut runs: Vec<TextRun> = Vec::with_capacity(line.len() + 1);
            if i == 0
                && let Some(marker) = marker.filter(|m| !m.is_empty())
            {
                runs.push(TextRun::plain(marker, FontStyle::Regular));
            }
            runs.extend(line.into_iter().map(|r| {
                let x = r.x + text_x;
                r.at(x)
            }));

            self.push(DrawnBlock {
                x: self.left() + indent,
                y,
                width: self.config.content_width() - indent,
                height: line_height,
                content: BlockContent::Text { runs, font_size },
            });
        }
        Ok(())
    }

    fn rule(&mut self, section_key: &str) -> Result<()> {
        let height = BLOCK_GAP * 2.0;
        let y = self.place(height, 0.0, section_key)?;
        self.push(DrawnBlock {
            x: self.left(),
            y,
            width: self.config.content_width(),
            height,
            content: BlockContent::Rule,
        });
        Ok(())
    }

    fn header(&mut self, header: &DocumentHeader) -> Result<()> {
        let title = words(&header.title, FontStyle::Bold);
        self.text_lines(&title, self.config.title_font_size, 0.0, None, 0.0, "header")?;
        self.cursor.gap(BLOCK_GAP);

        for line in &header.lines {
            let inlines = words(line, FontStyle::Regular);
            self.text_lines(&inlines, self.config.body_font_size, 0.0, None, 0.0, "header")?;
        }
        self.rule("header")?;
        self.cursor.gap(BLOCK_GAP);
        Ok(())
    }

    fn section_title(&mut self, title: &str, keep_with: f32, section_key: &str) -> Result<()> {
        self.cursor.gap(SECTION_GAP);
        let inlines = words(title, FontStyle::Bold);
        self.text_lines(
            &inlines,
            self.config.section_title_font_size,
            0.0,
            None,
            keep_with,
            section_key,
        )?;
        self.cursor.gap(BLOCK_GAP / 2.0);
        Ok(())
    }

    fn section(&mut self, section: &ResolvedSection) -> Result<()> {
        let key = section.section_key.as_str();
        let blocks = markup::parse(&section.content);
        let keep = if blocks.is_empty() { 0.0 } else { self.body_line() };
        self.section_title(&section.title, keep, key)?;

        let body = self.config.body_font_size;
        for block in blocks {
            match block {
                Block::Heading { level, inlines } => {
                    let size = match level {
                        1 => self.config.section_title_font_size,
                        2 => body + 2.0,
                        _ => body + 1.0,
                    };
                    self.cursor.gap(BLOCK_GAP);
                    let keep = self.body_line();
                    self.text_lines(&inlines, size, 0.0, None, keep, key)?;
                    self.cursor.gap(BLOCK_GAP / 2.0);
                }
                Block::Paragraph { inlines } => {
                    self.text_lines(&inlines, body, 0.0, None, 0.0, key)?;
                    self.cursor.gap(BLOCK_GAP);
                }
                Block::ListItem {
                    marker,
                    depth,
                    inlines,
                } => {
                    let indent = LIST_INDENT * depth.saturating_sub(1) as f32;
                    self.text_lines(&inlines, body, indent, Some(&marker), 0.0, key)?;
                    self.cursor.gap(BLOCK_GAP / 2.0);
                }
                Block::Rule => {
                    self.rule(key)?;
                }
                Block::Image { alt, height } => {
                    let y = self.place(height, 0.0, key)?;
                    self.push(DrawnBlock {
                        x: self.left(),
                        y,
                        width: self.config.content_width(),
                        height,
                        content: BlockContent::Image { alt },
                    });
                    self.cursor.gap(BLOCK_GAP);
                }
            }
        }
        Ok(())
    }

    fn summary(&mut self, summary: &SummaryTable) -> Result<()> {
        if summary.rows.is_empty() {
            return Ok(());
        }
        let line_height = self.body_line();
        self.section_title("Period Summary", line_height, "summary")?;

        let value_x = self.config.content_width() * 0.45;
        let font_size = self.config.body_font_size;
        for (label, value) in &summary.rows {
            let y = self.place(line_height, 0.0, "summary")?;
            self.push(DrawnBlock {
                x: self.left(),
                y,
                width: self.config.content_width(),
                height: line_height,
                content: BlockContent::Text {
                    runs: vec![
                        TextRun::plain(label.as_str(), FontStyle::Bold),
                        TextRun::plain(value.as_str(), FontStyle::Regular).at(value_x),
                    ],
                    font_size,
                },
            });
        }
        self.cursor.gap(BLOCK_GAP);
        Ok(())
    }

    fn signatures(&mut self, signatures: &[SignatureEntry]) -> Result<()> {
        let row_height = self.config.signature_row_height;
        self.section_title("Signatures", row_height, "signatures")?;

        let column_width = self.config.content_width() / SIGNATURE_COLUMNS as f32;
        for row in signatures.chunks(SIGNATURE_COLUMNS) {
            let y = self.place(row_height, 0.0, "signatures")?;
            for (column, entry) in row.iter().enumerate() {
                self.push(DrawnBlock {
                    x: self.left() + column as f32 * column_width,
                    y,
                    width: column_width,
                    height: row_height,
                    content: BlockContent::Signature {
                        signer_name: entry.signer_name.clone(),
                        role: entry.role.clone(),
                        mark: entry.image_or_mark.clone(),
                        signed_at: entry.signed_at,
                    },
                });
            }
        }
        Ok(())
    }

    /// Add "Page N of M" footers once the page count is known
    fn finish(mut self) -> Vec<Page> {
        let total = self.pages.len();
        let font_size = self.config.footer_font_size;
        let height = self.config.line_height(font_size);
        let y = self.config.content_bottom() + (self.config.margin_bottom - height).max(0.0) / 2.0;
        let right = self.config.margin_left + self.config.content_width();

        for page in &mut self.pages {
            let text = format!("Page {} of {}", page.number, total);
            let width = text_width(&text, font_size, FontStyle::Regular);
            page.blocks.push(DrawnBlock {
                x: right - width,
                y,
                width,
                height,
                content: BlockContent::Footer { text, font_size },
            });
        }
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolutionKind;
    use proptest::prelude::*;

    fn section(key: &str, content: &str) -> ResolvedSection {
        ResolvedSection {
            section_key: key.into(),
            title: format!("Section {}", key),
            content: content.into(),
            resolution_kind: ResolutionKind::Substituted,
            usage: None,
        }
    }

    fn signatures(n: usize) -> Vec<SignatureEntry> {
        (0..n)
            .map(|i| SignatureEntry::new(format!("Signer {}", i + 1), "Inspector"))
            .collect()
    }

    fn header() -> DocumentHeader {
        DocumentHeader::new("Weekly Report").line("Project: Riverside Bridge (RB-01)")
    }

    fn layout(config: PageConfig, sections: &[ResolvedSection], sigs: &[SignatureEntry]) -> Result<Vec<Page>> {
        let header = header();
        Composer::new(config)?.layout(&ComposeInput {
            header: &header,
            sections,
            summary: None,
            signatures: sigs,
        })
    }

    fn content_blocks(page: &Page) -> impl Iterator<Item = &DrawnBlock> {
        page.blocks.iter().filter(|b| !b.is_footer())
    }

    #[test]
    fn test_signature_rows_break_across_pages() {
        let config = PageConfig::a4();
        let row = config.signature_row_height;
        let sections = [section("intro", "<p>Short introduction.</p>")];

        let probe = layout(config.clone(), &sections, &signatures(1)).unwrap();
        let first_row_y = probe[0]
            .blocks
            .iter()
            .find(|b| matches!(b.content, BlockContent::Signature { .. }))
            .map(|b| b.y)
            .unwrap();

        // room for exactly two rows on page 1
        let tight = PageConfig {
            height: first_row_y + 2.0 * row + config.margin_bottom + 0.5,
            ..config
        };
        let pages = layout(tight, &sections, &signatures(5)).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].signature_count(), 4);
        assert_eq!(pages[1].signature_count(), 1);

        let cells: Vec<_> = pages[0]
            .blocks
            .iter()
            .filter(|b| matches!(b.content, BlockContent::Signature { .. }))
            .collect();
        assert_eq!(cells[0].y, cells[1].y);
        assert!(cells[1].x > cells[0].x);
        assert!((cells[2].y - cells[0].y - row).abs() < 1e-3);
    }

    #[test]
    fn test_oversized_block_is_fatal() {
        let sections = [section(
            "photos",
            "<p>Evidence</p><img alt=\"Site plan\" height=\"2000\">",
        )];
        let err = layout(PageConfig::a4(), &sections, &[]).unwrap_err();
        match err {
            ReportError::CompositionOverflow {
                section_key,
                required_height,
                available_height,
            } => {
                assert_eq!(section_key, "photos");
                assert_eq!(required_height, 2000.0);
                assert!(available_height < 2000.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let sections = [
            section("a", "<h2>Works</h2><ul><li>Pier 1</li><li>Pier 2 <em>delayed</em></li></ul>"),
            section("b", &"Long paragraph text. ".repeat(400)),
        ];
        let first = layout(PageConfig::a4(), &sections, &signatures(3)).unwrap();
        let second = layout(PageConfig::a4(), &sections, &signatures(3)).unwrap();
        assert_eq!(first, second);
        assert!(first.len() > 1);
    }

    #[test]
    fn test_footer_numbers_every_page() {
        let sections = [section("long", &"word ".repeat(3000))];
        let pages = layout(PageConfig::a4(), &sections, &[]).unwrap();
        let total = pages.len();
        assert!(total > 1);
        for page in &pages {
            let footers: Vec<_> = page.blocks.iter().filter(|b| b.is_footer()).collect();
            assert_eq!(footers.len(), 1);
            assert_eq!(
                footers[0].text().unwrap(),
                format!("Page {} of {}", page.number, total)
            );
            assert!(footers[0].y >= PageConfig::a4().content_bottom());
        }
    }

    #[test]
    fn test_sections_keep_template_order() {
        let sections = [section("first", "one"), section("second", "two")];
        let pages = layout(PageConfig::a4(), &sections, &[]).unwrap();
        let texts: Vec<String> = pages[0].blocks.iter().filter_map(|b| b.text()).collect();
        let first = texts.iter().position(|t| t == "Section first").unwrap();
        let second = texts.iter().position(|t| t == "Section second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_summary_rows_render_collector_values() {
        let summary = PeriodSummary {
            total_entries: 10,
            sample_pass_rate: 87.5,
            ..PeriodSummary::default()
        };
        let table = SummaryTable::from_summary(&summary);
        assert!(table.rows.contains(&("Daily log entries".to_string(), "10".to_string())));
        assert!(table.rows.contains(&("Sample pass rate".to_string(), "87,5%".to_string())));

        let header = header();
        let pages = Composer::new(PageConfig::a4())
            .unwrap()
            .layout(&ComposeInput {
                header: &header,
                sections: &[],
                summary: Some(&table),
                signatures: &[],
            })
            .unwrap();
        assert!(pages[0].blocks.iter().any(|b| b.text().as_deref() == Some("Period Summary")));
    }

    #[test]
    fn test_compose_renders_pdf() {
        let header = header();
        let sections = [section("intro", "<p>Entregado &amp; revisado</p>")];
        let sigs = signatures(2);
        let input = ComposeInput {
            header: &header,
            sections: &sections,
            summary: None,
            signatures: &sigs,
        };
        let composer = Composer::new(PageConfig::a4()).unwrap();
        let document = composer.compose(&input).unwrap();

        assert!(document.bytes().starts_with(b"%PDF-"));
        assert_eq!(document.byte_size(), document.bytes().len());
        assert_eq!(document.page_count(), 1);
        assert_eq!(document.digest().len(), 64);

        let again = composer.compose(&input).unwrap();
        assert_eq!(document.digest(), again.digest());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_blocks_stay_inside_content_area(
            paragraphs in proptest::collection::vec((1usize..120, 0usize..3), 1..12),
            signature_count in 0usize..9,
            height in 300.0f32..900.0,
        ) {
            let config = PageConfig { height, ..PageConfig::a4() };
            let sections: Vec<ResolvedSection> = paragraphs
                .iter()
                .enumerate()
                .map(|(i, (word_count, images))| {
                    let mut content = format!("<p>{}</p>", "lorem ipsum ".repeat(*word_count));
                    for _ in 0..*images {
                        content.push_str("<img alt=\"photo\" height=\"60\">");
                    }
                    section(&format!("s{}", i), &content)
                })
                .collect();

            let pages = layout(config.clone(), &sections, &signatures(signature_count)).unwrap();
            let limit = config.content_bottom();
            // largest collapsed gap plus the largest keep-with-next reservation
            let slack = SECTION_GAP + config.signature_row_height;

            for (index, page) in pages.iter().enumerate() {
                for block in content_blocks(page) {
                    prop_assert!(block.y >= config.margin_top - 0.01);
                    prop_assert!(block.bottom() <= limit + 0.01);
                }
                if index > 0 {
                    let previous_bottom = content_blocks(&pages[index - 1])
                        .map(|b| b.bottom())
                        .fold(config.margin_top, f32::max);
                    let first = content_blocks(page).next();
                    prop_assert!(first.is_some());
                    if let Some(first) = first {
                        // the first block on a new page never fit on the previous one
                        prop_assert!(previous_bottom + first.height + slack > limit);
                    }
                }
            }
        }
    }
}
