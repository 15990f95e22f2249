//! Section markup parser
//!
//! Reads the safe markup subset section content is written in and produces
//! layout blocks. Unknown tags are stripped, never rendered.
//!
//! Content without any tag is treated as plain text: a blank line starts a
//! new paragraph and a single newline is a hard line break.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{FontStyle, Inline, Word};
use crate::constants::layout;

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("valid tag regex")
});

static RE_HAS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*[^>]*>").expect("valid tag probe regex"));

static RE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("valid attribute regex")
});

/// A layout unit produced from markup
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph { inlines: Vec<Inline> },
    /// `marker` is empty for continuation blocks inside the same item
    ListItem {
        marker: String,
        depth: usize,
        inlines: Vec<Inline>,
    },
    Rule,
    Image { alt: String, height: f32 },
}

#[derive(Debug)]
struct ListState {
    ordered: bool,
    counter: usize,
}

#[derive(Debug, Default)]
struct Parser {
    blocks: Vec<Block>,
    inlines: Vec<Inline>,
    bold: usize,
    italic: usize,
    heading: Option<u8>,
    lists: Vec<ListState>,
    /// Marker of the open list item, taken by its first flush
    item_marker: Option<String>,
    in_item: bool,
    pending_space: bool,
}

impl Parser {
    fn style(&self) -> FontStyle {
        FontStyle::from_flags(self.bold > 0 || self.heading.is_some(), self.italic > 0)
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        let style = self.style();

        if decoded.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        let mut first = true;
        for word in decoded.split_whitespace() {
            let space_before = if first { self.pending_space } else { true };
            self.inlines.push(Inline::Word(Word {
                text: word.to_string(),
                style,
                space_before,
            }));
            first = false;
        }
        if !first {
            self.pending_space = decoded.ends_with(char::is_whitespace);
        }
    }

    fn line_break(&mut self) {
        self.inlines.push(Inline::Break);
        self.pending_space = false;
    }

    /// Close the inline run into the current container block
    fn flush(&mut self) {
        self.pending_space = false;
        while matches!(self.inlines.last(), Some(Inline::Break)) {
            self.inlines.pop();
        }
        if self.inlines.is_empty() {
            return;
        }
        let inlines = std::mem::take(&mut self.inlines);

        let block = if let Some(level) = self.heading {
            Block::Heading { level, inlines }
        } else if self.in_item {
            Block::ListItem {
                marker: self.item_marker.take().unwrap_or_default(),
                depth: self.lists.len().max(1),
                inlines,
            }
        } else {
            Block::Paragraph { inlines }
        };
        self.blocks.push(block);
    }

    fn open(&mut self, name: &str, attrs: &str) {
        match name {
            "p" | "div" => self.flush(),
            "h1" | "h2" | "h3" => {
                self.flush();
                self.heading = name[1..].parse().ok();
            }
            "ul" | "ol" => {
                self.flush();
                self.lists.push(ListState {
                    ordered: name == "ol",
                    counter: 0,
                });
            }
            "li" => {
                self.flush();
                self.in_item = true;
                self.item_marker = Some(match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        list.counter += 1;
                        format!("{}.", list.counter)
                    }
                    _ => "-".to_string(),
                });
            }
            "strong" | "b" => self.bold += 1,
            "em" | "i" => self.italic += 1,
            "br" => self.line_break(),
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "img" => {
                self.flush();
                let alt = attribute(attrs, "alt")
                    .map(|a| decode_entities(&a))
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| "Image".to_string());
                let height = attribute(attrs, "height")
                    .and_then(|h| h.trim_end_matches("px").parse::<f32>().ok())
                    .filter(|h| h.is_finite() && *h > 0.0)
                    .unwrap_or(layout::DEFAULT_IMAGE_HEIGHT);
                self.blocks.push(Block::Image { alt, height });
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "p" | "div" => self.flush(),
            "h1" | "h2" | "h3" => {
                self.flush();
                self.heading = None;
            }
            "ul" | "ol" => {
                self.flush();
                self.lists.pop();
                self.in_item = !self.lists.is_empty();
            }
            "li" => {
                self.flush();
                self.in_item = false;
                self.item_marker = None;
            }
            "strong" | "b" => self.bold = self.bold.saturating_sub(1),
            "em" | "i" => self.italic = self.italic.saturating_sub(1),
            _ => {}
        }
    }
}

/// Parse section content into layout blocks
pub fn parse(content: &str) -> Vec<Block> {
    if !RE_HAS_TAG.is_match(content) {
        return parse_plain(content);
    }

    let mut parser = Parser::default();
    let mut last = 0;
    for caps in RE_TAG.captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            parser.text(&content[last..whole.start()]);
        }
        last = whole.end();

        let Some(name) = caps.get(2) else {
            // comment
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

        if closing {
            parser.close(&name);
        } else {
            parser.open(&name, attrs);
        }
    }
    if last < content.len() {
        parser.text(&content[last..]);
    }
    parser.flush();
    parser.blocks
}

fn parse_plain(content: &str) -> Vec<Block> {
    let normalized = content.replace("\r\n", "\n");
    let mut blocks = Vec::new();

    for paragraph in normalized.split("\n\n") {
        let mut inlines = Vec::new();
        for (i, line) in paragraph.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            if i > 0 {
                inlines.push(Inline::Break);
            }
            let decoded = decode_entities(line);
            for (j, word) in decoded.split_whitespace().enumerate() {
                inlines.push(Inline::Word(Word {
                    text: word.to_string(),
                    style: FontStyle::Regular,
                    space_before: j > 0,
                }));
            }
        }
        if !inlines.is_empty() {
            blocks.push(Block::Paragraph { inlines });
        }
    }
    blocks
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    RE_ATTR.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_string())
    })
}

/// Decode the entities the markup subset allows
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
