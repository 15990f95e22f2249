//! Text measurement and line wrapping
//!
//! Widths approximate Helvetica metrics by character class, which is all the
//! layout needs to wrap lines deterministically.

use serde::Serialize;

/// One of the four standard Helvetica faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Self::Regular,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (true, true) => Self::BoldItalic,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    /// Resource name used in page content streams
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Italic => "F3",
            Self::BoldItalic => "F4",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
            Self::Italic => "Helvetica-Oblique",
            Self::BoldItalic => "Helvetica-BoldOblique",
        }
    }

    pub const ALL: [FontStyle; 4] = [Self::Regular, Self::Bold, Self::Italic, Self::BoldItalic];
}

/// Advance width of `c` in em units
pub fn char_width(c: char) -> f32 {
    match c {
        ' ' => 0.278,
        'i' | 'l' | 'j' | 't' | 'f' | 'r' | 'I' | '.' | ',' | ';' | ':' | '\'' | '!' | '|'
        | '(' | ')' | '[' | ']' => 0.28,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.83,
        '0'..='9' => 0.556,
        c if c.is_uppercase() => 0.67,
        _ => 0.5,
    }
}

pub fn text_width(text: &str, font_size: f32, style: FontStyle) -> f32 {
    let em: f32 = text.chars().map(char_width).sum();
    let factor = if style.is_bold() { 1.08 } else { 1.0 };
    em * font_size * factor
}

/// A word with its style and whether whitespace preceded it
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub style: FontStyle,
    pub space_before: bool,
}

/// Inline flow content
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Word(Word),
    /// Hard line break
    Break,
}

/// A positioned span of same-style text; `x` is relative to the line start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub style: FontStyle,
    pub x: f32,
}

impl TextRun {
    pub fn plain(text: impl Into<String>, style: FontStyle) -> Self {
        Self {
            text: text.into(),
            style,
            x: 0.0,
        }
    }

    pub fn at(mut self, x: f32) -> Self {
        self.x = x;
        self
    }
}

const WRAP_EPSILON: f32 = 0.01;

/// Greedy wrap into lines no wider than `max_width`.
///
/// Lines break between words only; a word wider than a whole line is cut into
/// line-sized chunks.
pub fn wrap(inlines: &[Inline], max_width: f32, font_size: f32) -> Vec<Vec<TextRun>> {
    let mut lines = Vec::new();
    let mut line: Vec<TextRun> = Vec::new();
    let mut x = 0.0_f32;

    for inline in inlines {
        let word = match inline {
            Inline::Break => {
                lines.push(std::mem::take(&mut line));
                x = 0.0;
                continue;
            }
            Inline::Word(word) => word,
        };

        for (i, piece) in split_to_fit(&word.text, max_width, font_size, word.style)
            .into_iter()
            .enumerate()
        {
            let width = text_width(&piece, font_size, word.style);
            let mut space = if i == 0 && word.space_before && !line.is_empty() {
                text_width(" ", font_size, word.style)
            } else {
                0.0
            };

            if !line.is_empty() && x + space + width > max_width + WRAP_EPSILON {
                lines.push(std::mem::take(&mut line));
                x = 0.0;
                space = 0.0;
            }

            match line.last_mut() {
                Some(last) if last.style == word.style => {
                    if space > 0.0 {
                        last.text.push(' ');
                    }
                    last.text.push_str(&piece);
                }
                _ => line.push(TextRun {
                    text: piece,
                    style: word.style,
                    x: x + space,
                }),
            }
            x += space + width;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn split_to_fit(text: &str, max_width: f32, font_size: f32, style: FontStyle) -> Vec<String> {
    if text_width(text, font_size, style) <= max_width + WRAP_EPSILON {
        return vec![text.to_string()];
    }

    let factor = if style.is_bold() { 1.08 } else { 1.0 };
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut width = 0.0_f32;
    for c in text.chars() {
        let w = char_width(c) * font_size * factor;
        if !chunk.is_empty() && width + w > max_width + WRAP_EPSILON {
            chunks.push(std::mem::take(&mut chunk));
            width = 0.0;
        }
        chunk.push(c);
        width += w;
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

/// Split plain text into words with the given style
pub fn words(text: &str, style: FontStyle) -> Vec<Inline> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| {
            Inline::Word(Word {
                text: w.to_string(),
                style,
                space_before: i > 0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &[TextRun]) -> String {
        line.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join("|")
    }

    #[test]
    fn test_width_by_character_class() {
        assert!((text_width("il", 10.0, FontStyle::Regular) - 5.6).abs() < 1e-4);
        assert!((text_width("MW", 10.0, FontStyle::Regular) - 16.6).abs() < 1e-4);
        assert!(
            text_width("Report", 10.0, FontStyle::Bold)
                > text_width("Report", 10.0, FontStyle::Regular)
        );
    }

    #[test]
    fn test_wrap_breaks_between_words() {
        let inlines = words("aaaa aaaa aaaa", FontStyle::Regular);
        // each word is 20pt wide at 10pt, a space is 2.78pt
        let lines = wrap(&inlines, 45.0, 10.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(line_text(&lines[0]), "aaaa aaaa");
        assert_eq!(line_text(&lines[1]), "aaaa");
    }

    #[test]
    fn test_long_word_is_chunked() {
        let inlines = words("aaaaaaaaaa", FontStyle::Regular);
        let lines = wrap(&inlines, 20.0, 10.0);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| {
            l.iter()
                .all(|r| text_width(&r.text, 10.0, r.style) <= 20.0 + WRAP_EPSILON)
        }));
    }

    #[test]
    fn test_styles_produce_separate_runs() {
        let mut inlines = words("plain", FontStyle::Regular);
        inlines.push(Inline::Word(Word {
            text: "bold".into(),
            style: FontStyle::Bold,
            space_before: true,
        }));
        let lines = wrap(&inlines, 500.0, 10.0);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[0][1].style, FontStyle::Bold);
        let expected_x = text_width("plain", 10.0, FontStyle::Regular)
            + text_width(" ", 10.0, FontStyle::Bold);
        assert!((lines[0][1].x - expected_x).abs() < 1e-4);
    }

    #[test]
    fn test_hard_break_keeps_empty_line() {
        let mut inlines = words("one", FontStyle::Regular);
        inlines.push(Inline::Break);
        inlines.push(Inline::Break);
        inlines.extend(words("two", FontStyle::Regular));
        let lines = wrap(&inlines, 500.0, 10.0);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].is_empty());
    }
}
