//! PDF rendering of laid-out pages
//!
//! Writes one content stream per page with the four standard Helvetica faces.
//! Output carries no timestamps or random ids, so equal pages give equal bytes.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::page::PageConfig;
use super::text::{FontStyle, text_width};
use super::{BlockContent, DrawnBlock, Page};
use crate::report::context::format_date;
use crate::types::{Result, SignatureMark};

/// Baseline offset below the top of a line box, as a fraction of font size
const ASCENT: f32 = 0.8;

const RULE_GRAY: f32 = 0.6;

pub fn render(pages: &[Page], config: &PageConfig) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for style in FontStyle::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => style.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(style.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page, config),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0_i64.into(), 0_i64.into(), config.width.into(), config.height.into()],
        }),
    );

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_text(&config.title)),
        "Producer" => Object::string_literal("sitereport"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn page_operations(page: &Page, config: &PageConfig) -> Vec<Operation> {
    let mut ops = Vec::new();
    for block in &page.blocks {
        match &block.content {
            BlockContent::Text { runs, font_size } => {
                let baseline = baseline(block.y, block.height, *font_size);
                for run in runs {
                    show_text(&mut ops, config, &run.text, run.style, *font_size, block.x + run.x, baseline);
                }
            }
            BlockContent::Footer { text, font_size } => {
                let baseline = baseline(block.y, block.height, *font_size);
                show_text(&mut ops, config, text, FontStyle::Regular, *font_size, block.x, baseline);
            }
            BlockContent::Rule => {
                let y = block.y + block.height / 2.0;
                stroke_line(&mut ops, config, block.x, y, block.x + block.width, y, RULE_GRAY);
            }
            BlockContent::Image { alt } => image_placeholder(&mut ops, config, block, alt),
            BlockContent::Signature {
                signer_name,
                role,
                mark,
                signed_at,
            } => {
                let size = config.body_font_size;
                let line_height = config.line_height(size);
                let inset = size;
                let left = block.x + inset;
                let right = block.x + block.width - inset;
                let line_y = block.y + block.height - 3.0 * line_height;

                let mark_text = match mark {
                    SignatureMark::Mark(text) => text.clone(),
                    SignatureMark::Image(reference) => format!("[signature: {}]", reference),
                };
                show_text(
                    &mut ops,
                    config,
                    &mark_text,
                    FontStyle::Italic,
                    size + 2.0,
                    left,
                    line_y - size * 0.5,
                );
                stroke_line(&mut ops, config, left, line_y, right, line_y, 0.0);

                let name_y = line_y + line_height;
                show_text(&mut ops, config, signer_name, FontStyle::Bold, size, left, name_y);
                show_text(&mut ops, config, role, FontStyle::Regular, size, left, name_y + line_height);
                if let Some(date) = signed_at {
                    let text = format_date(*date);
                    let x = right - text_width(&text, size, FontStyle::Regular);
                    show_text(&mut ops, config, &text, FontStyle::Regular, size, x, name_y);
                }
            }
        }
    }
    ops
}

fn baseline(top: f32, height: f32, font_size: f32) -> f32 {
    top + (height - font_size) / 2.0 + font_size * ASCENT
}

/// Draw `text` with its baseline at `y` (measured down from the top edge)
fn show_text(
    ops: &mut Vec<Operation>,
    config: &PageConfig,
    text: &str,
    style: FontStyle,
    font_size: f32,
    x: f32,
    y: f32,
) {
    if text.is_empty() {
        return;
    }
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![style.resource_name().into(), font_size.into()],
    ));
    ops.push(Operation::new(
        "Td",
        vec![x.into(), (config.height - y).into()],
    ));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(encode_text(text))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn stroke_line(
    ops: &mut Vec<Operation>,
    config: &PageConfig,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    gray: f32,
) {
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("G", vec![gray.into()]));
    ops.push(Operation::new("w", vec![0.5_f32.into()]));
    ops.push(Operation::new("m", vec![x1.into(), (config.height - y1).into()]));
    ops.push(Operation::new("l", vec![x2.into(), (config.height - y2).into()]));
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

fn image_placeholder(ops: &mut Vec<Operation>, config: &PageConfig, block: &DrawnBlock, alt: &str) {
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("G", vec![RULE_GRAY.into()]));
    ops.push(Operation::new("w", vec![0.5_f32.into()]));
    ops.push(Operation::new(
        "re",
        vec![
            block.x.into(),
            (config.height - block.bottom()).into(),
            block.width.into(),
            block.height.into(),
        ],
    ));
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("Q", vec![]));

    let size = config.body_font_size;
    let label = format!("[{}]", alt);
    let width = text_width(&label, size, FontStyle::Italic);
    let x = block.x + ((block.width - width) / 2.0).max(0.0);
    let y = block.y + block.height / 2.0 + size * 0.35;
    show_text(ops, config, &label, FontStyle::Italic, size, x, y);
}

/// Encode text for a WinAnsi-encoded standard font.
///
/// Latin-1 maps directly; a few common typographic characters map to their
/// Windows-1252 slots and anything else becomes `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{a0}' => b' ',
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (c as u32) < 0x80 => c as u8,
            c if (0xa0..=0xff).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::composer::TextRun;

    fn page(blocks: Vec<DrawnBlock>) -> Page {
        Page { number: 1, blocks }
    }

    #[test]
    fn test_encode_text_win_ansi() {
        assert_eq!(encode_text("Año"), vec![b'A', 0xf1, b'o']);
        assert_eq!(encode_text("a – b"), vec![b'a', b' ', 0x96, b' ', b'b']);
        assert_eq!(encode_text("漢"), vec![b'?']);
    }

    #[test]
    fn test_render_page_count_and_determinism() {
        let config = PageConfig::a4();
        let text = DrawnBlock {
            x: 56.0,
            y: 56.0,
            width: 400.0,
            height: 14.0,
            content: BlockContent::Text {
                runs: vec![TextRun::plain("Pier 3 concreted", FontStyle::Bold)],
                font_size: 10.0,
            },
        };
        let pages = vec![page(vec![text.clone()]), Page { number: 2, blocks: vec![text] }];

        let first = render(&pages, &config).unwrap();
        let second = render(&pages, &config).unwrap();
        assert_eq!(first, second);

        let doc = Document::load_mem(&first).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_text_lands_in_content_stream() {
        let config = PageConfig::a4();
        let block = DrawnBlock {
            x: 56.0,
            y: 100.0,
            width: 400.0,
            height: 14.0,
            content: BlockContent::Text {
                runs: vec![TextRun::plain("Formwork inspected", FontStyle::Regular)],
                font_size: 10.0,
            },
        };
        let bytes = render(&[page(vec![block])], &config).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let content = doc.get_page_content(page_id).unwrap();
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("(Formwork inspected) Tj"));
    }

    #[test]
    fn test_baseline_inside_line_box() {
        let b = baseline(100.0, 14.0, 10.0);
        assert!(b > 100.0 && b < 114.0);
    }
}
