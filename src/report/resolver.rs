//! Placeholder Resolver
//!
//! Substitutes `{{path}}` tokens in a section's literal content with values
//! drawn from a [`PeriodDataSet`].
//!
//! Supported syntax:
//! - `{{project.name}}`, `{{period.start}}`, `{{daily_logs.count}}`, ...
//! - indexed access: `{{daily_logs.first.date}}`, `{{quality_samples.2.result}}`
//! - `{{context.daily_logs}}` inserts the same block the generator sends
//! - `{{#each daily_logs}} ... {{/each}}` repeats its body per item; inside,
//!   `{{date}}`, `{{@index}}` and `{{@number}}` resolve against the item first
//!
//! Resolution is pure and deterministic. Any `{{...}}` that does not name a
//! known path, including malformed ones such as `{{Project Name}}`, follows a
//! single [`MissingTokenPolicy`] per resolver.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::collector::PeriodDataSet;
use super::context::{FieldLookup, FieldValue, render_block, weather_breakdown};
use crate::config::MissingTokenPolicy;
use crate::types::{
    ActivityEntry, DataSourceName, PhotoRecord, QualitySample, ResolvedSection, SectionTemplate,
};

static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}")
        .expect("valid placeholder regex")
});

// =============================================================================
// Template AST
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Token(String),
    Each { list: String, body: Vec<Node> },
}

/// Tokenize into a tree. An unterminated block runs to the end of the text;
/// a stray `{{/each}}` is dropped.
fn parse(text: &str) -> Vec<Node> {
    let mut stack: Vec<(Option<String>, Vec<Node>)> = vec![(None, Vec::new())];
    let mut last = 0;

    for caps in RE_TOKEN.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last
            && let Some((_, nodes)) = stack.last_mut()
        {
            nodes.push(Node::Text(text[last..whole.start()].to_string()));
        }
        last = whole.end();

        let inner = inner.as_str();
        if let Some(list) = each_list(inner) {
            stack.push((Some(list.trim().to_string()), Vec::new()));
        } else if inner == "/each" {
            if stack.len() > 1 {
                close_block(&mut stack);
            }
        } else if let Some((_, nodes)) = stack.last_mut() {
            nodes.push(Node::Token(inner.to_string()));
        }
    }

    if last < text.len()
        && let Some((_, nodes)) = stack.last_mut()
    {
        nodes.push(Node::Text(text[last..].to_string()));
    }

    while stack.len() > 1 {
        close_block(&mut stack);
    }
    stack.pop().map(|(_, nodes)| nodes).unwrap_or_default()
}

/// `#each <list>`; the list may be empty, which resolves as missing
fn each_list(inner: &str) -> Option<&str> {
    inner
        .strip_prefix("#each")
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn close_block(stack: &mut Vec<(Option<String>, Vec<Node>)>) {
    if let Some((Some(list), body)) = stack.pop()
        && let Some((_, parent)) = stack.last_mut()
    {
        parent.push(Node::Each { list, body });
    }
}

// =============================================================================
// Scopes
// =============================================================================

#[derive(Clone, Copy)]
enum Item<'a> {
    Activity(&'a ActivityEntry),
    Sample(&'a QualitySample),
    Photo(&'a PhotoRecord),
}

impl Item<'_> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match self {
            Self::Activity(e) => e.field(name),
            Self::Sample(s) => s.field(name),
            Self::Photo(p) => p.field(name),
        }
    }
}

struct Frame<'a> {
    item: Item<'a>,
    index: usize,
}

fn list_items<'a>(name: &str, data: &'a PeriodDataSet) -> Option<Vec<Item<'a>>> {
    Some(match name {
        "daily_logs" => data.daily_logs().iter().map(Item::Activity).collect(),
        "quality_samples" => data.quality_samples().iter().map(Item::Sample).collect(),
        "photos" => data.photos().items.iter().map(Item::Photo).collect(),
        _ => return None,
    })
}

/// `first`, `last`, or a 0-based index
fn select<'a>(items: &[Item<'a>], selector: &str) -> Option<Item<'a>> {
    match selector {
        "first" => items.first().copied(),
        "last" => items.last().copied(),
        n => n.parse::<usize>().ok().and_then(|i| items.get(i).copied()),
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Literal-substitution resolver for section content
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResolver {
    missing: MissingTokenPolicy,
}

impl PlaceholderResolver {
    pub fn new(missing: MissingTokenPolicy) -> Self {
        Self { missing }
    }

    pub fn policy(&self) -> MissingTokenPolicy {
        self.missing
    }

    /// Resolve a section's `base_content`; kind is always `substituted`
    pub fn resolve(&self, section: &SectionTemplate, data: &PeriodDataSet) -> ResolvedSection {
        ResolvedSection::substituted(
            section.section_key.clone(),
            section.title.clone(),
            self.render(&section.base_content, data),
        )
    }

    /// Substitute every token in `text`
    pub fn render(&self, text: &str, data: &PeriodDataSet) -> String {
        let nodes = parse(text);
        let mut out = String::with_capacity(text.len());
        let mut missing = Vec::new();
        let mut frames = Vec::new();
        self.render_nodes(&nodes, data, &mut frames, &mut out, &mut missing);

        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            debug!(tokens = ?missing, policy = ?self.missing, "Unresolved placeholders");
        }
        out
    }

    fn render_nodes<'a>(
        &self,
        nodes: &[Node],
        data: &'a PeriodDataSet,
        frames: &mut Vec<Frame<'a>>,
        out: &mut String,
        missing: &mut Vec<String>,
    ) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Token(path) => match lookup(path, data, frames) {
                    Some(value) => out.push_str(&escape_markup(&value)),
                    None => {
                        missing.push(path.clone());
                        self.push_missing(path, out);
                    }
                },
                Node::Each { list, body } => {
                    let Some(items) = list_items(list, data) else {
                        missing.push(format!("#each {}", list));
                        self.push_missing(list, out);
                        continue;
                    };
                    for (index, item) in items.into_iter().enumerate() {
                        frames.push(Frame { item, index });
                        self.render_nodes(body, data, frames, out, missing);
                        frames.pop();
                    }
                }
            }
        }
    }

    fn push_missing(&self, path: &str, out: &mut String) {
        if self.missing == MissingTokenPolicy::Marker {
            out.push_str("[missing: ");
            out.push_str(&escape_markup(path));
            out.push(']');
        }
    }
}

/// Innermost item scope first, then the root data set
fn lookup(path: &str, data: &PeriodDataSet, frames: &[Frame<'_>]) -> Option<String> {
    for frame in frames.iter().rev() {
        match path {
            "@index" => return Some(frame.index.to_string()),
            "@number" => return Some((frame.index + 1).to_string()),
            _ => {}
        }
        if let Some(value) = frame.item.field(path) {
            return Some(value.render());
        }
    }
    lookup_root(path, data)
}

fn lookup_root(path: &str, data: &PeriodDataSet) -> Option<String> {
    let segments: Vec<&str> = path.split('.').collect();
    let summary = data.summary();

    let value = match segments.as_slice() {
        ["project", field] => data.project().field(field)?,
        ["period", "start"] => FieldValue::Date(data.period().start()),
        ["period", "end"] => FieldValue::Date(data.period().end()),
        ["period", "days"] => FieldValue::Integer(data.period().days()),

        ["daily_logs", "count"] => FieldValue::count(summary.total_entries),
        ["daily_logs", "personnel_total"] => FieldValue::Integer(summary.personnel_days as i64),
        ["daily_logs", "personnel_average"] => FieldValue::Decimal(summary.average_personnel),
        ["daily_logs", "days_with_activity"] => FieldValue::count(summary.days_with_activity),
        ["daily_logs", "weather_breakdown"] => FieldValue::Text(weather_breakdown(data)),

        ["quality_samples", "count"] => FieldValue::count(summary.samples_total),
        ["quality_samples", "passed"] => FieldValue::count(summary.samples_passed),
        ["quality_samples", "failed"] => FieldValue::count(summary.samples_failed),
        ["quality_samples", "pending"] => FieldValue::count(summary.samples_pending),
        ["quality_samples", "pass_rate"] => FieldValue::Percent(summary.sample_pass_rate),

        ["photos", "count"] => FieldValue::count(summary.photo_count),

        [list, selector, field] => {
            let items = list_items(list, data)?;
            select(&items, selector)?.field(field)?
        }

        ["context", source] => {
            let source: DataSourceName = source.parse().ok()?;
            return Some(render_block(source, data).unwrap_or_default());
        }

        _ => return None,
    };

    Some(value.render())
}

/// Escape characters that would otherwise be read as markup
pub fn escape_markup(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
