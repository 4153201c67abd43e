//! Pure filtering, sorting and highlighting over an in-memory snapshot of
//! the notes. Nothing here touches storage; both the popup and the
//! dashboard feed it whatever they last loaded.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::{convert::Infallible, fmt, ops::Range, str::FromStr};

use crate::models::{Note, NoteWithUrl, NotesByUrl};

pub const MARK_OPEN: &str = r#"<mark class="highlight">"#;
pub const MARK_CLOSE: &str = "</mark>";

/// Restricts a listing to one page, or to none at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UrlFilter {
    #[default]
    All,
    Url(String),
}

impl UrlFilter {
    pub const ALL: &'static str = "all";

    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::All => true,
            Self::Url(wanted) => wanted == url,
        }
    }
}

impl From<&str> for UrlFilter {
    fn from(value: &str) -> Self {
        if value == Self::ALL {
            Self::All
        } else {
            Self::Url(value.to_string())
        }
    }
}

impl From<String> for UrlFilter {
    fn from(value: String) -> Self {
        if value == Self::ALL {
            Self::All
        } else {
            Self::Url(value)
        }
    }
}

impl From<UrlFilter> for String {
    fn from(value: UrlFilter) -> Self {
        match value {
            UrlFilter::All => UrlFilter::ALL.to_string(),
            UrlFilter::Url(url) => url,
        }
    }
}

impl FromStr for UrlFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

/// Display order of a listing. Both orders put the latest timestamp first:
/// `Newest` looks at the last update, `Oldest` at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newest => f.write_str("newest"),
            Self::Oldest => f.write_str("oldest"),
        }
    }
}

pub fn filter_by_url(notes: &NotesByUrl, filter: &UrlFilter) -> NotesByUrl {
    notes
        .iter()
        .filter(|(url, _)| filter.matches(url))
        .map(|(url, bucket)| (url.clone(), bucket.clone()))
        .collect()
}

/// Every note of every page, annotated with its page, in page order then
/// bucket order.
pub fn flatten(notes: &NotesByUrl) -> Vec<NoteWithUrl> {
    notes
        .iter()
        .flat_map(|(url, bucket)| {
            bucket.iter().map(move |note| NoteWithUrl {
                note: note.clone(),
                url: url.clone(),
            })
        })
        .collect()
}

/// Folds case one char at a time, the same way [`match_ranges`] does, so
/// every note kept by [`filter_by_text`] has something to highlight.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = fold_case(needle);
    if needle.is_empty() {
        return true;
    }

    haystack
        .char_indices()
        .any(|(start, _)| match_at(&haystack[start..], &needle).is_some())
}

fn fold_case(text: &str) -> Vec<char> {
    text.chars().flat_map(char::to_lowercase).collect()
}

pub fn filter_by_text<T: AsRef<Note> + Clone>(notes: &[T], query: &str) -> Vec<T> {
    notes
        .iter()
        .filter(|note| contains_ignore_case(&note.as_ref().content, query))
        .cloned()
        .collect()
}

/// Stable: notes with equal timestamps keep their relative order.
pub fn sort<T: AsRef<Note>>(mut notes: Vec<T>, order: SortOrder) -> Vec<T> {
    match order {
        SortOrder::Newest => {
            notes.sort_by(|a, b| b.as_ref().updated_at.cmp(&a.as_ref().updated_at));
        }
        SortOrder::Oldest => {
            notes.sort_by(|a, b| b.as_ref().created_at.cmp(&a.as_ref().created_at));
        }
    }

    notes
}

/// Byte ranges of every non-overlapping, case-insensitive occurrence of
/// `query` in `content`. The query is matched literally.
pub fn match_ranges(content: &str, query: &str) -> Vec<Range<usize>> {
    let needle = fold_case(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    let mut resume_at = 0;

    for (start, _) in content.char_indices() {
        if start < resume_at {
            continue;
        }

        if let Some(len) = match_at(&content[start..], &needle) {
            ranges.push(start..start + len);
            resume_at = start + len;
        }
    }

    ranges
}

fn match_at(rest: &str, needle: &[char]) -> Option<usize> {
    let mut matched = 0;

    for (offset, c) in rest.char_indices() {
        for lower in c.to_lowercase() {
            if matched == needle.len() || needle[matched] != lower {
                return None;
            }
            matched += 1;
        }

        if matched == needle.len() {
            return Some(offset + c.len_utf8());
        }
    }

    None
}

/// Wraps each occurrence of `query` in the highlight marker. Content is
/// otherwise copied verbatim.
pub fn highlight(content: &str, query: &str) -> String {
    mark(content, query, |segment, out| out.push_str(segment))
}

/// Like [`highlight`], but every piece of content is HTML-escaped exactly
/// once, so the result is safe to insert as markup.
pub fn highlight_html(content: &str, query: &str) -> String {
    mark(content, query, |segment, out| out.push_str(&escape_html(segment)))
}

fn mark(content: &str, query: &str, mut push: impl FnMut(&str, &mut String)) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;

    for range in match_ranges(content, query) {
        push(&content[cursor..range.start], &mut out);
        out.push_str(MARK_OPEN);
        push(&content[range.clone()], &mut out);
        out.push_str(MARK_CLOSE);
        cursor = range.end;
    }
    push(&content[cursor..], &mut out);

    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }

    out
}

/// Everything the dashboard narrows its listing by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardQuery {
    pub text: String,
    pub order: SortOrder,
    pub website: UrlFilter,
}

/// Page filter, then text filter, then sort.
pub fn apply(notes: &NotesByUrl, query: &DashboardQuery) -> Vec<NoteWithUrl> {
    let scoped = flatten(&filter_by_url(notes, &query.website));

    sort(filter_by_text(&scoped, &query.text), query.order)
}
