//! Client-side filtering and sorting of the fetched collection.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::str::FromStr;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::BookRecord;

/// Column the collection view is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Author,
    /// Keep the order the server returned.
    #[default]
    Unsorted,
}

impl FromStr for SortKey {
    type Err = Infallible;

    /// Unknown keys parse to `Unsorted` rather than failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "title" => SortKey::Title,
            "author" => SortKey::Author,
            _ => SortKey::Unsorted,
        })
    }
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(key) => key,
            Err(never) => match never {},
        }
    }
}

/// Derive the displayed collection from `records`.
///
/// Keeps records whose title or author contains `filter_text`
/// (case-insensitive; empty matches all), then orders them by `sort_key`
/// with a stable sort. `records` is left untouched.
pub fn derive_view(records: &[BookRecord], filter_text: &str, sort_key: SortKey) -> Vec<BookRecord> {
    let needle = filter_text.to_lowercase();
    let mut view: Vec<BookRecord> = records
        .iter()
        .filter(|record| matches(record, &needle))
        .cloned()
        .collect();

    match sort_key {
        SortKey::Title => view.sort_by(|a, b| collate(&a.title, &b.title)),
        SortKey::Author => view.sort_by(|a, b| collate(&a.author, &b.author)),
        SortKey::Unsorted => {}
    }
    view
}

fn matches(record: &BookRecord, needle: &str) -> bool {
    needle.is_empty()
        || record.title.to_lowercase().contains(needle)
        || record.author.to_lowercase().contains(needle)
}

/// Locale-style string comparison.
///
/// The primary pass ignores accents and case, so `Émile` files next to
/// `Emile` rather than after `Z`. Ties are broken by accents (unaccented
/// first), then by case with lowercase before uppercase.
pub fn collate(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        .then_with(|| {
            a.chars()
                .map(|c| (c.to_lowercase().next(), c.is_uppercase()))
                .cmp(b.chars().map(|c| (c.to_lowercase().next(), c.is_uppercase())))
        })
}

/// Case-folded letters with combining marks stripped.
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Case-folded, accents kept (decomposed, so a bare letter sorts before its
/// accented forms).
fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}
