//! Reconciliation key derivation
//!
//! A key ties one (item, departure) pair to exactly one stored event across
//! runs: `<prefix>_<slug>_<YYYY-MM-DD>`. The prefix carries no `_` and the
//! date suffix has a fixed width, so a key splits back unambiguously from the
//! right even when the slug itself contains underscores.

use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_WIDTH: usize = 10;

/// Derives the reconciliation key for an item departure
pub fn derive_key(prefix: &str, slug: &str, start: NaiveDate) -> String {
    format!("{}_{}_{}", prefix, slug, start.format(DATE_FORMAT))
}

/// Splits a key produced with `prefix` back into its slug and start date
///
/// Returns `None` when the key was not produced by [`derive_key`] with this
/// prefix.
pub fn parse_key(prefix: &str, key: &str) -> Option<(String, NaiveDate)> {
    let rest = key.strip_prefix(prefix)?.strip_prefix('_')?;
    if rest.len() < DATE_WIDTH + 2 || !rest.is_char_boundary(rest.len() - DATE_WIDTH - 1) {
        return None;
    }

    let (slug, date) = rest.split_at(rest.len() - DATE_WIDTH - 1);
    let date = date.strip_prefix('_')?;
    let start = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;

    if slug.is_empty() {
        return None;
    }
    Some((slug.to_string(), start))
}

/// Whether a stored key belongs to the partition synchronized under `prefix`
pub fn has_prefix(prefix: &str, key: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('_'))
}
