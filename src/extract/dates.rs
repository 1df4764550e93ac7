//! Localized date-range parser
//!
//! Departure dates on the source are free text in Russian, written in half a
//! dozen styles. Each style is a [`DateFormat`] variant with its own pattern
//! and resolver; the parser tries them in a fixed order and the first one
//! that resolves to a valid range wins. Looser formats come last so they
//! cannot shadow the more specific ones (`5 апреля 2026` is also a suffix
//! of `1-5 апреля 2026`).
//!
//! A range written with real month names that fails to resolve (`28-3
//! января`, `30-31 февраля`) makes the whole fragment unrecognized. The
//! single-day format never gets to pick a date out of it.

use crate::extract::tables::month_number;
use crate::extract::ScheduleRange;
use chrono::{Datelike, Months, NaiveDate, Utc};
use regex::{Captures, Regex};

/// How far in the past a range with no written year may end before it is
/// moved to the following year
const PAST_RANGE_GRACE_DAYS: i64 = 31;

/// The supported date styles, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `с 28 мая по 3 июня 2026`
    FromToMonths,
    /// `с 5 по 12 мая 2026`
    FromTo,
    /// `26 мая - 1 июня 2026`
    SpacedMonthRange,
    /// `26 мая-1 июня 2026`
    CompactMonthRange,
    /// `16-22 марта 2026`
    SharedMonth,
    /// `5 апреля 2026`
    SingleDay,
}

impl DateFormat {
    /// All formats in the order they are tried
    pub const ALL: [DateFormat; 6] = [
        Self::FromToMonths,
        Self::FromTo,
        Self::SpacedMonthRange,
        Self::CompactMonthRange,
        Self::SharedMonth,
        Self::SingleDay,
    ];

    /// Whether the format describes a span of days rather than one day
    pub fn is_range(&self) -> bool {
        !matches!(self, Self::SingleDay)
    }

    /// Pattern over a normalized (lowercased, single-spaced, plain-hyphen) fragment
    fn pattern(&self) -> &'static str {
        match self {
            Self::FromToMonths => {
                r"\bс (\d{1,2}) ([а-яё]+)\.? по (\d{1,2}) ([а-яё]+)\.?(?: (\d{4}))?"
            }
            Self::FromTo => r"\bс (\d{1,2}) по (\d{1,2}) ([а-яё]+)\.?(?: (\d{4}))?",
            Self::SpacedMonthRange => {
                r"\b(\d{1,2}) ([а-яё]+)\.? - (\d{1,2}) ([а-яё]+)\.?(?: (\d{4}))?"
            }
            Self::CompactMonthRange => {
                r"\b(\d{1,2}) ([а-яё]+)\.?-(\d{1,2}) ([а-яё]+)\.?(?: (\d{4}))?"
            }
            Self::SharedMonth => r"\b(\d{1,2}) ?- ?(\d{1,2}) ([а-яё]+)\.?(?: (\d{4}))?",
            Self::SingleDay => r"\b(\d{1,2}) ([а-яё]+)\.?(?: (\d{4}))?",
        }
    }

    /// Capture groups holding month names
    fn month_groups(&self) -> &'static [usize] {
        match self {
            Self::FromToMonths | Self::SpacedMonthRange | Self::CompactMonthRange => &[2, 4],
            Self::FromTo | Self::SharedMonth => &[3],
            Self::SingleDay => &[2],
        }
    }

    /// Capture group holding the optional year
    fn year_group(&self) -> usize {
        match self {
            Self::FromToMonths | Self::SpacedMonthRange | Self::CompactMonthRange => 5,
            Self::FromTo | Self::SharedMonth => 4,
            Self::SingleDay => 3,
        }
    }

    /// True when every month name in the match is a real month
    fn names_months(&self, caps: &Captures<'_>) -> bool {
        self.month_groups()
            .iter()
            .all(|&group| caps.get(group).and_then(|m| month_number(m.as_str())).is_some())
    }

    fn has_year(&self, caps: &Captures<'_>) -> bool {
        caps.get(self.year_group()).is_some()
    }

    /// Turns one pattern match into a range
    ///
    /// Returns `None` for an unknown month, an impossible calendar date or a
    /// range that ends before it starts, so the caller moves on.
    fn resolve(&self, caps: &Captures<'_>, reference_year: i32) -> Option<ScheduleRange> {
        match self {
            Self::FromTo | Self::SharedMonth => {
                let first = number(caps, 1)?;
                let last = number(caps, 2)?;
                let month = month_number(caps.get(3)?.as_str())?;
                let year = year(caps, 4, reference_year)?;

                ScheduleRange::new(
                    NaiveDate::from_ymd_opt(year, month, first)?,
                    NaiveDate::from_ymd_opt(year, month, last)?,
                )
            }
            Self::FromToMonths | Self::SpacedMonthRange | Self::CompactMonthRange => {
                let first = number(caps, 1)?;
                let first_month = month_number(caps.get(2)?.as_str())?;
                let last = number(caps, 3)?;
                let last_month = month_number(caps.get(4)?.as_str())?;
                let end_year = year(caps, 5, reference_year)?;

                // "28 декабря - 5 января 2027" starts in the previous year
                let start_year = if first_month > last_month {
                    end_year - 1
                } else {
                    end_year
                };

                ScheduleRange::new(
                    NaiveDate::from_ymd_opt(start_year, first_month, first)?,
                    NaiveDate::from_ymd_opt(end_year, last_month, last)?,
                )
            }
            Self::SingleDay => {
                let day = number(caps, 1)?;
                let month = month_number(caps.get(2)?.as_str())?;
                let year = year(caps, 3, reference_year)?;

                NaiveDate::from_ymd_opt(year, month, day).map(ScheduleRange::single)
            }
        }
    }
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn year(caps: &Captures<'_>, group: usize, reference_year: i32) -> Option<i32> {
    match caps.get(group) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(reference_year),
    }
}

/// Parser for free-text departure dates
#[derive(Debug, Clone)]
pub struct DateRangeParser {
    matchers: Vec<(DateFormat, Regex)>,
    reference_date: NaiveDate,
}

impl DateRangeParser {
    /// Creates a parser anchored on today's date
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_reference_date(Utc::now().date_naive())
    }

    /// Creates a parser with a fixed fallback year
    ///
    /// The reference date is the first of January of that year.
    pub fn with_reference_year(reference_year: i32) -> Result<Self, regex::Error> {
        let date = NaiveDate::from_ymd_opt(reference_year, 1, 1).unwrap_or(NaiveDate::MIN);
        Self::with_reference_date(date)
    }

    /// Creates a parser anchored on `reference_date`
    ///
    /// Fragments with no written year take the year of the reference date.
    /// A range resolved that way which ended more than a month before the
    /// reference date is moved one year forward.
    pub fn with_reference_date(reference_date: NaiveDate) -> Result<Self, regex::Error> {
        let matchers = DateFormat::ALL
            .iter()
            .map(|format| Regex::new(format.pattern()).map(|re| (*format, re)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            matchers,
            reference_date,
        })
    }

    /// The year assumed for fragments that do not state one
    pub fn reference_year(&self) -> i32 {
        self.reference_date.year()
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Parses a fragment into a range
    ///
    /// `None` means the fragment is in no recognized format. That is not an
    /// error: the entry is simply skipped.
    pub fn parse(&self, fragment: &str) -> Option<ScheduleRange> {
        self.parse_with_format(fragment).map(|(_, range)| range)
    }

    /// Parses a fragment and reports which format matched
    pub fn parse_with_format(&self, fragment: &str) -> Option<(DateFormat, ScheduleRange)> {
        let normalized = normalize_fragment(fragment);
        let mut rejected_range = false;

        for (format, regex) in &self.matchers {
            if !format.is_range() && rejected_range {
                break;
            }

            for caps in regex.captures_iter(&normalized) {
                match format.resolve(&caps, self.reference_year()) {
                    Some(range) if format.has_year(&caps) => return Some((*format, range)),
                    Some(range) => return Some((*format, self.roll_forward(range))),
                    None if format.is_range() && format.names_months(&caps) => {
                        rejected_range = true;
                    }
                    None => {}
                }
            }
        }

        tracing::debug!("Unrecognized date fragment: {:?}", fragment);
        None
    }

    /// Moves a range with no written year into the next year once it is
    /// well in the past
    fn roll_forward(&self, range: ScheduleRange) -> ScheduleRange {
        let cutoff = self.reference_date - chrono::Duration::days(PAST_RANGE_GRACE_DAYS);
        if range.end >= cutoff {
            return range;
        }

        match (
            range.start.checked_add_months(Months::new(12)),
            range.end.checked_add_months(Months::new(12)),
        ) {
            (Some(start), Some(end)) => {
                tracing::debug!("Moved past range {} into the next year", range);
                ScheduleRange { start, end }
            }
            _ => range,
        }
    }
}

/// Normalizes a date fragment before matching
///
/// Lowercases, collapses whitespace (non-breaking spaces included), maps
/// every dash variant to `-` and drops a trailing year unit (`г.`, `года`).
pub fn normalize_fragment(text: &str) -> String {
    let dashed: String = text
        .chars()
        .map(|c| match c {
            '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
            other => other,
        })
        .collect();

    let collapsed = dashed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    strip_year_unit(&collapsed).to_string()
}

fn strip_year_unit(text: &str) -> &str {
    for unit in ["года", "год", "г.", "г"] {
        if let Some(rest) = text.strip_suffix(unit) {
            let rest = rest.trim_end();
            if rest.ends_with(|c: char| c.is_ascii_digit()) {
                return rest;
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DateRangeParser {
        DateRangeParser::with_reference_year(2026).unwrap()
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> ScheduleRange {
        ScheduleRange {
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    #[test]
    fn test_shared_month_range() {
        assert_eq!(
            parser().parse_with_format("16-22 марта 2026"),
            Some((
                DateFormat::SharedMonth,
                range((2026, 3, 16), (2026, 3, 22))
            ))
        );
    }

    #[test]
    fn test_compact_cross_month_range() {
        assert_eq!(
            parser().parse_with_format("26 мая-1 июня 2026"),
            Some((
                DateFormat::CompactMonthRange,
                range((2026, 5, 26), (2026, 6, 1))
            ))
        );
    }

    #[test]
    fn test_spaced_range_with_em_dash() {
        assert_eq!(
            parser().parse_with_format("26 мая — 1 июня 2026"),
            Some((
                DateFormat::SpacedMonthRange,
                range((2026, 5, 26), (2026, 6, 1))
            ))
        );
        assert_eq!(
            parser().parse("10 июля – 17 июля 2026"),
            Some(range((2026, 7, 10), (2026, 7, 17)))
        );
    }

    #[test]
    fn test_from_to_range() {
        assert_eq!(
            parser().parse_with_format("с 5 по 12 мая 2026"),
            Some((DateFormat::FromTo, range((2026, 5, 5), (2026, 5, 12))))
        );
    }

    #[test]
    fn test_single_day() {
        assert_eq!(
            parser().parse_with_format("5 апреля 2026"),
            Some((DateFormat::SingleDay, range((2026, 4, 5), (2026, 4, 5))))
        );
    }

    #[test]
    fn test_unrecognized_fragment() {
        assert_eq!(parser().parse("скоро"), None);
        assert_eq!(parser().parse(""), None);
        assert_eq!(parser().parse("по запросу"), None);
    }

    #[test]
    fn test_year_unit_suffix_and_whitespace() {
        assert_eq!(
            parser().parse("  16\u{a0}-\u{a0}22   марта 2026 г. "),
            Some(range((2026, 3, 16), (2026, 3, 22)))
        );
        assert_eq!(
            parser().parse("5 апреля 2026 года"),
            Some(range((2026, 4, 5), (2026, 4, 5)))
        );
    }

    #[test]
    fn test_missing_year_uses_reference_year() {
        let parser = DateRangeParser::with_reference_year(2027).unwrap();
        assert_eq!(
            parser.parse("3-9 августа"),
            Some(range((2027, 8, 3), (2027, 8, 9)))
        );
    }

    #[test]
    fn test_range_across_new_year() {
        assert_eq!(
            parser().parse("28 декабря - 5 января 2027"),
            Some(range((2026, 12, 28), (2027, 1, 5)))
        );
    }

    #[test]
    fn test_unknown_month_falls_through() {
        // The first occurrence names no real month; the next one does.
        assert_eq!(
            parser().parse("3 дня, выезд 14 июня 2026"),
            Some(range((2026, 6, 14), (2026, 6, 14)))
        );
        assert_eq!(parser().parse("16-22 мартобря 2026"), None);
    }

    #[test]
    fn test_impossible_date_is_not_a_match() {
        assert_eq!(parser().parse("30-31 февраля 2026"), None);
    }

    #[test]
    fn test_trailing_price_does_not_confuse_parser() {
        assert_eq!(
            parser().parse("16-22 марта 2026 — 45 000 руб."),
            Some(range((2026, 3, 16), (2026, 3, 22)))
        );
    }

    #[test]
    fn test_rejected_range_does_not_fall_back_to_single_day() {
        assert_eq!(parser().parse_with_format("28-3 января 2026"), None);
        assert_eq!(parser().parse_with_format("с 12 по 5 мая 2026"), None);
    }

    #[test]
    fn test_from_to_across_months() {
        assert_eq!(
            parser().parse_with_format("с 28 мая по 3 июня 2026"),
            Some((
                DateFormat::FromToMonths,
                range((2026, 5, 28), (2026, 6, 3))
            ))
        );
        assert_eq!(
            parser().parse("с 28 декабря по 4 января 2027"),
            Some(range((2026, 12, 28), (2027, 1, 4)))
        );
    }

    #[test]
    fn test_missing_year_rolls_forward_when_past() {
        let december = DateRangeParser::with_reference_date(
            NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
        )
        .unwrap();
        assert_eq!(
            december.parse("28 декабря - 5 января"),
            Some(range((2026, 12, 28), (2027, 1, 5)))
        );
        assert_eq!(
            december.parse("10 января"),
            Some(range((2027, 1, 10), (2027, 1, 10)))
        );
        assert_eq!(
            december.parse("3-9 августа"),
            Some(range((2027, 8, 3), (2027, 8, 9)))
        );
        // Ended less than a month ago: left where it is
        assert_eq!(
            december.parse("1-5 декабря"),
            Some(range((2026, 12, 1), (2026, 12, 5)))
        );
    }

    #[test]
    fn test_written_year_never_rolls_forward() {
        let december = DateRangeParser::with_reference_date(
            NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
        )
        .unwrap();
        assert_eq!(
            december.parse("16-22 марта 2026"),
            Some(range((2026, 3, 16), (2026, 3, 22)))
        );
        assert_eq!(
            december.parse("28 декабря - 5 января 2026"),
            Some(range((2025, 12, 28), (2026, 1, 5)))
        );
    }

    #[test]
    fn test_normalize_fragment() {
        assert_eq!(normalize_fragment("16 – 22  Марта 2026г"), "16 - 22 марта 2026");
        assert_eq!(normalize_fragment("Таганрог"), "таганрог");
    }
}
