//! Catalog item extraction
//!
//! This module turns raw item pages into structured records:
//! - `dates`: the localized date-range parser
//! - `item`: the item page extractor
//! - `tables`: the fixed month, category and location tables both rely on

mod dates;
mod item;
pub mod tables;

pub use dates::{normalize_fragment, DateFormat, DateRangeParser};
pub use item::{slug_from_url, ItemExtractor};

use chrono::NaiveDate;
use std::fmt;

/// One concrete start/end date pair on which a tour runs
///
/// `end` is never earlier than `start`; a single-day departure has both equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ScheduleRange {
    /// Creates a range, rejecting one that ends before it starts
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// Creates a single-day range
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of calendar days covered, both endpoints included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for ScheduleRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// Tour category, resolved from the tags shown on an item page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TourCategory {
    #[default]
    Group,
    Individual,
    Weekend,
    School,
    Corporate,
    Excursion,
}

impl TourCategory {
    /// Converts the category to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Individual => "individual",
            Self::Weekend => "weekend",
            Self::School => "school",
            Self::Corporate => "corporate",
            Self::Excursion => "excursion",
        }
    }

    /// Parses a category from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "group" => Some(Self::Group),
            "individual" => Some(Self::Individual),
            "weekend" => Some(Self::Weekend),
            "school" => Some(Self::School),
            "corporate" => Some(Self::Corporate),
            "excursion" => Some(Self::Excursion),
            _ => None,
        }
    }
}

impl fmt::Display for TourCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A tour as extracted from its catalog page
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    /// Stable per-item identifier taken from the URL path
    pub slug: String,
    pub source_url: String,
    pub name: String,
    /// Price in whole units of `currency`; 0 when the page shows none
    pub price: i64,
    pub currency: String,
    pub category: TourCategory,
    pub duration_days: u32,
    /// Never empty
    pub locations: Vec<String>,
    pub schedules: Vec<ScheduleRange>,
    pub description: Option<String>,
}
