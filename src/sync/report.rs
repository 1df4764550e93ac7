use crate::storage::RunTotals;

/// Outcome of one synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: u64,
    pub updated: u64,
    pub archived: u64,
    /// One message per failed fetch, extraction or store call
    pub errors: Vec<String>,
    /// Every item that was extracted, in crawl order
    pub items: Vec<ItemSummary>,
}

/// One extracted item as listed in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub name: String,
    pub schedule_count: usize,
}

impl SyncReport {
    /// True when the run recorded no errors
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Counters in the form kept in the run history
    pub fn totals(&self) -> RunTotals {
        RunTotals {
            created: self.created,
            updated: self.updated,
            archived: self.archived,
            errors: self.errors.len() as u64,
        }
    }
}
