// Cached row-index lookups into kernel interface tables
//
// Both the Linux ifindex table and the FreeBSD ifmib sysctl tree are tables
// keyed by a small integer. Rows come and go as interfaces are created and
// destroyed, so a cached index can silently start pointing at a different
// interface (or at nothing). Every read is validated against the expected
// name and the table is rescanned when it doesn't match.

use super::CounterSample;
use crate::error::Result;

/// One row of an indexed interface table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub name: String,
    pub counters: CounterSample,
}

/// A kernel table of interfaces addressed by row index (1-based)
pub trait CounterTable {
    /// Highest row index currently in the table
    fn row_count(&self) -> Result<u32>;

    /// Read a row; `Ok(None)` when the index is empty
    fn row(&self, index: u32) -> Result<Option<TableRow>>;
}

/// Cached position of one interface in a `CounterTable`
#[derive(Debug, Clone, Copy)]
pub struct IndexCache {
    index: u32,
}

impl Default for IndexCache {
    fn default() -> Self {
        // Row 1 is as good a guess as any until the first lookup
        Self { index: 1 }
    }
}

impl IndexCache {
    /// Start from an index resolved elsewhere
    pub fn at(index: u32) -> Self {
        Self { index }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Read `interface`'s counters, re-resolving the cached index on a miss
    ///
    /// Returns `Ok(None)` when the interface is not in the table at all.
    pub fn lookup<T: CounterTable + ?Sized>(
        &mut self,
        table: &T,
        interface: &str,
    ) -> Result<Option<CounterSample>> {
        if let Ok(Some(row)) = table.row(self.index) {
            if row.name == interface {
                return Ok(Some(row.counters));
            }
        }

        log::debug!(
            "Cached index {} no longer names {}, rescanning",
            self.index,
            interface
        );

        // Indices of destroyed interfaces are not reused right away, so the
        // table has holes; skip them
        for index in (1..=table.row_count()?).rev() {
            if let Some(row) = table.row(index)? {
                if row.name == interface {
                    self.index = index;
                    return Ok(Some(row.counters));
                }
            }
        }

        Ok(None)
    }
}
