//! Keyset-paginated lazy sequences over the append-only tables.
//!
//! A cursor never keeps a statement open between pages; it remembers the
//! `(time, data_id, rank)` key of the last row it yielded and asks for the
//! next page strictly after it. That makes cursors cheap to hold, safe to
//! interleave with writes on the same connection, and restartable.

use rusqlite::Connection;
use std::collections::VecDeque;

use crate::error::LedgerResult;
use crate::Db;

pub const DEFAULT_PAGE_SIZE: usize = 512;

/// Ordering key of a row: timestamp, then `data_id`, then `rank`.
///
/// `rank` separates rows that come from different tables and may share a
/// `data_id`; single-table sources use 0. The key must be unique per row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageKey {
    pub time: i64,
    pub data_id: String,
    pub rank: i64,
}

/// A query that can be read page by page in `PageKey` order.
///
/// Not re-exported; only this crate's sources implement it.
pub trait PageSource {
    type Item;

    fn fetch(&self, conn: &Connection, after: Option<&PageKey>, limit: usize) -> LedgerResult<Vec<Self::Item>>;

    fn key(item: &Self::Item) -> PageKey;
}

pub struct Cursor<'db, S: PageSource> {
    db: &'db Db,
    source: S,
    after: Option<PageKey>,
    buf: VecDeque<S::Item>,
    page_size: usize,
    done: bool,
}

impl<'db, S: PageSource> Cursor<'db, S> {
    pub(crate) fn new(db: &'db Db, source: S) -> Self {
        Cursor { db, source, after: None, buf: VecDeque::new(), page_size: DEFAULT_PAGE_SIZE, done: false }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Rewind to the first row of the sequence.
    pub fn restart(&mut self) {
        self.after = None;
        self.buf.clear();
        self.done = false;
    }

    fn fill(&mut self) -> LedgerResult<()> {
        let page = self.source.fetch(&self.db.conn, self.after.as_ref(), self.page_size)?;
        if page.len() < self.page_size {
            self.done = true;
        }
        self.buf.extend(page);
        Ok(())
    }
}

impl<'db, S: PageSource> Iterator for Cursor<'db, S> {
    type Item = LedgerResult<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() && !self.done {
            if let Err(e) = self.fill() {
                self.done = true;
                return Some(Err(e));
            }
        }
        let item = self.buf.pop_front()?;
        self.after = Some(S::key(&item));
        Some(Ok(item))
    }
}
