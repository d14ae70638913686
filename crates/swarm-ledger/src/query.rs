use crate::error::{LedgerError, LedgerResult};
use crate::schema::TABLES;
use crate::Db;

impl Db {
    pub fn table_exists(&self, name: &str) -> LedgerResult<bool> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    /// Row count of one of the ledger tables.
    pub fn row_count(&self, table: &str) -> LedgerResult<i64> {
        if !TABLES.contains(&table) {
            return Err(LedgerError::UnsupportedTable(table.to_string()));
        }
        Ok(self.conn.query_row(&format!("SELECT COUNT(1) FROM {table}"), [], |r| r.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_tables_exist_and_start_empty() {
        let db = Db::open_in_memory().unwrap();
        for t in TABLES {
            assert!(db.table_exists(t).unwrap(), "{t}");
            assert_eq!(db.row_count(t).unwrap(), 0);
        }
        assert!(!db.table_exists("runs").unwrap());
        assert!(matches!(db.row_count("sqlite_master"), Err(LedgerError::UnsupportedTable(_))));
    }
}
