//! Archive export of ledger tables to Parquet.

use arrow::array::{ArrayRef, Int64Builder, StringBuilder};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use rusqlite::Row;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::arrow_schemas::{arrow_schema, table_columns, Column, ColumnKind};
use crate::error::{LedgerError, LedgerResult};
use crate::Db;

const CHUNK: usize = 10_000;

impl Db {
    /// Write every row of `table` to a ZSTD-compressed Parquet file.
    /// Returns the number of rows written.
    pub fn export_table_to_parquet(&self, table: &str, out: &Path) -> LedgerResult<u64> {
        let columns = table_columns(table).ok_or_else(|| LedgerError::UnsupportedTable(table.to_string()))?;
        let names: Vec<_> = columns.iter().map(|c| c.name).collect();
        // `table` is one of the fixed names accepted by table_columns.
        let sql = format!("SELECT {} FROM {} ORDER BY rowid", names.join(","), table);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let schema = Arc::new(arrow_schema(columns));
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::ZSTD(Default::default()))
            .build();
        let file = std::fs::File::create(out)?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let mut total = 0u64;
        loop {
            let mut builders: Vec<ColumnBuilder> = columns.iter().map(ColumnBuilder::new).collect();
            let mut count = 0;
            while count < CHUNK {
                let Some(row) = rows.next()? else { break };
                for (idx, b) in builders.iter_mut().enumerate() {
                    b.push(row, idx)?;
                }
                count += 1;
            }
            if count == 0 {
                break;
            }
            let arrays: Vec<ArrayRef> = builders.into_iter().map(ColumnBuilder::finish).collect();
            writer.write(&RecordBatch::try_new(schema.clone(), arrays)?)?;
            total += count as u64;
        }

        writer.close()?;
        debug!(%table, rows = total, out = %out.display(), "table exported");
        Ok(total)
    }
}

enum ColumnBuilder {
    Text(StringBuilder),
    Int(Int64Builder),
}

impl ColumnBuilder {
    fn new(c: &Column) -> Self {
        match c.kind {
            ColumnKind::Text => ColumnBuilder::Text(StringBuilder::new()),
            ColumnKind::Int => ColumnBuilder::Int(Int64Builder::new()),
        }
    }

    fn push(&mut self, row: &Row<'_>, idx: usize) -> rusqlite::Result<()> {
        match self {
            ColumnBuilder::Text(b) => b.append_option(row.get::<_, Option<String>>(idx)?),
            ColumnBuilder::Int(b) => b.append_option(row.get::<_, Option<i64>>(idx)?),
        }
        Ok(())
    }

    fn finish(self) -> ArrayRef {
        match self {
            ColumnBuilder::Text(mut b) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::Int(mut b) => Arc::new(b.finish()) as ArrayRef,
        }
    }
}
