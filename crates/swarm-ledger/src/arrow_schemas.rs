use arrow::datatypes::{DataType, Field, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Int,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

const fn col(name: &'static str, kind: ColumnKind, nullable: bool) -> Column {
    Column { name, kind, nullable }
}

const HOST_ONLINE_FIND: &[Column] = &[
    col("data_id", ColumnKind::Text, false),
    col("host_ip", ColumnKind::Text, false),
    col("scan_time", ColumnKind::Int, false),
    col("scan_port", ColumnKind::Int, false),
];

const HOST_SWARM_LIST: &[Column] = &[
    col("host_ip", ColumnKind::Text, false),
    col("host_status", ColumnKind::Text, false),
    col("update_time", ColumnKind::Int, false),
];

// Both history tables share one layout.
const OPERATE_HISTORY: &[Column] = &[
    col("data_id", ColumnKind::Text, false),
    col("host_ip", ColumnKind::Text, false),
    col("operator_id", ColumnKind::Text, false),
    col("operate_type", ColumnKind::Text, false),
    col("operate_time", ColumnKind::Int, false),
    col("operate_reason", ColumnKind::Text, true),
];

/// Column layout of an exportable table, or `None` for anything else.
pub fn table_columns(table: &str) -> Option<&'static [Column]> {
    match table {
        "host_online_find" => Some(HOST_ONLINE_FIND),
        "host_swarm_list" => Some(HOST_SWARM_LIST),
        "host_operate_history" | "swarm_operate_history" => Some(OPERATE_HISTORY),
        _ => None,
    }
}

pub fn arrow_schema(columns: &[Column]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|c| {
                let dt = match c.kind {
                    ColumnKind::Text => DataType::Utf8,
                    ColumnKind::Int => DataType::Int64,
                };
                Field::new(c.name, dt, c.nullable)
            })
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TABLES;

    #[test]
    fn every_ledger_table_is_exportable() {
        for t in TABLES {
            assert!(table_columns(t).is_some(), "{t}");
        }
        assert!(table_columns("sqlite_master").is_none());
    }

    #[test]
    fn only_reason_is_nullable() {
        let schema = arrow_schema(OPERATE_HISTORY);
        let nullable: Vec<_> = schema.fields().iter().filter(|f| f.is_nullable()).map(|f| f.name().as_str()).collect();
        assert_eq!(nullable, ["operate_reason"]);
    }
}
