//! Audit log: append-only `host_operate_history` and `swarm_operate_history`.
//!
//! There is no update or delete path for either table.

use rusqlite::{params, Connection, Row};
use swarm_core::ParseEnumError;

use crate::cursor::{Cursor, PageKey, PageSource};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AuditEntry, HostOperation, SwarmOperation};
use crate::Db;

pub type HistoryCursor<'db> = Cursor<'db, HostTimeline>;

pub(crate) fn append_host_operation(conn: &Connection, op: &HostOperation) -> LedgerResult<()> {
    conn.prepare_cached(
        "INSERT INTO host_operate_history(data_id,host_ip,operator_id,operate_type,operate_time,operate_reason)
         VALUES (?,?,?,?,?,?)",
    )?
    .execute(params![
        op.data_id,
        op.host_ip,
        op.operator_id,
        op.operate_type.as_str(),
        op.operate_time,
        op.operate_reason
    ])
    .map_err(|e| LedgerError::on_insert(e, &op.data_id))?;
    Ok(())
}

pub(crate) fn append_swarm_operation(conn: &Connection, op: &SwarmOperation) -> LedgerResult<()> {
    conn.prepare_cached(
        "INSERT INTO swarm_operate_history(data_id,host_ip,operator_id,operate_type,operate_time,operate_reason)
         VALUES (?,?,?,?,?,?)",
    )?
    .execute(params![
        op.data_id,
        op.host_ip,
        op.operator_id,
        op.operate_type.as_str(),
        op.operate_time,
        op.operate_reason
    ])
    .map_err(|e| LedgerError::on_insert(e, &op.data_id))?;
    Ok(())
}

impl Db {
    pub fn append_host_operation(&self, op: &HostOperation) -> LedgerResult<()> {
        append_host_operation(&self.conn, op)
    }

    pub fn append_swarm_operation(&self, op: &SwarmOperation) -> LedgerResult<()> {
        append_swarm_operation(&self.conn, op)
    }

    /// Unified timeline of both history tables for one host, ordered by
    /// operate_time, then data_id, then host rows before swarm rows.
    pub fn history(&self, host_ip: &str) -> HistoryCursor<'_> {
        Cursor::new(self, HostTimeline { host_ip: host_ip.to_string() })
    }

    pub fn history_count(&self, host_ip: &str) -> LedgerResult<i64> {
        Ok(self.conn.query_row(
            "SELECT (SELECT COUNT(1) FROM host_operate_history WHERE host_ip=?1)
                  + (SELECT COUNT(1) FROM swarm_operate_history WHERE host_ip=?1)",
            [host_ip],
            |r| r.get(0),
        )?)
    }
}

pub struct HostTimeline {
    host_ip: String,
}

// Tie-break between the two tables, which have independent data_id spaces.
const HOST_RANK: i64 = 0;
const SWARM_RANK: i64 = 1;

impl PageSource for HostTimeline {
    type Item = AuditEntry;

    fn fetch(&self, conn: &Connection, after: Option<&PageKey>, limit: usize) -> LedgerResult<Vec<AuditEntry>> {
        let (after_time, after_id, after_rank) = match after {
            Some(k) => (Some(k.time), Some(k.data_id.as_str()), Some(k.rank)),
            None => (None, None, None),
        };
        let mut stmt = conn.prepare_cached(
            "SELECT kind, data_id, host_ip, operator_id, operate_type, operate_time, operate_reason FROM (
               SELECT 'host' AS kind, 0 AS rank, data_id, host_ip, operator_id, operate_type, operate_time, operate_reason
               FROM host_operate_history WHERE host_ip = ?1
               UNION ALL
               SELECT 'swarm' AS kind, 1 AS rank, data_id, host_ip, operator_id, operate_type, operate_time, operate_reason
               FROM swarm_operate_history WHERE host_ip = ?1
             )
             WHERE ?2 IS NULL
                OR operate_time > ?2
                OR (operate_time = ?2 AND data_id > ?3)
                OR (operate_time = ?2 AND data_id = ?3 AND rank > ?5)
             ORDER BY operate_time, data_id, rank
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            params![self.host_ip, after_time, after_id, limit as i64, after_rank],
            raw_entry,
        )?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(raw?.into_entry()?);
        }
        Ok(out)
    }

    fn key(item: &AuditEntry) -> PageKey {
        let rank = match item {
            AuditEntry::Host(_) => HOST_RANK,
            AuditEntry::Swarm(_) => SWARM_RANK,
        };
        PageKey { time: item.operate_time(), data_id: item.data_id().to_string(), rank }
    }
}

struct RawEntry {
    kind: String,
    data_id: String,
    host_ip: String,
    operator_id: String,
    operate_type: String,
    operate_time: i64,
    operate_reason: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> LedgerResult<AuditEntry> {
        Ok(match self.kind.as_str() {
            "host" => AuditEntry::Host(HostOperation {
                operate_type: self.operate_type.parse()?,
                data_id: self.data_id,
                host_ip: self.host_ip,
                operator_id: self.operator_id,
                operate_time: self.operate_time,
                operate_reason: self.operate_reason,
            }),
            "swarm" => AuditEntry::Swarm(SwarmOperation {
                operate_type: self.operate_type.parse()?,
                data_id: self.data_id,
                host_ip: self.host_ip,
                operator_id: self.operator_id,
                operate_time: self.operate_time,
                operate_reason: self.operate_reason,
            }),
            other => {
                return Err(ParseEnumError { kind: "history kind", value: other.to_string() }.into());
            }
        })
    }
}

fn raw_entry(r: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        kind: r.get(0)?,
        data_id: r.get(1)?,
        host_ip: r.get(2)?,
        operator_id: r.get(3)?,
        operate_type: r.get(4)?,
        operate_time: r.get(5)?,
        operate_reason: r.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::{HostOperateType, SwarmOperateType};

    fn host_op(id: &str, ip: &str, ty: HostOperateType, at: i64) -> HostOperation {
        HostOperation {
            data_id: id.into(),
            host_ip: ip.into(),
            operator_id: "op1".into(),
            operate_type: ty,
            operate_time: at,
            operate_reason: None,
        }
    }

    fn swarm_op(id: &str, ip: &str, ty: SwarmOperateType, at: i64) -> SwarmOperation {
        SwarmOperation {
            data_id: id.into(),
            host_ip: ip.into(),
            operator_id: "op1".into(),
            operate_type: ty,
            operate_time: at,
            operate_reason: Some("maintenance".into()),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected_per_table() {
        let db = Db::open_in_memory().unwrap();
        db.append_host_operation(&host_op("x", "10.0.0.1", HostOperateType::Add, 1)).unwrap();
        let err = db.append_host_operation(&host_op("x", "10.0.0.1", HostOperateType::Remove, 2)).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateId(_)));
        // The two tables have independent key spaces.
        db.append_swarm_operation(&swarm_op("x", "10.0.0.1", SwarmOperateType::Start, 3)).unwrap();
    }

    #[test]
    fn history_merges_both_tables_in_time_order() {
        let db = Db::open_in_memory().unwrap();
        db.append_swarm_operation(&swarm_op("s1", "10.0.0.1", SwarmOperateType::Start, 20)).unwrap();
        db.append_host_operation(&host_op("h1", "10.0.0.1", HostOperateType::Add, 10)).unwrap();
        db.append_host_operation(&host_op("h2", "10.0.0.1", HostOperateType::Remove, 40)).unwrap();
        db.append_swarm_operation(&swarm_op("s2", "10.0.0.1", SwarmOperateType::Stop, 30)).unwrap();
        db.append_host_operation(&host_op("other", "10.0.0.2", HostOperateType::Add, 15)).unwrap();

        let timeline: Vec<_> = db.history("10.0.0.1").collect::<LedgerResult<_>>().unwrap();
        let types: Vec<_> = timeline.iter().map(AuditEntry::operate_type).collect();
        assert_eq!(types, ["add", "start", "stop", "remove"]);
        assert!(matches!(&timeline[1], AuditEntry::Swarm(op) if op.operate_reason.as_deref() == Some("maintenance")));
        assert_eq!(db.history_count("10.0.0.1").unwrap(), 4);
        assert_eq!(db.history_count("10.0.0.9").unwrap(), 0);
    }

    #[test]
    fn history_ties_break_on_data_id_across_pages() {
        let db = Db::open_in_memory().unwrap();
        db.append_swarm_operation(&swarm_op("b", "10.0.0.1", SwarmOperateType::Start, 5)).unwrap();
        db.append_host_operation(&host_op("a", "10.0.0.1", HostOperateType::Add, 5)).unwrap();
        db.append_host_operation(&host_op("c", "10.0.0.1", HostOperateType::Remove, 5)).unwrap();
        let ids: Vec<_> = db
            .history("10.0.0.1")
            .with_page_size(1)
            .map(|e| e.unwrap().data_id().to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn history_keeps_rows_sharing_id_and_time_across_tables() {
        let db = Db::open_in_memory().unwrap();
        db.append_host_operation(&host_op("x", "10.0.0.1", HostOperateType::Add, 5)).unwrap();
        db.append_swarm_operation(&swarm_op("x", "10.0.0.1", SwarmOperateType::Start, 5)).unwrap();
        db.append_host_operation(&host_op("y", "10.0.0.1", HostOperateType::Remove, 5)).unwrap();

        let paged: Vec<_> = db
            .history("10.0.0.1")
            .with_page_size(1)
            .map(|e| e.unwrap().operate_type())
            .collect();
        assert_eq!(paged, ["add", "start", "remove"]);
        let unpaged = db.history("10.0.0.1").count();
        assert_eq!(unpaged as i64, db.history_count("10.0.0.1").unwrap());
        assert_eq!(paged.len(), unpaged);
    }

    #[test]
    fn unknown_history_kind_is_an_error() {
        let raw = RawEntry {
            kind: "container".into(),
            data_id: "x".into(),
            host_ip: "10.0.0.1".into(),
            operator_id: "op1".into(),
            operate_type: "start".into(),
            operate_time: 1,
            operate_reason: None,
        };
        let err = raw.into_entry().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidValue(e) if e.value == "container"));
    }
}
