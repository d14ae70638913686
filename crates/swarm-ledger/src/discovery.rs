//! Discovery ledger: append-only record of scan findings (`host_online_find`).

use rusqlite::{params, Connection, Row};
use swarm_core::HostStatus;
use tracing::debug;

use crate::cursor::{Cursor, PageKey, PageSource};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{new_data_id, Candidate, DataId, DiscoveryRecord};
use crate::Db;

pub type DiscoveryCursor<'db> = Cursor<'db, DiscoverySince>;

impl Db {
    /// Record a scan finding under a freshly generated id.
    pub fn record_discovery(&self, host_ip: &str, scan_time: i64, scan_port: u16) -> LedgerResult<DataId> {
        let data_id = new_data_id();
        self.record_discovery_with_id(&data_id, host_ip, scan_time, scan_port)?;
        Ok(data_id)
    }

    /// Record a scan finding under a caller-supplied id.
    pub fn record_discovery_with_id(
        &self,
        data_id: &str,
        host_ip: &str,
        scan_time: i64,
        scan_port: u16,
    ) -> LedgerResult<()> {
        self.conn
            .execute(
                "INSERT INTO host_online_find(data_id,host_ip,scan_time,scan_port) VALUES (?,?,?,?)",
                params![data_id, host_ip, scan_time, scan_port],
            )
            .map_err(|e| LedgerError::on_insert(e, data_id))?;
        debug!(%data_id, %host_ip, scan_port, "discovery recorded");
        Ok(())
    }

    /// Findings with `scan_time >= since`, ordered by scan time then id.
    pub fn list_since(&self, since: i64) -> DiscoveryCursor<'_> {
        Cursor::new(self, DiscoverySince { since })
    }

    /// Hosts seen since `since` that are not currently swarm members,
    /// each with its most recent finding.
    pub fn candidates_since(&self, since: i64) -> LedgerResult<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.host_ip, f.scan_time, f.scan_port, m.host_status
             FROM host_online_find f
             LEFT JOIN host_swarm_list m ON m.host_ip = f.host_ip
             WHERE f.scan_time >= ?1
               AND (m.host_status IS NULL OR m.host_status IN ('pending','inactive'))
               AND f.data_id = (
                 SELECT g.data_id FROM host_online_find g
                 WHERE g.host_ip = f.host_ip AND g.scan_time >= ?1
                 ORDER BY g.scan_time DESC, g.data_id DESC LIMIT 1)
             ORDER BY f.host_ip",
        )?;
        let rows = stmt.query_map([since], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?, r.get::<_, u16>(2)?, r.get::<_, Option<String>>(3)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (host_ip, last_scan_time, last_scan_port, status) = row?;
            let host_status = status.map(|s| s.parse::<HostStatus>()).transpose()?;
            out.push(Candidate { host_ip, last_scan_time, last_scan_port, host_status });
        }
        Ok(out)
    }
}

pub struct DiscoverySince {
    since: i64,
}

impl PageSource for DiscoverySince {
    type Item = DiscoveryRecord;

    fn fetch(&self, conn: &Connection, after: Option<&PageKey>, limit: usize) -> LedgerResult<Vec<DiscoveryRecord>> {
        let (after_time, after_id) = match after {
            Some(k) => (Some(k.time), Some(k.data_id.as_str())),
            None => (None, None),
        };
        let mut stmt = conn.prepare_cached(
            "SELECT data_id, host_ip, scan_time, scan_port FROM host_online_find
             WHERE scan_time >= ?1
               AND (?2 IS NULL OR scan_time > ?2 OR (scan_time = ?2 AND data_id > ?3))
             ORDER BY scan_time, data_id
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(params![self.since, after_time, after_id, limit as i64], discovery_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn key(item: &DiscoveryRecord) -> PageKey {
        PageKey { time: item.scan_time, data_id: item.data_id.clone(), rank: 0 }
    }
}

fn discovery_from_row(r: &Row<'_>) -> rusqlite::Result<DiscoveryRecord> {
    Ok(DiscoveryRecord {
        data_id: r.get(0)?,
        host_ip: r.get(1)?,
        scan_time: r.get(2)?,
        scan_port: r.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(cursor: DiscoveryCursor<'_>) -> Vec<DiscoveryRecord> {
        cursor.collect::<LedgerResult<Vec<_>>>().unwrap()
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let db = Db::open_in_memory().unwrap();
        db.record_discovery_with_id("scan-1", "10.0.0.1", 100, 22).unwrap();
        let err = db.record_discovery_with_id("scan-1", "10.0.0.2", 101, 80).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateId(id) if id == "scan-1"));
    }

    #[test]
    fn same_host_may_repeat() {
        let db = Db::open_in_memory().unwrap();
        let a = db.record_discovery("10.0.0.1", 100, 22).unwrap();
        let b = db.record_discovery("10.0.0.1", 100, 22).unwrap();
        assert_ne!(a, b);
        assert_eq!(collect(db.list_since(0)).len(), 2);
    }

    #[test]
    fn list_since_orders_by_time_then_id() {
        let db = Db::open_in_memory().unwrap();
        db.record_discovery_with_id("c", "10.0.0.3", 200, 80).unwrap();
        db.record_discovery_with_id("b", "10.0.0.2", 100, 80).unwrap();
        db.record_discovery_with_id("a", "10.0.0.1", 200, 80).unwrap();
        db.record_discovery_with_id("old", "10.0.0.9", 50, 80).unwrap();

        let ids: Vec<_> = collect(db.list_since(100)).into_iter().map(|r| r.data_id).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn cursor_pages_and_restarts() {
        let db = Db::open_in_memory().unwrap();
        for i in 0..7 {
            db.record_discovery_with_id(&format!("id-{i}"), "10.0.0.1", 1000 + i / 2, 443).unwrap();
        }
        let mut cursor = db.list_since(0).with_page_size(3);
        let first: Vec<_> = cursor.by_ref().take(4).map(|r| r.unwrap().data_id).collect();
        assert_eq!(first, ["id-0", "id-1", "id-2", "id-3"]);
        assert_eq!(cursor.by_ref().count(), 3);
        assert!(cursor.next().is_none());

        cursor.restart();
        let all: Vec<_> = cursor.map(|r| r.unwrap().data_id).collect();
        assert_eq!(all.len(), 7);
        assert_eq!(all[0], "id-0");
        assert_eq!(all[6], "id-6");
    }

    #[test]
    fn candidates_exclude_members() {
        let db = Db::open_in_memory().unwrap();
        db.record_discovery_with_id("1", "10.0.0.1", 100, 22).unwrap();
        db.record_discovery_with_id("2", "10.0.0.1", 300, 2375).unwrap();
        db.record_discovery_with_id("3", "10.0.0.2", 200, 22).unwrap();
        db.record_discovery_with_id("4", "10.0.0.3", 250, 22).unwrap();
        db.conn
            .execute_batch(
                "INSERT INTO host_swarm_list VALUES ('10.0.0.2','active',1);
                 INSERT INTO host_swarm_list VALUES ('10.0.0.3','inactive',1);",
            )
            .unwrap();

        let c = db.candidates_since(0).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].host_ip, "10.0.0.1");
        assert_eq!((c[0].last_scan_time, c[0].last_scan_port), (300, 2375));
        assert_eq!(c[0].host_status, None);
        assert_eq!(c[1].host_ip, "10.0.0.3");
        assert_eq!(c[1].host_status, Some(HostStatus::Inactive));

        assert!(db.candidates_since(400).unwrap().is_empty());
    }
}
