//! Membership store: current swarm membership (`host_swarm_list`).
//!
//! Reads are public. Writes go through [`compare_and_set`] only and are
//! crate-private, so the controller is the single writer.

use rusqlite::{params, Connection, OptionalExtension, Row};
use swarm_core::HostStatus;

use crate::error::{is_primary_key_violation, LedgerResult};
use crate::models::SwarmMember;
use crate::Db;

/// Result of a compare-and-set on one host row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CasOutcome {
    Applied(SwarmMember),
    /// The row was not in the expected state when the write ran.
    Conflict,
}

pub(crate) fn get_member(conn: &Connection, host_ip: &str) -> LedgerResult<Option<SwarmMember>> {
    let raw = conn
        .prepare_cached("SELECT host_ip, host_status, update_time FROM host_swarm_list WHERE host_ip=?")?
        .query_row([host_ip], raw_member)
        .optional()?;
    raw.map(RawMember::into_member).transpose()
}

/// Move `host_ip` from `expected` to `new`, stamping `commit_ts`.
///
/// `expected = None` means the host must not have a row yet. `update_time`
/// never moves backwards.
pub(crate) fn compare_and_set(
    conn: &Connection,
    host_ip: &str,
    expected: Option<HostStatus>,
    new: HostStatus,
    commit_ts: i64,
) -> LedgerResult<CasOutcome> {
    let raw = match expected {
        None => {
            let res = conn
                .prepare_cached(
                    "INSERT INTO host_swarm_list(host_ip, host_status, update_time) VALUES (?,?,?)
                     RETURNING host_ip, host_status, update_time",
                )?
                .query_row(params![host_ip, new.as_str(), commit_ts], raw_member);
            match res {
                Ok(raw) => Some(raw),
                Err(e) if is_primary_key_violation(&e) => None,
                Err(e) => return Err(e.into()),
            }
        }
        Some(prev) => conn
            .prepare_cached(
                "UPDATE host_swarm_list SET host_status=?, update_time=MAX(update_time, ?)
                 WHERE host_ip=? AND host_status=?
                 RETURNING host_ip, host_status, update_time",
            )?
            .query_row(params![new.as_str(), commit_ts, host_ip, prev.as_str()], raw_member)
            .optional()?,
    };
    match raw {
        Some(raw) => Ok(CasOutcome::Applied(raw.into_member()?)),
        None => Ok(CasOutcome::Conflict),
    }
}

impl Db {
    /// Current row for `host_ip`, whatever its status.
    pub fn member(&self, host_ip: &str) -> LedgerResult<Option<SwarmMember>> {
        get_member(&self.conn, host_ip)
    }

    /// All tracked hosts, optionally filtered by status, ordered by host_ip.
    pub fn members(&self, status: Option<HostStatus>) -> LedgerResult<Vec<SwarmMember>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT host_ip, host_status, update_time FROM host_swarm_list
             WHERE ?1 IS NULL OR host_status = ?1
             ORDER BY host_ip",
        )?;
        let rows = stmt.query_map([status.map(HostStatus::as_str)], raw_member)?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(raw?.into_member()?);
        }
        Ok(out)
    }
}

struct RawMember {
    host_ip: String,
    host_status: String,
    update_time: i64,
}

impl RawMember {
    fn into_member(self) -> LedgerResult<SwarmMember> {
        Ok(SwarmMember {
            host_ip: self.host_ip,
            host_status: self.host_status.parse()?,
            update_time: self.update_time,
        })
    }
}

fn raw_member(r: &Row<'_>) -> rusqlite::Result<RawMember> {
    Ok(RawMember { host_ip: r.get(0)?, host_status: r.get(1)?, update_time: r.get(2)? })
}
