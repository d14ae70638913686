use serde::{Deserialize, Serialize};
use swarm_core::{HostOperateType, HostStatus, SwarmOperateType};
use uuid::Uuid;

/// Opaque row identifier. Generated ids are UUIDv7 strings.
pub type DataId = String;

pub fn new_data_id() -> DataId {
    Uuid::now_v7().to_string()
}

/// One `host_online_find` row: a scan saw `host_ip` reachable on `scan_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub data_id: DataId,
    pub host_ip: String,
    pub scan_time: i64,
    pub scan_port: u16,
}

/// One `host_swarm_list` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmMember {
    pub host_ip: String,
    pub host_status: HostStatus,
    pub update_time: i64,
}

/// One `host_operate_history` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOperation {
    pub data_id: DataId,
    pub host_ip: String,
    pub operator_id: String,
    pub operate_type: HostOperateType,
    pub operate_time: i64,
    pub operate_reason: Option<String>,
}

/// One `swarm_operate_history` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmOperation {
    pub data_id: DataId,
    pub host_ip: String,
    pub operator_id: String,
    pub operate_type: SwarmOperateType,
    pub operate_time: i64,
    pub operate_reason: Option<String>,
}

/// A row of either history table, as yielded by the unified timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuditEntry {
    Host(HostOperation),
    Swarm(SwarmOperation),
}

impl AuditEntry {
    pub fn data_id(&self) -> &str {
        match self {
            AuditEntry::Host(op) => &op.data_id,
            AuditEntry::Swarm(op) => &op.data_id,
        }
    }

    pub fn host_ip(&self) -> &str {
        match self {
            AuditEntry::Host(op) => &op.host_ip,
            AuditEntry::Swarm(op) => &op.host_ip,
        }
    }

    pub fn operate_time(&self) -> i64 {
        match self {
            AuditEntry::Host(op) => op.operate_time,
            AuditEntry::Swarm(op) => op.operate_time,
        }
    }

    /// `add`, `remove`, `start` or `stop`.
    pub fn operate_type(&self) -> &'static str {
        match self {
            AuditEntry::Host(op) => op.operate_type.as_str(),
            AuditEntry::Swarm(op) => op.operate_type.as_str(),
        }
    }
}

/// A discovered host that is not currently a swarm member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub host_ip: String,
    pub last_scan_time: i64,
    pub last_scan_port: u16,
    /// `None` when the host has never been tracked.
    pub host_status: Option<HostStatus>,
}
