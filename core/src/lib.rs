//! Core types shared by the swarm membership ledger.

pub mod backoff;
pub mod config;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Milliseconds since the Unix epoch, UTC.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Text read back from storage that does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self { $($name::$variant => $text),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

/// Status of a tracked host in `host_swarm_list`.
///
/// A host with no row is "unknown". `Inactive` is the logical delete;
/// `Pending` rows may be written by external producers and, like
/// `Inactive`, are eligible for reactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Pending,
    Active,
    Running,
    Inactive,
}

text_enum!(HostStatus, "host_status", {
    Pending => "pending",
    Active => "active",
    Running => "running",
    Inactive => "inactive",
});

impl HostStatus {
    /// Active and running hosts are swarm members.
    pub const fn is_member(self) -> bool {
        matches!(self, HostStatus::Active | HostStatus::Running)
    }
}

/// `operate_type` of a `host_operate_history` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOperateType {
    Add,
    Remove,
}

text_enum!(HostOperateType, "host operate_type", {
    Add => "add",
    Remove => "remove",
});

/// `operate_type` of a `swarm_operate_history` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwarmOperateType {
    Start,
    Stop,
}

text_enum!(SwarmOperateType, "swarm operate_type", {
    Start => "start",
    Stop => "stop",
});
