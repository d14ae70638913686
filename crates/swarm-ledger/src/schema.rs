/// Ordered migrations; `version` is recorded in `schema_migrations` once applied.
pub const MIGRATIONS: &[(i64, &str)] = &[(1, MIG_0001_INIT)];

pub const BOOTSTRAP: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version         INTEGER PRIMARY KEY,
  applied_at      INTEGER NOT NULL
);
"#;

pub const MIG_0001_INIT: &str = r#"
CREATE TABLE host_online_find (
  data_id         TEXT PRIMARY KEY,
  host_ip         TEXT NOT NULL,
  scan_time       INTEGER NOT NULL,
  scan_port       INTEGER NOT NULL CHECK (scan_port BETWEEN 0 AND 65535)
);

CREATE TABLE host_swarm_list (
  host_ip         TEXT PRIMARY KEY,
  host_status     TEXT NOT NULL CHECK (host_status IN ('pending','active','running','inactive')),
  update_time     INTEGER NOT NULL
);

CREATE TABLE host_operate_history (
  data_id         TEXT PRIMARY KEY,
  host_ip         TEXT NOT NULL,
  operator_id     TEXT NOT NULL,
  operate_type    TEXT NOT NULL CHECK (operate_type IN ('add','remove')),
  operate_time    INTEGER NOT NULL,
  operate_reason  TEXT
);

CREATE TABLE swarm_operate_history (
  data_id         TEXT PRIMARY KEY,
  host_ip         TEXT NOT NULL,
  operator_id     TEXT NOT NULL,
  operate_type    TEXT NOT NULL CHECK (operate_type IN ('start','stop')),
  operate_time    INTEGER NOT NULL,
  operate_reason  TEXT
);

CREATE INDEX idx_find_scan ON host_online_find(scan_time, data_id);
CREATE INDEX idx_find_host ON host_online_find(host_ip);
CREATE INDEX idx_swarm_status ON host_swarm_list(host_status);
CREATE INDEX idx_host_hist ON host_operate_history(host_ip, operate_time);
CREATE INDEX idx_swarm_hist ON swarm_operate_history(host_ip, operate_time);
"#;

/// Tables the ledger owns, in export order.
pub const TABLES: &[&str] = &[
    "host_online_find",
    "host_swarm_list",
    "host_operate_history",
    "swarm_operate_history",
];
