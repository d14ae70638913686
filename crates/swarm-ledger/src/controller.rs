//! Membership controller: applies operator intents to swarm membership.
//!
//! Each operation runs as one immediate SQLite transaction that reads the
//! host row, checks the transition, writes it with compare-and-set and
//! appends the matching audit row. Either both writes commit or neither
//! does. Conflicts and lock contention roll back and retry per the
//! configured [`RetryPolicy`].

use std::thread;

use swarm_core::backoff::RetryPolicy;
use swarm_core::config::Config;
use swarm_core::{now_ms, HostOperateType, HostStatus, SwarmOperateType};
use tracing::{debug, info, warn};

use crate::audit::{append_host_operation, append_swarm_operation};
use crate::error::{LedgerError, LedgerResult};
use crate::membership::{compare_and_set, get_member, CasOutcome};
use crate::models::{new_data_id, HostOperation, SwarmMember, SwarmOperation};
use crate::Db;

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    AddHost,
    RemoveHost,
    StartSwarm,
    StopSwarm,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    expected: Option<HostStatus>,
    next: HostStatus,
}

enum AuditKind {
    Host(HostOperateType),
    Swarm(SwarmOperateType),
}

impl Action {
    /// Check the precondition against the current row and pick the write.
    fn plan(self, host_ip: &str, current: Option<HostStatus>) -> LedgerResult<Transition> {
        use HostStatus::*;
        let to = |expected, next| Ok(Transition { expected, next });
        match (self, current) {
            (Action::AddHost, None) => to(None, Active),
            (Action::AddHost, Some(s @ (Pending | Inactive))) => to(Some(s), Active),
            (Action::AddHost, Some(Active | Running)) => Err(LedgerError::AlreadyMember(host_ip.to_string())),

            (Action::RemoveHost, Some(Active)) => to(Some(Active), Inactive),
            (Action::RemoveHost, Some(Running)) => Err(LedgerError::AlreadyRunning(host_ip.to_string())),
            (Action::RemoveHost, _) => Err(LedgerError::NotAMember(host_ip.to_string())),

            (Action::StartSwarm, Some(Active)) => to(Some(Active), Running),
            (Action::StartSwarm, Some(Running)) => Err(LedgerError::AlreadyRunning(host_ip.to_string())),
            (Action::StartSwarm, _) => Err(LedgerError::NotAMember(host_ip.to_string())),

            (Action::StopSwarm, Some(Running)) => to(Some(Running), Active),
            (Action::StopSwarm, _) => Err(LedgerError::NotRunning(host_ip.to_string())),
        }
    }

    fn audit_kind(self) -> AuditKind {
        match self {
            Action::AddHost => AuditKind::Host(HostOperateType::Add),
            Action::RemoveHost => AuditKind::Host(HostOperateType::Remove),
            Action::StartSwarm => AuditKind::Swarm(SwarmOperateType::Start),
            Action::StopSwarm => AuditKind::Swarm(SwarmOperateType::Stop),
        }
    }
}

/// The only writer of `host_swarm_list`.
pub struct MembershipController {
    db: Db,
    retry: RetryPolicy,
    clock: Clock,
}

impl MembershipController {
    pub fn new(db: Db, retry: RetryPolicy) -> Self {
        MembershipController { db, retry, clock: Box::new(now_ms) }
    }

    /// Open the configured database and build a controller over it.
    pub fn open(cfg: &Config) -> LedgerResult<Self> {
        Ok(Self::new(Db::open_with(&cfg.database)?, cfg.retry))
    }

    /// Replace the wall clock used for commit timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Read access to the underlying ledger (discovery, history, members).
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Admit `host_ip` as an active member. Inactive or pending rows are
    /// reactivated in place.
    pub fn add_host(&self, host_ip: &str, operator_id: &str, reason: Option<&str>) -> LedgerResult<SwarmMember> {
        self.apply(Action::AddHost, host_ip, operator_id, reason)
    }

    /// Logically delete a stopped member by marking it inactive.
    pub fn remove_host(&self, host_ip: &str, operator_id: &str, reason: Option<&str>) -> LedgerResult<()> {
        self.apply(Action::RemoveHost, host_ip, operator_id, reason).map(drop)
    }

    pub fn start_swarm(&self, host_ip: &str, operator_id: &str, reason: Option<&str>) -> LedgerResult<()> {
        self.apply(Action::StartSwarm, host_ip, operator_id, reason).map(drop)
    }

    pub fn stop_swarm(&self, host_ip: &str, operator_id: &str, reason: Option<&str>) -> LedgerResult<()> {
        self.apply(Action::StopSwarm, host_ip, operator_id, reason).map(drop)
    }

    fn apply(&self, action: Action, host_ip: &str, operator_id: &str, reason: Option<&str>) -> LedgerResult<SwarmMember> {
        let attempts = self.retry.max_attempts();
        for attempt in 1..=attempts {
            match self.try_apply(action, host_ip, operator_id, reason) {
                Ok(Some(member)) => {
                    info!(?action, %host_ip, %operator_id, status = %member.host_status, "membership change committed");
                    return Ok(member);
                }
                Ok(None) => debug!(?action, %host_ip, attempt, "compare-and-set conflict"),
                Err(e) if e.is_retryable() => debug!(?action, %host_ip, attempt, error = %e, "database busy"),
                Err(e) => return Err(e),
            }
            if attempt < attempts {
                let delay = self.retry.delay_after(attempt);
                warn!(?action, %host_ip, attempt, ?delay, "retrying membership change");
                thread::sleep(delay);
            }
        }
        warn!(?action, %host_ip, attempts, "giving up on membership change");
        Err(LedgerError::ConcurrentModification { host_ip: host_ip.to_string(), attempts })
    }

    /// One transactional attempt. `Ok(None)` means the row changed under us.
    fn try_apply(
        &self,
        action: Action,
        host_ip: &str,
        operator_id: &str,
        reason: Option<&str>,
    ) -> LedgerResult<Option<SwarmMember>> {
        let tx = self.db.begin_write()?;
        let current = get_member(&tx, host_ip)?;
        let transition = action.plan(host_ip, current.as_ref().map(|m| m.host_status))?;

        // Strictly after the previous change, even if the clock stepped back.
        let now = (self.clock)();
        let commit_ts = match &current {
            Some(m) => {
                let next = m
                    .update_time
                    .checked_add(1)
                    .ok_or_else(|| LedgerError::UpdateTimeOverflow(host_ip.to_string()))?;
                now.max(next)
            }
            None => now,
        };

        let member = match compare_and_set(&tx, host_ip, transition.expected, transition.next, commit_ts)? {
            CasOutcome::Applied(member) => member,
            CasOutcome::Conflict => return Ok(None),
        };

        let data_id = new_data_id();
        let operator_id = operator_id.to_string();
        let operate_reason = reason.map(str::to_string);
        match action.audit_kind() {
            AuditKind::Host(operate_type) => append_host_operation(
                &tx,
                &HostOperation {
                    data_id,
                    host_ip: host_ip.to_string(),
                    operator_id,
                    operate_type,
                    operate_time: member.update_time,
                    operate_reason,
                },
            )?,
            AuditKind::Swarm(operate_type) => append_swarm_operation(
                &tx,
                &SwarmOperation {
                    data_id,
                    host_ip: host_ip.to_string(),
                    operator_id,
                    operate_type,
                    operate_time: member.update_time,
                    operate_reason,
                },
            )?,
        }
        tx.commit()?;
        Ok(Some(member))
    }
}
