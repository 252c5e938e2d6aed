//! Acknowledgment tracking with bounded retries.
//!
//! One request may be outstanding per engine. The waiting caller blocks on a
//! condition variable; the receive path resolves it with [`AckEngine::acknowledge`].

use std::fmt;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use carlink_command::CommandId;
use tracing::{debug, info, warn};

use crate::error::{InterfaceError, Result};
use crate::lock;

/// Retry budget for one acknowledged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPolicy {
    /// Total number of transmissions.
    pub retries: u32,
    /// Wait after each transmission.
    pub timeout: Duration,
}

impl AckPolicy {
    pub const DEFAULT_RETRIES: u32 = 10;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);
    /// Writing the configuration takes the vehicle a while.
    pub const CONFIG_TIMEOUT: Duration = Duration::from_millis(2000);

    pub fn new(retries: u32, timeout: Duration) -> Self {
        Self { retries, timeout }
    }

    /// Default budget with the longer configuration timeout.
    pub fn for_config() -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            timeout: Self::CONFIG_TIMEOUT,
        }
    }
}

impl Default for AckPolicy {
    fn default() -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Result of an acknowledged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckOutcome {
    pub command: CommandId,
    /// Transmissions made, including the one that was acknowledged.
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Idle,
    Waiting {
        command: CommandId,
        acked: bool,
        abandoned: bool,
    },
}

impl Pending {
    fn is_unresolved(&self) -> bool {
        matches!(
            self,
            Pending::Waiting {
                acked: false,
                abandoned: false,
                ..
            }
        )
    }

    /// How the waiting request ended, once `attempts` transmissions went out.
    ///
    /// An acknowledgment only counts after at least one transmission.
    fn resolution(&self, attempts: u32, start: Instant) -> Option<Result<AckOutcome>> {
        match *self {
            Pending::Waiting {
                command,
                abandoned: true,
                ..
            } => Some(Err(InterfaceError::Abandoned(command))),
            Pending::Waiting {
                command,
                acked: true,
                ..
            } if attempts > 0 => Some(Ok(AckOutcome {
                command,
                attempts,
                elapsed: start.elapsed(),
            })),
            _ => None,
        }
    }
}

/// Single-slot request tracker.
pub struct AckEngine {
    state: Mutex<Pending>,
    cond: Condvar,
}

impl Default for AckEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AckEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Pending::Idle),
            cond: Condvar::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(*lock(&self.state), Pending::Idle)
    }

    /// The command currently waiting for acknowledgment.
    pub fn pending(&self) -> Option<CommandId> {
        match *lock(&self.state) {
            Pending::Idle => None,
            Pending::Waiting { command, .. } => Some(command),
        }
    }

    /// Resolve the outstanding request if it is waiting for `command`.
    ///
    /// Returns whether a request was resolved.
    pub fn acknowledge(&self, command: CommandId) -> bool {
        let mut state = lock(&self.state);
        match &mut *state {
            Pending::Waiting {
                command: pending,
                acked,
                abandoned: false,
            } if *pending == command && !*acked => {
                *acked = true;
                self.cond.notify_all();
                true
            }
            _ => {
                debug!(%command, "unsolicited acknowledgment");
                false
            }
        }
    }

    /// Fail the outstanding request without waiting for its budget.
    pub fn abandon(&self) -> bool {
        let mut state = lock(&self.state);
        if !state.is_unresolved() {
            return false;
        }
        if let Pending::Waiting {
            command, abandoned, ..
        } = &mut *state
        {
            *abandoned = true;
            info!(%command, "abandoning request");
        }
        self.cond.notify_all();
        true
    }

    /// Transmit with `transmit` until acknowledged or the budget runs out.
    ///
    /// `transmit` is called once per attempt and must send identical bytes
    /// each time. No lock is held while it runs.
    pub fn run<F>(
        &self,
        command: CommandId,
        policy: AckPolicy,
        mut transmit: F,
    ) -> Result<AckOutcome>
    where
        F: FnMut() -> Result<()>,
    {
        {
            let mut state = lock(&self.state);
            if let Pending::Waiting { command: busy, .. } = *state {
                warn!(
                    %command,
                    pending = %busy,
                    "rejecting request while another is outstanding"
                );
                return Err(InterfaceError::Busy(busy));
            }
            *state = Pending::Waiting {
                command,
                acked: false,
                abandoned: false,
            };
        }
        let _idle = IdleGuard(self);

        let start = Instant::now();
        for attempt in 1..=policy.retries {
            // An abandon or a late ack since the last wait ends the request
            // without another copy on the wire.
            let settled = lock(&self.state).resolution(attempt - 1, start);
            if let Some(done) = settled {
                return settle(done);
            }

            transmit()?;

            let state = lock(&self.state);
            let (state, _) = self
                .cond
                .wait_timeout_while(state, policy.timeout, |pending| pending.is_unresolved())
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(done) = state.resolution(attempt, start) {
                return settle(done);
            }
            drop(state);

            if attempt < policy.retries {
                debug!(%command, attempt, "no acknowledgment, retrying");
            }
        }

        warn!(%command, attempts = policy.retries, "giving up waiting for acknowledgment");
        Err(InterfaceError::AckTimeout {
            command,
            attempts: policy.retries,
            timeout: policy.timeout,
        })
    }
}

impl fmt::Debug for AckEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckEngine")
            .field("pending", &self.pending())
            .finish()
    }
}

fn settle(done: Result<AckOutcome>) -> Result<AckOutcome> {
    match &done {
        Ok(outcome) => debug!(
            command = %outcome.command,
            attempts = outcome.attempts,
            elapsed = ?outcome.elapsed,
            "acknowledged"
        ),
        Err(err) => debug!(error = %err, "request ended without acknowledgment"),
    }
    done
}

/// Returns the engine to idle however `run` exits.
struct IdleGuard<'a>(&'a AckEngine);

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.0.state) = Pending::Idle;
    }
}
