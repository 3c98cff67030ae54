//! Development-mode socket attach with bounded, growing backoff
//!
//! A server started out-of-band may still be booting when the editor
//! activates, so the attach is retried. The schedule lives in
//! [`RetryMachine`], a plain state machine with no I/O, and the dial step is
//! behind [`Dialer`] so the loop can be driven without sockets.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};

/// Retry budget for attaching to a development server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Number of connect attempts before giving up
    pub max_attempts: u32,
    /// Backoff added after every failed attempt
    pub step_ms: u64,
    /// Upper bound on the backoff
    pub max_delay_ms: u64,
    /// Timeout of a single connect attempt
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            step_ms: 250,
            max_delay_ms: 2500,
            attempt_timeout_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Wait before the given 1-based attempt: `min(step * (attempt - 1), max_delay)`
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let steps = u64::from(attempt.saturating_sub(1));
        Duration::from_millis(self.step_ms.saturating_mul(steps).min(self.max_delay_ms))
    }

    /// Sum of all waits when every attempt fails immediately
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_attempts).map(|a| self.delay_before(a)).sum()
    }

    /// Timeout of a single attempt
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Where the retry loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPhase {
    Idle,
    Waiting { attempt: u32, delay: Duration },
    Attempting { attempt: u32 },
    Connected { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Retry bookkeeping for one connection attempt sequence
#[derive(Debug)]
pub struct RetryMachine {
    policy: RetryPolicy,
    phase: RetryPhase,
    attempts: u32,
    last_error: Option<String>,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            phase: RetryPhase::Idle,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn phase(&self) -> &RetryPhase {
        &self.phase
    }

    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Move to the wait before the next attempt
    ///
    /// Returns the delay to sleep, or `None` once connected or exhausted.
    pub fn schedule_next(&mut self) -> Option<Duration> {
        match self.phase {
            RetryPhase::Connected { .. } | RetryPhase::Exhausted { .. } => return None,
            RetryPhase::Waiting { delay, .. } => return Some(delay),
            RetryPhase::Idle | RetryPhase::Attempting { .. } => {}
        }

        if self.attempts >= self.policy.max_attempts {
            self.phase = RetryPhase::Exhausted {
                attempts: self.attempts,
            };
            return None;
        }

        let attempt = self.attempts + 1;
        let delay = self.policy.delay_before(attempt);
        self.phase = RetryPhase::Waiting { attempt, delay };
        Some(delay)
    }

    /// Leave the wait and start dialing; returns the attempt number
    pub fn begin_attempt(&mut self) -> u32 {
        let attempt = match self.phase {
            RetryPhase::Waiting { attempt, .. } => attempt,
            _ => self.attempts + 1,
        };
        self.attempts = attempt;
        self.phase = RetryPhase::Attempting { attempt };
        attempt
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    pub fn record_success(&mut self) {
        self.phase = RetryPhase::Connected {
            attempts: self.attempts,
        };
    }

    /// The error surfaced once the budget is spent
    pub fn exhausted_error(&self) -> BridgeError {
        BridgeError::ConnectionExhausted {
            attempts: self.attempts,
            last_error: self.last_error.clone(),
        }
    }
}

/// Opens one connection attempt
#[async_trait]
pub trait Dialer: Send + Sync {
    type Stream: Send;

    async fn dial(&self, addr: SocketAddr) -> io::Result<Self::Stream>;
}

/// Plain TCP dialer
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}

/// Loopback address of a development server
pub fn dev_server_addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// Attach to a development server on `127.0.0.1:port`
pub async fn connect(port: u16, policy: &RetryPolicy) -> Result<TcpStream> {
    connect_with(&TcpDialer, dev_server_addr(port), policy).await
}

/// Drive the retry loop with an arbitrary dialer
pub async fn connect_with<D: Dialer>(
    dialer: &D,
    addr: SocketAddr,
    policy: &RetryPolicy,
) -> Result<D::Stream> {
    let mut machine = RetryMachine::new(policy.clone());

    while let Some(delay) = machine.schedule_next() {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let attempt = machine.begin_attempt();
        match tokio::time::timeout(policy.attempt_timeout(), dialer.dial(addr)).await {
            Ok(Ok(stream)) => {
                machine.record_success();
                info!(%addr, attempt, "Connected to language server socket");
                return Ok(stream);
            }
            Ok(Err(e)) => {
                debug!(%addr, attempt, error = %e, "Connect attempt failed");
                machine.record_failure(e.to_string());
            }
            Err(_) => {
                debug!(%addr, attempt, "Connect attempt timed out");
                machine.record_failure(format!(
                    "connect timed out after {}ms",
                    policy.attempt_timeout_ms
                ));
            }
        }
    }

    warn!(
        %addr,
        attempts = machine.attempts(),
        last_error = ?machine.last_error(),
        "Giving up on language server socket"
    );
    Err(machine.exhausted_error())
}
