use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::enrichr::{EnrichmentRequest, EnrichrClient, diagnostic};

pub const DEFAULT_RETRIES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, cap } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(cap)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub deadline: Option<Duration>,
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::None,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(DEFAULT_RETRIES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    Success { attempts: u32 },
    Exhausted { attempts: u32 },
}

pub struct EnrichmentInvoker<'a, E: EnrichrClient + ?Sized> {
    client: &'a E,
    policy: RetryPolicy,
}

impl<'a, E: EnrichrClient + ?Sized> EnrichmentInvoker<'a, E> {
    pub fn new(client: &'a E, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Calls the enrichment service until it succeeds or the policy gives up.
    ///
    /// Failures never escape: running out of attempts is reported as
    /// [`InvokeOutcome::Exhausted`].
    pub fn invoke(
        &self,
        request: &EnrichmentRequest<'_>,
        diagnostics: &mut dyn Write,
    ) -> InvokeOutcome {
        let started = Instant::now();
        let max_attempts = self.policy.attempts();
        let mut attempt = 1;
        loop {
            match self.client.enrich(request, diagnostics) {
                Ok(()) => {
                    info!(attempt, "enrichment call succeeded");
                    return InvokeOutcome::Success { attempts: attempt };
                }
                Err(err) => {
                    warn!(attempt, error = %err, "enrichment call failed");
                    diagnostic(diagnostics, format_args!("Attempt {attempt} failed: {err}"));
                }
            }

            if attempt >= max_attempts {
                diagnostic(
                    diagnostics,
                    format_args!("Retries exceeded after {attempt} attempts"),
                );
                return InvokeOutcome::Exhausted { attempts: attempt };
            }
            let delay = self.policy.backoff.delay_after(attempt);
            if let Some(deadline) = self.policy.deadline
                && started.elapsed() + delay >= deadline
            {
                diagnostic(
                    diagnostics,
                    format_args!(
                        "Deadline of {}s reached after {attempt} attempts",
                        deadline.as_secs_f64()
                    ),
                );
                return InvokeOutcome::Exhausted { attempts: attempt };
            }
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            attempt += 1;
        }
    }
}
