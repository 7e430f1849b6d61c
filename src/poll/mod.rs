//! Bounded polling over capture-and-match attempts.
//!
//! A poll sleeps `before` once, then repeats an attempt until it finds
//! something or the elapsed time exceeds `timeout`. The deadline is only
//! checked after an attempt finishes, so a slow attempt can overrun it.
//!
//! This module provides:
//! - The generic poller ([`poll`]) and its timing types
//! - The multi-configuration race ([`race`])
//! - Sequential alert clearing ([`clear_alerts`])

pub mod alerts;
pub mod race;
pub mod state;

pub use alerts::clear_alerts;
pub use race::{first_hit, race, RaceHit};
pub use state::PollState;

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use crate::config::PollDefaults;
use crate::geometry::MatchResult;

/// Resolved poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub before: Duration,
    pub timeout: Duration,
    pub interval: Duration,
    pub after: Duration,
}

/// Per-call timing overrides in seconds; unset fields use the strategy defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollOverrides {
    pub before: Option<f64>,
    pub timeout: Option<f64>,
    pub interval: Option<f64>,
    pub after: Option<f64>,
}

impl PollOverrides {
    pub fn timeout(secs: f64) -> Self {
        Self {
            timeout: Some(secs),
            ..Default::default()
        }
    }

    pub fn resolve(&self, defaults: &PollDefaults) -> Result<PollTiming> {
        Ok(PollTiming {
            before: seconds("before", self.before.unwrap_or(defaults.before))?,
            timeout: seconds("timeout", self.timeout.unwrap_or(defaults.timeout))?,
            interval: seconds("interval", self.interval.unwrap_or(defaults.interval))?,
            after: seconds("after", self.after.unwrap_or(defaults.after))?,
        })
    }
}

/// Converts seconds to a duration, rejecting negative or non-finite values.
pub fn seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow!("{} must be a non-negative duration, got {}", name, secs))
}

/// Anything a poll can test for success.
pub trait Observation {
    fn is_found(&self) -> bool;
}

impl Observation for MatchResult {
    fn is_found(&self) -> bool {
        self.found()
    }
}

impl<T: Observation, U> Observation for (T, U) {
    fn is_found(&self) -> bool {
        self.0.is_found()
    }
}

/// Outcome of a finished poll.
#[derive(Debug)]
pub struct Polled<T> {
    pub value: T,
    /// `Found` or `TimedOut`
    pub state: PollState,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Poll state machine driving one attempt per step.
pub struct Poller<'a, T, F> {
    timing: PollTiming,
    label: &'a str,
    attempt: F,
    state: PollState,
    started: Option<Instant>,
    attempts: u32,
    last: Option<T>,
}

impl<'a, T, F> Poller<'a, T, F>
where
    T: Observation,
    F: FnMut() -> Result<T>,
{
    pub fn new(timing: PollTiming, label: &'a str, attempt: F) -> Self {
        Self {
            timing,
            label,
            attempt,
            state: PollState::Init,
            started: None,
            attempts: 0,
            last: None,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Advances the state machine by one step.
    ///
    /// Returns `Ok(true)` while polling should continue.
    pub fn step(&mut self) -> Result<bool> {
        match self.state {
            PollState::Init => {
                self.state = PollState::WaitingBefore;
                Ok(true)
            }

            PollState::WaitingBefore => {
                std::thread::sleep(self.timing.before);
                self.started = Some(Instant::now());
                self.state = PollState::Polling;
                Ok(true)
            }

            PollState::Polling => {
                let value = (self.attempt)()?;
                self.attempts += 1;
                let found = value.is_found();
                let elapsed = self.elapsed();

                if elapsed > self.timing.timeout {
                    crate::log(&format!(
                        "{}: timed out after {} attempts in {:.2}s (found on last attempt: {})",
                        self.label,
                        self.attempts,
                        elapsed.as_secs_f64(),
                        found
                    ));
                    self.last = Some(value);
                    self.state = PollState::TimedOut;
                    return Ok(false);
                }

                if found {
                    crate::log(&format!(
                        "{}: found on attempt {} after {:.2}s",
                        self.label,
                        self.attempts,
                        elapsed.as_secs_f64()
                    ));
                    std::thread::sleep(self.timing.after);
                    self.last = Some(value);
                    self.state = PollState::Found;
                    return Ok(false);
                }

                crate::log(&format!("{}: attempt {} missed", self.label, self.attempts));
                std::thread::sleep(self.timing.interval);
                Ok(true)
            }

            PollState::Found | PollState::TimedOut => Ok(false),
        }
    }

    /// Steps until a terminal state and returns the final attempt's value.
    pub fn run(mut self) -> Result<Polled<T>> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        let elapsed = self.elapsed();
        let value = self
            .last
            .ok_or_else(|| anyhow!("{}: poll ended without an attempt", self.label))?;
        Ok(Polled {
            value,
            state: self.state,
            attempts: self.attempts,
            elapsed,
        })
    }
}

/// Runs a full poll with `attempt` as the capture-and-match cycle.
pub fn poll<T, F>(timing: PollTiming, label: &str, attempt: F) -> Result<Polled<T>>
where
    T: Observation,
    F: FnMut() -> Result<T>,
{
    Poller::new(timing, label, attempt).run()
}
