//! Cycle scheduler.
//!
//! Validates the roster once at startup, then loops: relay notifications,
//! run each valid account's battle lifecycle in order (persisting the roster
//! after every account), jitter between accounts, report the cycle tally,
//! sleep out the cycle interval. A ctrl-c lands in the stop flag and is
//! honored at the next chunked-sleep boundary; any other mid-loop failure is
//! logged and followed by a cooldown, never a crash.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rand::Rng;
use tracing::{error, info, warn};

use crate::clock::{Sleeper, sleep_unless_stopped};
use crate::config::BotConfig;
use crate::error::BotError;
use crate::gateway::ArenaGateway;
use crate::lifecycle::BattleLifecycle;
use crate::notify;
use crate::roster::{self, Account};
use crate::transport::Transport;

pub struct CycleScheduler<T: Transport> {
    gateway: ArenaGateway<T>,
    config: BotConfig,
    roster_path: PathBuf,
    sleeper: Arc<dyn Sleeper>,
    stop: Arc<AtomicBool>,
}

impl<T: Transport> CycleScheduler<T> {
    pub fn new(
        gateway: ArenaGateway<T>,
        config: BotConfig,
        roster_path: PathBuf,
        sleeper: Arc<dyn Sleeper>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            gateway,
            config,
            roster_path,
            sleeper,
            stop,
        }
    }

    /// Check every account's credential via an agent listing and keep the
    /// ones the service accepts. An account with zero agents is still valid;
    /// it will report its own errors cycle by cycle. Zero valid accounts is
    /// a startup failure.
    pub fn validate(&self, accounts: Vec<Account>) -> Result<Vec<Account>> {
        let total = accounts.len();
        let mut valid = Vec::with_capacity(total);
        for account in accounts {
            match self.gateway.list_agents(&account) {
                Ok(agents) => {
                    info!(account = %account.name, agents = agents.len(), "account validated");
                    valid.push(account);
                }
                Err(BotError::CredentialRejected { status }) => {
                    warn!(account = %account.name, status, "API key rejected; account excluded");
                }
                Err(err) => {
                    // list_agents only errs on credential rejection today;
                    // anything else is kept and retried during cycles.
                    warn!(account = %account.name, error = %err, "validation inconclusive; keeping account");
                    valid.push(account);
                }
            }
        }
        if valid.is_empty() {
            bail!("no valid accounts out of {total}; check the API keys in the roster");
        }
        info!(valid = valid.len(), total, "roster validated");
        Ok(valid)
    }

    /// Main loop. Returns when the stop flag is raised (or after one cycle
    /// with `once`), persisting the roster on the way out.
    pub fn run(&self, mut accounts: Vec<Account>, once: bool) -> Result<()> {
        info!(
            accounts = accounts.len(),
            cycle_interval_secs = self.config.cycle_interval_secs,
            rounds = self.config.rounds,
            mode = self.config.mode_label(),
            "scheduler started"
        );

        let mut cycle: u64 = 0;
        while !self.stopped() {
            cycle += 1;
            if let Err(err) = self.run_cycle(cycle, &mut accounts) {
                if self.stopped() {
                    break;
                }
                error!(cycle, error = %format!("{err:#}"), "cycle failed");
                warn!(
                    cooldown_secs = self.config.error_cooldown_secs,
                    "cooling down before the next attempt"
                );
                if !sleep_unless_stopped(
                    self.sleeper.as_ref(),
                    self.config.error_cooldown(),
                    &self.stop,
                ) {
                    break;
                }
                continue;
            }

            if once {
                break;
            }
            info!(
                secs = self.config.cycle_interval_secs,
                "waiting for the next cycle"
            );
            if !sleep_unless_stopped(
                self.sleeper.as_ref(),
                self.config.cycle_interval(),
                &self.stop,
            ) {
                break;
            }
        }

        roster::save(&self.roster_path, &accounts).context("final roster save failed")?;
        info!("scheduler stopped; roster saved");
        Ok(())
    }

    fn run_cycle(&self, cycle: u64, accounts: &mut [Account]) -> Result<()> {
        info!(cycle, "cycle started");
        notify::relay(&self.gateway, accounts);

        let mut completed = 0usize;
        let mut failed = 0usize;
        let total = accounts.len();

        for index in 0..total {
            if self.stopped() {
                break;
            }

            let lifecycle = BattleLifecycle::new(
                &self.gateway,
                &self.config,
                self.sleeper.as_ref(),
                &self.stop,
            );
            let outcome = lifecycle.run(&mut accounts[index]);
            if outcome.completed() {
                completed += 1;
            } else {
                failed += 1;
            }

            // Persist immediately so progress survives a mid-cycle interrupt.
            roster::save(&self.roster_path, accounts).context("persisting roster")?;

            if index + 1 < total {
                let delay = self.jitter();
                info!(delay_secs = delay.as_secs_f64(), "inter-account delay");
                if !sleep_unless_stopped(self.sleeper.as_ref(), delay, &self.stop) {
                    break;
                }
            }
        }

        info!(cycle, completed, failed, "cycle summary");
        Ok(())
    }

    /// Uniform random delay from the configured range, so sequential
    /// accounts never hit the service in a fixed rhythm.
    fn jitter(&self) -> Duration {
        let [low, high] = self.config.account_delay_secs;
        let (low, high) = (low.min(high) as f64, low.max(high) as f64);
        Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}
