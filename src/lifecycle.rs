//! Per-account battle lifecycle state machine.
//!
//! SelectingAgent → Starting → Polling → {Won, Lost, Errored, TimedOut}.
//! Every terminal path clears the account's in-flight battle id before
//! returning, so the persisted roster never carries a stale battle across a
//! restart. The accepted cost: a battle that is genuinely still running
//! remotely after a local timeout is forgotten.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tracing::{info, warn};

use crate::clock::{Sleeper, sleep_unless_stopped};
use crate::config::BotConfig;
use crate::error::BotError;
use crate::gateway::ArenaGateway;
use crate::model::Battle;
use crate::roster::Account;
use crate::transport::Transport;

/// Statuses after which no further polling changes the outcome.
const SUCCESS_STATUSES: &[&str] = &["finished", "completed", "done", "ended"];
const FAILURE_STATUSES: &[&str] = &["cancelled", "error", "failed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Won,
    Lost,
    Errored,
    TimedOut,
}

impl BattleOutcome {
    /// A battle that ran to completion counts as a successful lifecycle run
    /// for the cycle tally, win or lose.
    pub fn completed(self) -> bool {
        matches!(self, BattleOutcome::Won | BattleOutcome::Lost)
    }
}

pub struct BattleLifecycle<'a, T: Transport> {
    gateway: &'a ArenaGateway<T>,
    config: &'a BotConfig,
    sleeper: &'a dyn Sleeper,
    stop: &'a AtomicBool,
}

impl<'a, T: Transport> BattleLifecycle<'a, T> {
    pub fn new(
        gateway: &'a ArenaGateway<T>,
        config: &'a BotConfig,
        sleeper: &'a dyn Sleeper,
        stop: &'a AtomicBool,
    ) -> Self {
        Self {
            gateway,
            config,
            sleeper,
            stop,
        }
    }

    pub fn run(&self, account: &mut Account) -> BattleOutcome {
        info!(account = %account.name, "account run started");

        // SelectingAgent
        let agents = match self.gateway.list_agents(account) {
            Ok(agents) => agents,
            Err(BotError::CredentialRejected { status }) => {
                warn!(account = %account.name, status, "agent fetch rejected; check the API key");
                return BattleOutcome::Errored;
            }
            Err(err) => {
                warn!(account = %account.name, error = %err, "agent fetch failed");
                return BattleOutcome::Errored;
            }
        };
        if agents.is_empty() {
            warn!(
                account = %account.name,
                "no agents found; create one on the MoltArena site first"
            );
            return BattleOutcome::Errored;
        }

        let selected = agents
            .iter()
            .find(|agent| Some(agent.name.as_str()) == account.agent_name.as_deref())
            .unwrap_or(&agents[0]);
        account.agent_name = Some(selected.name.clone());
        account.agent_id = selected.id.clone();
        info!(
            agent = %selected.name,
            rating = selected.rating,
            rank = ?selected.rank,
            record = %selected.record(),
            "agent selected"
        );

        // Starting
        info!(
            rounds = self.config.rounds,
            mode = self.config.mode_label(),
            "starting battle"
        );
        let Some(battle_id) = self.gateway.start_battle(account) else {
            warn!(account = %account.name, "battle start failed");
            return BattleOutcome::Errored;
        };
        account.battle_id = Some(battle_id.clone());
        info!(battle = %short_id(&battle_id), "battle started");

        // Polling
        let outcome = self.poll(account, &battle_id);
        account.battle_id = None;
        outcome
    }

    fn poll(&self, account: &Account, battle_id: &str) -> BattleOutcome {
        let interval = self.config.poll_interval();
        let budget = self.config.max_battle_wait();
        let mut waited = Duration::ZERO;

        while waited < budget {
            if !sleep_unless_stopped(self.sleeper, interval, self.stop) {
                info!(battle = %short_id(battle_id), "interrupted while waiting; abandoning battle");
                return BattleOutcome::Errored;
            }
            waited += interval;

            let battle = self.gateway.battle_status(battle_id, account);
            let status = battle.status.as_str();

            if SUCCESS_STATUSES.contains(&status) {
                let outcome = if battle.is_win(account.agent_name.as_deref()) {
                    BattleOutcome::Won
                } else {
                    BattleOutcome::Lost
                };
                report_result(account, &battle, outcome, waited);
                return outcome;
            }
            if FAILURE_STATUSES.contains(&status) {
                warn!(battle = %short_id(battle_id), status, "battle cancelled or failed");
                return BattleOutcome::Errored;
            }

            info!(
                status = if status.is_empty() { "running" } else { status },
                waited_secs = waited.as_secs(),
                "waiting for battle result"
            );
        }

        let timeout = BotError::TimedOut {
            budget_secs: budget.as_secs(),
        };
        warn!(battle = %short_id(battle_id), error = %timeout, "giving up on battle");
        BattleOutcome::TimedOut
    }
}

fn report_result(account: &Account, battle: &Battle, outcome: BattleOutcome, waited: Duration) {
    let opponent = battle.opponent_name.as_deref().unwrap_or("?");
    info!(
        account = %account.name,
        outcome = if outcome == BattleOutcome::Won { "won" } else { "lost" },
        opponent,
        waited_secs = waited.as_secs(),
        "battle finished"
    );

    if !battle.rounds.is_empty() {
        let ours = account.agent_name.as_deref();
        let row: Vec<String> = battle
            .rounds
            .iter()
            .enumerate()
            .map(|(index, round)| {
                let mark = if round.winner.as_deref() == ours { "W" } else { "L" };
                format!("R{}{}", index + 1, mark)
            })
            .collect();
        info!(rounds = %row.join(" "), "round results");
    }

    if battle.old_rating != 0 && battle.new_rating != 0 {
        info!(
            from = battle.old_rating,
            to = battle.new_rating,
            change = battle.rating_change,
            "rating updated"
        );
    }
}

/// Battle ids are long opaque strings; logs only need a prefix.
fn short_id(battle_id: &str) -> &str {
    battle_id.get(..12).unwrap_or(battle_id)
}
