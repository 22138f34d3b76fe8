//! Notification relay.
//!
//! Once per cycle the scheduler drains each valid account's pending events
//! and surfaces them as log lines. Best-effort only: a failing poll for one
//! account is already an empty vector by the time it reaches us.

use tracing::info;

use crate::gateway::ArenaGateway;
use crate::roster::Account;
use crate::transport::Transport;

pub fn relay<T: Transport>(gateway: &ArenaGateway<T>, accounts: &[Account]) {
    for account in accounts {
        for event in gateway.poll_notifications(account) {
            info!(
                account = %account.name,
                kind = %event.kind,
                "{}: {}",
                describe(&event.kind),
                event.message
            );
        }
    }
}

fn describe(kind: &str) -> &str {
    match kind {
        "battle_complete" => "battle complete",
        "top100" => "entered the top 100",
        "rank_change" => "rank changed",
        "challenge" => "challenged",
        other => {
            if other.is_empty() {
                "notification"
            } else {
                other
            }
        }
    }
}
