//! Arena API gateway: the four domain operations.
//!
//! The service has shipped more than one generation of routes, so each
//! operation walks an ordered candidate-path list and short-circuits on the
//! first usable answer. Adding an endpoint variant means appending to a
//! constant, not touching control flow.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::BotError;
use crate::executor::RequestExecutor;
use crate::model::{self, Agent, Battle, NotificationEvent};
use crate::roster::Account;
use crate::transport::{ApiRequest, Transport};

const AGENT_LIST_PATHS: &[&str] = &["/agents/me", "/agents", "/deploy/list"];
const BATTLE_START_PATHS: &[&str] = &["/battles", "/deploy/battle", "/battle/start"];
const NOTIFICATION_PATHS: &[&str] = &["/notifications/poll", "/notifications"];

pub struct ArenaGateway<T: Transport> {
    executor: RequestExecutor<T>,
    rounds: u32,
    challenge_mode: bool,
}

impl<T: Transport> ArenaGateway<T> {
    pub fn new(executor: RequestExecutor<T>, rounds: u32, challenge_mode: bool) -> Self {
        Self {
            executor,
            rounds,
            challenge_mode,
        }
    }

    #[cfg(test)]
    pub(crate) fn executor(&self) -> &RequestExecutor<T> {
        &self.executor
    }

    /// List the account's agents.
    ///
    /// A delivered 401/403 on any candidate is the credential-rejected
    /// signal; transport exhaustion only skips to the next candidate, and an
    /// account with no usable candidate reads as "zero agents".
    pub fn list_agents(&self, account: &Account) -> Result<Vec<Agent>, BotError> {
        for path in AGENT_LIST_PATHS {
            let request = ApiRequest::get(*path).with_bearer(&account.api_key);
            let response = match self.executor.execute(&request) {
                Ok(response) => response,
                Err(err) => {
                    debug!(path, error = %err, "agent list candidate unreachable");
                    continue;
                }
            };

            if response.status == 401 || response.status == 403 {
                return Err(BotError::CredentialRejected {
                    status: response.status,
                });
            }
            if response.status != 200 {
                debug!(path, status = response.status, "agent list candidate refused");
                continue;
            }
            if let Some(items) = model::extract_list(&response.body, model::LIST_KEYS) {
                return Ok(items.iter().map(Agent::from_value).collect());
            }
        }
        Ok(Vec::new())
    }

    /// Start a battle; `Some(battle_id)` on the first candidate that accepts.
    ///
    /// A delivered `success:false` envelope is an application refusal: its
    /// message is logged and the whole operation yields `None` rather than
    /// trying older routes with the same payload.
    pub fn start_battle(&self, account: &Account) -> Option<String> {
        let mut payload = json!({ "rounds": self.rounds });
        if let Some(agent_id) = &account.agent_id {
            payload["agentId"] = json!(agent_id);
        }
        if self.challenge_mode {
            payload["mode"] = json!("challenge");
        }

        for path in BATTLE_START_PATHS {
            let request =
                ApiRequest::post(*path, payload.clone()).with_bearer(&account.api_key);
            let response = match self.executor.execute(&request) {
                Ok(response) => response,
                Err(err) => {
                    debug!(path, error = %err, "battle start candidate unreachable");
                    continue;
                }
            };

            if response.status != 200 && response.status != 201 {
                debug!(path, status = response.status, "battle start candidate refused");
                continue;
            }
            if response.body["success"] == Value::Bool(false) {
                let refusal = BotError::Application(model::error_message(&response.body));
                warn!(account = %account.name, error = %refusal, "battle start refused by service");
                return None;
            }
            if let Some(battle_id) = model::extract_battle_id(&response.body) {
                return Some(battle_id);
            }
        }
        None
    }

    /// Fetch battle status. Any failure (exhausted transport, error status,
    /// junk body) returns `Battle::default()`, whose empty status the poll
    /// loop reads as "still running". Deliberate policy: a fetch hiccup must
    /// not fail a battle that may well still be in progress remotely.
    pub fn battle_status(&self, battle_id: &str, account: &Account) -> Battle {
        let request =
            ApiRequest::get(format!("/battles/{battle_id}")).with_bearer(&account.api_key);
        match self.executor.execute(&request) {
            Ok(response) => Battle::from_value(model::payload(&response.body)),
            Err(err) => {
                debug!(battle = battle_id, error = %err, "status fetch failed; assuming still running");
                Battle::default()
            }
        }
    }

    /// Drain pending notification events; empty on total failure.
    pub fn poll_notifications(&self, account: &Account) -> Vec<NotificationEvent> {
        for path in NOTIFICATION_PATHS {
            let request = ApiRequest::get(*path).with_bearer(&account.api_key);
            let response = match self.executor.execute(&request) {
                Ok(response) => response,
                Err(err) => {
                    debug!(path, error = %err, "notification candidate unreachable");
                    continue;
                }
            };
            if response.status != 200 {
                continue;
            }
            if let Some(items) = model::extract_list(&response.body, &["data"]) {
                return items.iter().map(NotificationEvent::from_value).collect();
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::InstantSleeper;
    use crate::transport::testing::{MockTransport, conn_refused, ok};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn account() -> Account {
        Account {
            name: "alpha".to_string(),
            api_key: "key-alpha".to_string(),
            battle_id: None,
            agent_id: Some("a-1".to_string()),
            agent_name: Some("Ferrite".to_string()),
        }
    }

    fn gateway(transport: MockTransport) -> ArenaGateway<MockTransport> {
        // Single attempt per candidate keeps the scripts readable.
        let executor = RequestExecutor::new(
            transport,
            1,
            Duration::from_secs(30),
            Arc::new(InstantSleeper::default()),
        );
        ArenaGateway::new(executor, 5, false)
    }

    #[test]
    fn list_agents_falls_through_to_later_candidates() {
        let gateway = gateway(MockTransport::scripted(vec![
            conn_refused(),
            ok(404, Value::Null),
            ok(200, json!({"data": [{"name": "Ferrite", "id": "a-1"}]})),
        ]));

        let agents = gateway.list_agents(&account()).unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "Ferrite");

        let paths: Vec<String> = gateway
            .executor
            .transport()
            .requests()
            .iter()
            .map(|r| r.path.clone())
            .collect();
        assert_eq!(paths, vec!["/agents/me", "/agents", "/deploy/list"]);
    }

    #[test]
    fn unauthorized_maps_to_credential_rejected() {
        let gateway = gateway(MockTransport::scripted(vec![ok(401, Value::Null)]));
        let err = gateway.list_agents(&account()).unwrap_err();
        assert!(matches!(err, BotError::CredentialRejected { status: 401 }));
        // No further candidates tried once auth is rejected.
        assert_eq!(gateway.executor.transport().call_count(), 1);
    }

    #[test]
    fn no_usable_candidate_reads_as_zero_agents() {
        let gateway = gateway(MockTransport::scripted(vec![
            conn_refused(),
            conn_refused(),
            conn_refused(),
        ]));
        let agents = gateway.list_agents(&account()).unwrap();
        assert!(agents.is_empty());
    }

    #[test]
    fn start_battle_sends_agent_id_and_returns_first_id() {
        let gateway = gateway(MockTransport::scripted(vec![ok(
            201,
            json!({"success": true, "data": {"battleId": "b-42"}}),
        )]));

        let battle_id = gateway.start_battle(&account());
        assert_eq!(battle_id.as_deref(), Some("b-42"));

        let requests = gateway.executor.transport().requests();
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["rounds"], 5);
        assert_eq!(body["agentId"], "a-1");
        assert!(body.get("mode").is_none());
        assert_eq!(requests[0].bearer.as_deref(), Some("key-alpha"));
    }

    #[test]
    fn start_battle_application_refusal_yields_none() {
        let gateway = gateway(MockTransport::scripted(vec![ok(
            200,
            json!({"success": false, "error": {"message": "agent busy"}}),
        )]));
        assert_eq!(gateway.start_battle(&account()), None);
        assert_eq!(gateway.executor.transport().call_count(), 1);
    }

    #[test]
    fn start_battle_none_when_all_candidates_fail() {
        let gateway = gateway(MockTransport::scripted(vec![
            ok(404, Value::Null),
            conn_refused(),
            ok(500, Value::Null),
        ]));
        assert_eq!(gateway.start_battle(&account()), None);
        assert_eq!(gateway.executor.transport().call_count(), 3);
    }

    #[test]
    fn challenge_mode_adds_mode_field() {
        let transport = MockTransport::scripted(vec![ok(
            200,
            json!({"data": {"id": "b-1"}}),
        )]);
        let executor = RequestExecutor::new(
            transport,
            1,
            Duration::from_secs(30),
            Arc::new(InstantSleeper::default()),
        );
        let gateway = ArenaGateway::new(executor, 7, true);

        gateway.start_battle(&account());
        let requests = gateway.executor.transport().requests();
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["mode"], "challenge");
        assert_eq!(body["rounds"], 7);
    }

    #[test]
    fn battle_status_failure_reads_as_still_running() {
        let gateway = gateway(MockTransport::scripted(vec![conn_refused()]));
        let battle = gateway.battle_status("b-42", &account());
        assert_eq!(battle, Battle::default());
        assert_eq!(battle.status, "");
    }

    #[test]
    fn battle_status_unwraps_data_envelope() {
        let gateway = gateway(MockTransport::scripted(vec![ok(
            200,
            json!({"data": {"status": "Running"}}),
        )]));
        let battle = gateway.battle_status("b-42", &account());
        assert_eq!(battle.status, "running");
    }

    #[test]
    fn notifications_fall_back_and_tolerate_total_failure() {
        let gateway = gateway(MockTransport::scripted(vec![
            ok(404, Value::Null),
            ok(200, json!({"data": [{"type": "top100", "message": "in!"}]})),
        ]));
        let events = gateway.poll_notifications(&account());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "top100");

        let gateway = gateway_all_down();
        assert!(gateway.poll_notifications(&account()).is_empty());
    }

    fn gateway_all_down() -> ArenaGateway<MockTransport> {
        gateway(MockTransport::scripted(vec![conn_refused(), conn_refused()]))
    }
}
