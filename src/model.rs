//! Domain types and response normalization.
//!
//! The API answers in more than one envelope shape: payloads may arrive
//! under `data` or bare, lists under `data`/`agents`/`results`, identifiers
//! under `id`/`battleId`, and the winner field as either an object or a bare
//! string. Each shape gets exactly one normalization function here, with the
//! fallback-key order written out as data.

use serde_json::Value;

/// Keys a list payload may hide under, in lookup order.
pub const LIST_KEYS: &[&str] = &["data", "agents", "results"];

/// Keys a battle identifier may hide under, in lookup order.
pub const BATTLE_ID_KEYS: &[&str] = &["id", "battleId"];

/// A remote competitive unit. Read-only; fetched fresh each cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Agent {
    pub id: Option<String>,
    pub name: String,
    pub rating: i64,
    pub rank: Option<i64>,
    pub wins: u64,
    pub losses: u64,
}

impl Agent {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: coerce_string(&value["id"]),
            name: coerce_string(&value["name"]).unwrap_or_default(),
            rating: value["rating"].as_i64().unwrap_or(0),
            rank: value["rank"].as_i64(),
            wins: value["wins"].as_u64().unwrap_or(0),
            losses: value["losses"].as_u64().unwrap_or(0),
        }
    }

    /// "12W-3L (80%)"
    pub fn record(&self) -> String {
        let total = self.wins + self.losses;
        let win_rate = if total > 0 {
            (self.wins as f64 / total as f64 * 100.0).round() as u64
        } else {
            0
        };
        format!("{}W-{}L ({}%)", self.wins, self.losses, win_rate)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundResult {
    pub winner: Option<String>,
}

/// A remote asynchronous battle, possibly partially populated. The default
/// value (empty status) reads as "still running" to the poll loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Battle {
    /// Lowercased status string; empty when the fetch yielded nothing.
    pub status: String,
    pub winner_name: Option<String>,
    pub opponent_name: Option<String>,
    pub rounds: Vec<RoundResult>,
    pub old_rating: i64,
    pub new_rating: i64,
    pub rating_change: i64,
}

impl Battle {
    pub fn from_value(value: &Value) -> Self {
        let old_rating = value["oldRating"].as_i64().unwrap_or(0);
        let new_rating = value["newRating"].as_i64().unwrap_or(0);
        let rating_change = value["ratingChange"]
            .as_i64()
            .unwrap_or(new_rating - old_rating);

        let rounds = value["rounds"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| RoundResult {
                        winner: name_of(&entry["winner"]),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            status: coerce_string(&value["status"])
                .unwrap_or_default()
                .to_lowercase(),
            winner_name: name_of(&value["winner"]),
            opponent_name: name_of(&value["opponent"]),
            rounds,
            old_rating,
            new_rating,
            rating_change,
        }
    }

    /// Pure string equality between the winner's name and ours. A missing
    /// name on either side is never a win.
    pub fn is_win(&self, agent_name: Option<&str>) -> bool {
        match (self.winner_name.as_deref(), agent_name) {
            (Some(winner), Some(ours)) => winner == ours,
            _ => false,
        }
    }
}

/// One async event from the notification poll; consumed once, not persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationEvent {
    pub kind: String,
    pub message: String,
}

impl NotificationEvent {
    pub fn from_value(value: &Value) -> Self {
        Self {
            kind: coerce_string(&value["type"]).unwrap_or_default(),
            message: coerce_string(&value["message"]).unwrap_or_default(),
        }
    }
}

/// The interesting part of a response body: `data` when the envelope carries
/// one, otherwise the body itself.
pub fn payload(body: &Value) -> &Value {
    match body.get("data") {
        Some(data) if !data.is_null() => data,
        _ => body,
    }
}

/// First list found under `keys`, or the body itself when it is a bare array.
pub fn extract_list<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    for key in keys {
        if let Some(items) = body.get(*key).and_then(Value::as_array) {
            return Some(items);
        }
    }
    body.as_array()
}

/// Battle id from a start-battle response, wherever the service put it.
pub fn extract_battle_id(body: &Value) -> Option<String> {
    let battle = payload(body);
    BATTLE_ID_KEYS
        .iter()
        .find_map(|key| coerce_string(&battle[*key]))
}

/// Error message from a `{success:false, error:{message}}` envelope, however
/// loosely the `error` field is shaped.
pub fn error_message(body: &Value) -> String {
    match &body["error"] {
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
        Value::Null => "unknown error".to_string(),
        other => coerce_string(other).unwrap_or_else(|| "unknown error".to_string()),
    }
}

/// Winner/opponent fields are sometimes `{name: ...}` and sometimes a bare
/// string; non-structured values are coerced to a string.
fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(fields) => fields.get("name").and_then(coerce_string),
        _ => coerce_string(value),
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
