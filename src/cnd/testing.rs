//! Scripted daemon for tests

use super::types::{CndInfo, SwapRequest};
use super::Cnd;
use crate::error::{SdkError, SdkResult};
use crate::siren::{Action, Entity};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One scripted answer to a fetch
#[derive(Debug, Clone)]
pub enum Reply {
    Entity(Entity),
    NotFound,
    Transport,
    Problem(u16),
}

/// Replays scripted fetch replies per href; the last reply of a script repeats
pub struct ScriptedCnd {
    fetches: Mutex<HashMap<String, VecDeque<Reply>>>,
    action_responses: HashMap<String, Value>,
    swaps: Vec<Entity>,
    info: CndInfo,
    created_href: String,
    fetch_count: Mutex<usize>,
    executed: Mutex<Vec<(String, Map<String, Value>)>>,
    posted: Mutex<Vec<SwapRequest>>,
}

impl ScriptedCnd {
    pub fn new() -> Self {
        Self {
            fetches: Mutex::new(HashMap::new()),
            action_responses: HashMap::new(),
            swaps: Vec::new(),
            info: CndInfo {
                id: "QmMakerPeer".to_string(),
                listen_addresses: vec!["/ip4/127.0.0.1/tcp/9939".to_string()],
            },
            created_href: "/swaps/rfc003/new-swap".to_string(),
            fetch_count: Mutex::new(0),
            executed: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, href: &str, replies: Vec<Reply>) -> Self {
        self.fetches
            .lock()
            .unwrap()
            .insert(href.to_string(), replies.into());
        self
    }

    /// Body returned when the action with this name is executed
    pub fn respond_to(mut self, action: &str, body: Value) -> Self {
        self.action_responses.insert(action.to_string(), body);
        self
    }

    pub fn with_swaps(mut self, swaps: Vec<Entity>) -> Self {
        self.swaps = swaps;
        self
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }

    pub fn executed(&self) -> Vec<(String, Map<String, Value>)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn executed_names(&self) -> Vec<String> {
        self.executed().into_iter().map(|(name, _)| name).collect()
    }

    pub fn posted(&self) -> Vec<SwapRequest> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Cnd for ScriptedCnd {
    async fn info(&self) -> SdkResult<CndInfo> {
        Ok(self.info.clone())
    }

    async fn fetch(&self, href: &str) -> SdkResult<Entity> {
        *self.fetch_count.lock().unwrap() += 1;

        let reply = {
            let mut fetches = self.fetches.lock().unwrap();
            match fetches.get_mut(href) {
                Some(replies) if replies.len() > 1 => replies.pop_front(),
                Some(replies) => replies.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Entity(entity)) => Ok(entity),
            Some(Reply::Transport) => Err(SdkError::Transport("connection refused".to_string())),
            Some(Reply::Problem(status)) => Err(SdkError::Problem {
                status,
                title: "Bad Request".to_string(),
                detail: None,
            }),
            Some(Reply::NotFound) | None => Err(SdkError::NotFound(href.to_string())),
        }
    }

    async fn execute_action(
        &self,
        action: &Action,
        fields: &Map<String, Value>,
    ) -> SdkResult<Option<Value>> {
        self.executed
            .lock()
            .unwrap()
            .push((action.name.clone(), fields.clone()));
        Ok(self.action_responses.get(&action.name).cloned())
    }

    async fn post_swap(&self, request: &SwapRequest) -> SdkResult<String> {
        self.posted.lock().unwrap().push(request.clone());
        Ok(self.created_href.clone())
    }

    async fn get_swaps(&self) -> SdkResult<Vec<Entity>> {
        Ok(self.swaps.clone())
    }
}

/// Swap entity with the given status and named POST actions
pub fn swap_entity(id: &str, status: &str, actions: &[&str]) -> Entity {
    let href = format!("/swaps/rfc003/{}", id);
    serde_json::from_value(serde_json::json!({
        "class": ["swap"],
        "properties": {
            "id": id,
            "role": "Bob",
            "status": status,
            "protocol": "rfc003",
            "counterparty": "QmTakerPeer",
            "parameters": {
                "alpha_ledger": { "name": "bitcoin", "network": "regtest" },
                "beta_ledger": { "name": "ethereum", "chain_id": 17 },
                "alpha_asset": { "name": "bitcoin", "quantity": "100000000" },
                "beta_asset": { "name": "ether", "quantity": "5000000000000000000" }
            },
            "state": {}
        },
        "links": [{ "rel": ["self"], "href": href }],
        "actions": actions.iter().map(|name| serde_json::json!({
            "name": name,
            "href": format!("{}/{}", href, name),
            "method": "POST"
        })).collect::<Vec<_>>()
    }))
    .unwrap()
}
