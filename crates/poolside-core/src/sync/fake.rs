//! Scripted in-process remote authority for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::remote::{RemoteAuthority, SubmitAck, SubmitError, SubmitRequest};

/// What the fake does with the next submission
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Accept (or replay) and acknowledge
    Ack,
    /// Accept server-side but lose the response
    AckLost,
    /// Unreachable; nothing reaches the server
    Unavailable,
    /// Reject the payload
    Reject(String),
    /// Never answer within `Duration`
    Hang(Duration),
}

#[derive(Default)]
struct State {
    script: VecDeque<Behavior>,
    /// dedup_key -> remote_id, the server's idempotency table
    accepted: HashMap<String, String>,
    calls: Vec<SubmitRequest>,
    next_id: u32,
}

/// Server-side idempotent fake; behaviors are consumed in order, then `Ack`
pub struct FakeAuthority {
    state: Mutex<State>,
    id_prefix: String,
}

impl FakeAuthority {
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            id_prefix: "srv-".to_string(),
        }
    }

    /// Start remote ids at `first`, e.g. `srv-77`
    pub fn starting_at(first: u32) -> Self {
        let fake = Self::new();
        fake.state.lock().unwrap().next_id = first;
        fake
    }

    pub fn script(self, behaviors: impl IntoIterator<Item = Behavior>) -> Self {
        self.state.lock().unwrap().script.extend(behaviors);
        self
    }

    pub fn calls(&self) -> Vec<SubmitRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Distinct DQs the server has stored
    pub fn accepted_count(&self) -> usize {
        self.state.lock().unwrap().accepted.len()
    }

    pub fn remote_id_for(&self, dedup_key: &str) -> Option<String> {
        self.state.lock().unwrap().accepted.get(dedup_key).cloned()
    }

    fn accept(&self, state: &mut State, request: &SubmitRequest) -> String {
        if let Some(existing) = state.accepted.get(&request.dedup_key) {
            return existing.clone();
        }
        let remote_id = format!("{}{}", self.id_prefix, state.next_id);
        state.next_id += 1;
        state
            .accepted
            .insert(request.dedup_key.clone(), remote_id.clone());
        remote_id
    }
}

impl Default for FakeAuthority {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteAuthority for FakeAuthority {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitAck, SubmitError> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(request.clone());
            state.script.pop_front().unwrap_or(Behavior::Ack)
        };

        match behavior {
            Behavior::Ack => {
                let mut state = self.state.lock().unwrap();
                let remote_id = self.accept(&mut state, request);
                Ok(SubmitAck { remote_id })
            }
            Behavior::AckLost => {
                let mut state = self.state.lock().unwrap();
                self.accept(&mut state, request);
                Err(SubmitError::Retryable("connection reset".into()))
            }
            Behavior::Unavailable => Err(SubmitError::Retryable("network unreachable".into())),
            Behavior::Reject(message) => Err(SubmitError::Terminal(message)),
            Behavior::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(SubmitError::Retryable("hung request finished late".into()))
            }
        }
    }
}
