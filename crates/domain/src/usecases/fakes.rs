//! Deterministic port implementations shared by use case tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::model::{MemoryRecord, PlatformPost, Post, PublishRequest};
use crate::ports::{
    Clock, FetchError, GenerationError, GenerationRequest, PostSource, PublishError, Publisher,
    SearchMode, StateError, StateStore, TextGenerator,
};

/// Returns canned posts per `from:<account>` query and records every query
#[derive(Default)]
pub struct FakePostSource {
    pub posts: HashMap<String, Vec<Post>>,
    /// Queries answered with a network error
    pub failing: HashSet<String>,
    /// When set, every fetch waits for a notification first
    pub gate: Option<Arc<Notify>>,
    pub queries: Mutex<Vec<(String, usize)>>,
}

impl FakePostSource {
    pub fn with_posts(posts: Vec<(&str, Vec<Post>)>) -> Self {
        Self {
            posts: posts
                .into_iter()
                .map(|(account, posts)| (format!("from:{}", account), posts))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, account: &str) -> Self {
        self.failing.insert(format!("from:{}", account));
        self
    }
}

#[async_trait]
impl PostSource for FakePostSource {
    async fn fetch_recent(
        &self,
        query: &str,
        limit: usize,
        _mode: SearchMode,
    ) -> Result<Vec<Post>, FetchError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        if self.failing.contains(query) {
            return Err(FetchError::Network("connection reset".to_string()));
        }
        Ok(self.posts.get(query).cloned().unwrap_or_default())
    }
}

/// Replays scripted replies in order and records every request
pub struct ScriptedGenerator {
    pub replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Api("no scripted reply".to_string())))
    }
}

/// How the fake publisher answers a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reply {
    #[default]
    Accept,
    NotAuthorized,
    ServerError,
}

/// Records standard and long-form requests
#[derive(Default)]
pub struct FakePublisher {
    pub disabled: bool,
    pub standard_reply: Reply,
    pub long_form_reply: Reply,
    pub standard: Mutex<Vec<PublishRequest>>,
    pub long_form: Mutex<Vec<PublishRequest>>,
}

impl FakePublisher {
    fn answer(&self, reply: Reply, request: &PublishRequest) -> Result<PlatformPost, PublishError> {
        match reply {
            Reply::Accept => {
                let n = self.standard.lock().unwrap().len() + self.long_form.lock().unwrap().len();
                let id = format!("1000{}", n);
                Ok(PlatformPost {
                    id: id.clone(),
                    text: request.text.clone(),
                    author: self.handle().to_string(),
                    conversation_id: Some(id),
                    created_at: None,
                })
            }
            Reply::NotAuthorized => Err(PublishError::NotAuthorized(
                "long-form posting requires a subscription".to_string(),
            )),
            Reply::ServerError => Err(PublishError::Api("503 Service Unavailable".to_string())),
        }
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish_standard(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        self.standard.lock().unwrap().push(request.clone());
        self.answer(self.standard_reply, request)
    }

    async fn publish_long_form(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        self.long_form.lock().unwrap().push(request.clone());
        self.answer(self.long_form_reply, request)
    }

    fn is_enabled(&self) -> bool {
        !self.disabled
    }

    fn handle(&self) -> &str {
        "digestbot"
    }
}

/// In-process cache and memory store; can be told to fail every call
#[derive(Default)]
pub struct FakeStateStore {
    pub fail: bool,
    pub cache: Mutex<HashMap<String, serde_json::Value>>,
    pub rooms: Mutex<HashSet<Uuid>>,
    pub participants: Mutex<HashSet<(Uuid, Uuid)>>,
    pub memories: Mutex<Vec<MemoryRecord>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeStateStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn enter(&self, call: &'static str) -> Result<(), StateError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(StateError::Database("disk I/O error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FakeStateStore {
    async fn set_cache(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError> {
        self.enter("set_cache")?;
        self.cache
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        self.enter("get_cache")?;
        Ok(self.cache.lock().unwrap().get(key).cloned())
    }

    async fn ensure_room(&self, room_id: Uuid) -> Result<(), StateError> {
        self.enter("ensure_room")?;
        self.rooms.lock().unwrap().insert(room_id);
        Ok(())
    }

    async fn ensure_participant(&self, room_id: Uuid, agent_id: Uuid) -> Result<(), StateError> {
        self.enter("ensure_participant")?;
        self.participants.lock().unwrap().insert((room_id, agent_id));
        Ok(())
    }

    async fn create_memory(&self, record: &MemoryRecord) -> Result<(), StateError> {
        self.enter("create_memory")?;
        self.memories.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn get_memory(&self, id: Uuid) -> Result<Option<MemoryRecord>, StateError> {
        self.enter("get_memory")?;
        Ok(self
            .memories
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }
}

pub struct FakeClock {
    pub time: OffsetDateTime,
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        self.time
    }
}
