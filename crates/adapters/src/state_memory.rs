//! In-memory state store for testing and offline mode

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use trend_digest_domain::{MemoryRecord, StateError, StateStore};
use uuid::Uuid;

/// In-memory state store implementation
pub struct InMemoryStateStore {
    cache: RwLock<HashMap<String, serde_json::Value>>,
    rooms: RwLock<HashSet<Uuid>>,
    participants: RwLock<HashSet<(Uuid, Uuid)>>,
    memories: RwLock<HashMap<Uuid, MemoryRecord>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashSet::new()),
            participants: RwLock::new(HashSet::new()),
            memories: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored memory records
    pub fn memory_count(&self) -> usize {
        self.memories.read().map(|m| m.len()).unwrap_or_default()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StateError {
    StateError::Database(e.to_string())
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn set_cache(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError> {
        let mut cache = self.cache.write().map_err(poisoned)?;
        cache.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        let cache = self.cache.read().map_err(poisoned)?;
        Ok(cache.get(key).cloned())
    }

    async fn ensure_room(&self, room_id: Uuid) -> Result<(), StateError> {
        self.rooms.write().map_err(poisoned)?.insert(room_id);
        Ok(())
    }

    async fn ensure_participant(&self, room_id: Uuid, agent_id: Uuid) -> Result<(), StateError> {
        self.participants
            .write()
            .map_err(poisoned)?
            .insert((room_id, agent_id));
        Ok(())
    }

    async fn create_memory(&self, record: &MemoryRecord) -> Result<(), StateError> {
        let mut memories = self.memories.write().map_err(poisoned)?;
        memories.entry(record.id).or_insert_with(|| record.clone());
        Ok(())
    }

    async fn get_memory(&self, id: Uuid) -> Result<Option<MemoryRecord>, StateError> {
        let memories = self.memories.read().map_err(poisoned)?;
        Ok(memories.get(&id).cloned())
    }
}
