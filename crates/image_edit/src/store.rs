use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Example {
    pub id: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Opaque, read-only persistence for `Example` records.
/// Rows are written by whoever owns the backing store.
pub trait ExampleStore: Send + Sync {
    fn find_many(&self) -> Vec<Example>;
}

#[derive(Debug, Default)]
pub struct InMemoryExampleStore {
    rows: RwLock<Vec<Example>>,
}

impl InMemoryExampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `count` rows
    pub fn seeded(count: usize) -> Self {
        let store = Self::new();
        for _ in 0..count {
            store.create();
        }
        store
    }

    pub fn create(&self) -> Example {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let example = Example {
            id: format!("ex_{:06}", rows.len() + 1),
            created_at: now,
            updated_at: now,
        };
        rows.push(example.clone());
        example
    }
}

impl ExampleStore for InMemoryExampleStore {
    fn find_many(&self) -> Vec<Example> {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
