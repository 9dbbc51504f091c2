//! Shared fixtures for integration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use skill_memory::{
    AgentContext, CompletionClient, Config, HashEmbedder, IndexHit, Prompt, SimilarityIndex,
    SqliteVectorIndex,
};
use std::collections::VecDeque;
use std::ops::Range;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Plays back queued responses, then repeats `fallback`.
/// A response of `"!error"` fails the call.
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<Prompt>>,
}

impl ScriptedCompletion {
    pub fn new(responses: &[&str], fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            fallback: fallback.to_string(),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn always(response: &str) -> Arc<Self> {
        Self::new(&[], response)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.clone());

        let response = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        if response == "!error" {
            anyhow::bail!("scripted completion failure");
        }
        Ok(response)
    }
}

/// Summarizes a procedure as the first line of its code, so descriptions
/// carry the words tests query for.
pub struct FirstLineDescriber {
    calls: AtomicUsize,
}

impl FirstLineDescriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FirstLineDescriber {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = prompt.user_text();
        Ok(text
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("//")
            .trim()
            .to_string())
    }
}

/// In-memory index whose upserts fail for the given attempt numbers
/// (1-based, counted across the index's lifetime).
pub struct FlakyIndex {
    inner: SqliteVectorIndex,
    failing_upserts: Range<usize>,
    upserts: AtomicUsize,
}

impl FlakyIndex {
    pub fn new(failing_upserts: Range<usize>) -> Self {
        Self {
            inner: SqliteVectorIndex::open_in_memory(Arc::new(HashEmbedder::default())).unwrap(),
            failing_upserts,
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SimilarityIndex for FlakyIndex {
    async fn upsert(&self, id: &str, text: &str, metadata: serde_json::Value) -> Result<()> {
        let attempt = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_upserts.contains(&attempt) {
            anyhow::bail!("embedding backend unavailable");
        }
        self.inner.upsert(id, text, metadata).await
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.inner.delete(ids).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>> {
        self.inner.query(text, k).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

pub fn config_for(ckpt: &Path) -> Config {
    let mut config = Config::default();
    config.store.ckpt_dir = ckpt.to_path_buf();
    config
}

pub fn context(config: Config, completion: Arc<dyn CompletionClient>) -> AgentContext {
    AgentContext::new(config, completion, Arc::new(HashEmbedder::default()))
}

/// Writes `run-{i}` sessions each holding `frames` PNG stubs `frame-{j}.png`
/// whose bytes are `"{session}:{frame}"`.
pub fn make_runs(base: &Path, sessions: &[u32], frames: usize) {
    for session in sessions {
        let dir = base.join(format!("run-{}", session));
        std::fs::create_dir_all(&dir).unwrap();
        for j in 0..frames {
            std::fs::write(
                dir.join(format!("frame-{}.png", j)),
                format!("{}:{}", session, j),
            )
            .unwrap();
        }
    }
}
