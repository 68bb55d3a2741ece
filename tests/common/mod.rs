//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use draftline::adapters::{AdapterOutput, GenerationApi, GenerationRequest};
use draftline::config::{PipelineConfig, ScoringConfig};
use draftline::core::{Ranker, Scorer, Store};
use draftline::domain::{NewItem, RankingRun, SourceDescriptor};

pub const DELIM: &str = "===DRAFT-BREAK===";

/// Bodies far enough apart that none is a near-duplicate of another
pub const BODIES: [&str; 5] = [
    "The central bank published draft rules for retail payment tokens on Monday.",
    "A Nordic lender moved its card processing to a cloud core over the weekend.",
    "Insurers in Singapore began pricing flood risk with satellite imagery.",
    "Two brokerages agreed to settle a dispute over order routing fees.",
    "Merchants in Brazil now accept instant transfers at most grocery chains.",
];

pub fn item(source_id: i64, url: &str, title: &str, body: &str) -> NewItem {
    NewItem {
        source_id,
        url: url.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        author: None,
        published_at: None,
    }
}

/// Insert `count` distinct items from one source, scanned and published at `now`
pub fn seed(store: &Store, count: usize, now: DateTime<Utc>) -> Vec<i64> {
    let source_id = store
        .upsert_source(&SourceDescriptor::new("Fintech Daily", 8))
        .unwrap();

    (0..count)
        .map(|i| {
            let mut new = item(
                source_id,
                &format!("https://news.example/{}", i),
                &format!("Story {}", i),
                BODIES[i % BODIES.len()],
            );
            new.published_at = Some(now);
            store.insert_item(&new, now).unwrap()
        })
        .collect()
}

pub fn scorer() -> Scorer {
    Scorer::new(&ScoringConfig::default(), 180).unwrap()
}

pub fn pipeline(top_n: usize) -> PipelineConfig {
    PipelineConfig {
        top_n,
        ..PipelineConfig::default()
    }
}

pub fn run_ranker(store: &Store, top_n: usize, now: DateTime<Utc>) -> RankingRun {
    let scorer = scorer();
    Ranker::new(store, &scorer, pipeline(top_n)).run(now).unwrap()
}

/// Generation API that replays scripted replies and records every request
pub struct ScriptedApi {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedApi {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationApi for ScriptedApi {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<AdapterOutput> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(AdapterOutput::new(text)),
            Some(Err(message)) => anyhow::bail!("{}", message),
            None => anyhow::bail!("no scripted reply left"),
        }
    }
}

/// Join drafts the way a well-behaved batch reply would
pub fn batch_reply(drafts: &[&str]) -> String {
    drafts.join(&format!("\n{}\n", DELIM))
}
