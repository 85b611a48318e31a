//! Test doubles shared by the gateway and controller tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{PricePoint, Resource, ResourceData};
use crate::provider::{RateLimit, UpstreamSource};

/// One scripted upstream answer.
#[derive(Clone, Debug)]
pub enum Reply {
    Data(ResourceData),
    Status(u16),
    Transport,
}

/// Upstream stub that plays back a script and repeats its last reply.
pub struct StubSource {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    calls: Arc<AtomicUsize>,
    params: Mutex<Vec<BTreeMap<String, String>>>,
    delay: Duration,
    limit: RateLimit,
}

impl StubSource {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Arc::new(AtomicUsize::new(0)),
            params: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            limit: RateLimit {
                requests_per_minute: 6000,
                burst_capacity: 100.0,
            },
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self::new(vec![reply])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_limit(mut self, limit: RateLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Shared handle on the call counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Extra parameters received by each call, in call order.
    pub fn received_params(&self) -> Vec<BTreeMap<String, String>> {
        self.lock_params().clone()
    }

    fn lock_params(&self) -> std::sync::MutexGuard<'_, Vec<BTreeMap<String, String>>> {
        self.params.lock().unwrap()
    }

    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = script.pop_front() {
            *last = Some(reply);
        }
        last.clone().unwrap_or(Reply::Status(500))
    }
}

#[async_trait]
impl UpstreamSource for StubSource {
    fn id(&self) -> &'static str {
        "STUB"
    }

    fn supports(&self, _resource: &Resource) -> bool {
        true
    }

    fn rate_limit(&self) -> RateLimit {
        self.limit.clone()
    }

    async fn fetch(
        &self,
        _resource: &Resource,
        params: &BTreeMap<String, String>,
    ) -> Result<ResourceData, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock_params().push(params.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.next_reply() {
            Reply::Data(data) => Ok(data),
            Reply::Status(status) => Err(MarketDataError::Status {
                provider: "STUB".to_string(),
                status,
                body: String::new(),
            }),
            Reply::Transport => Err(MarketDataError::Transport {
                provider: "STUB".to_string(),
                message: "connection reset".to_string(),
                timeout: false,
            }),
        }
    }
}

/// A short ascending daily series.
pub fn series(len: usize, price: f64) -> ResourceData {
    ResourceData::Historical(
        (0..len)
            .map(|i| PricePoint::new(i as i64 * 86_400_000, price + i as f64))
            .collect(),
    )
}

/// Every JSON path in `value`, with arrays represented by their first element.
pub fn shape(value: &Value) -> BTreeSet<String> {
    fn walk(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = format!("{}.{}", prefix, key);
                    out.insert(path.clone());
                    walk(child, &path, out);
                }
            }
            Value::Array(items) => {
                if let Some(first) = items.first() {
                    walk(first, &format!("{}[]", prefix), out);
                }
            }
            _ => {}
        }
    }

    let mut out = BTreeSet::new();
    walk(value, "", &mut out);
    out
}
