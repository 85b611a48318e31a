//! Per-series training progress publication.
//!
//! A [`ProgressHub`] keeps the latest [`TrainingProgress`] per series key.
//! Subscribers get the current value, then every later update, and the
//! stream ends after the first terminal update. Each key has at most one
//! live subscription: subscribing again ends the previous stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, warn};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use super::forecast_model::TrainingProgress;

type Channels = Mutex<HashMap<String, Channel>>;

struct Channel {
    sender: watch::Sender<TrainingProgress>,
    subscriber: Option<CancellationToken>,
}

impl Channel {
    fn new() -> Self {
        let (sender, _) = watch::channel(TrainingProgress::default());
        Self {
            sender,
            subscriber: None,
        }
    }

    /// Nobody is listening and no training is mid-run.
    fn is_idle(&self) -> bool {
        let listening = self
            .subscriber
            .as_ref()
            .is_some_and(|token| !token.is_cancelled());
        let progress = self.sender.borrow();
        !listening && (progress.epoch == 0 || progress.is_complete())
    }
}

fn lock(channels: &Channels) -> MutexGuard<'_, HashMap<String, Channel>> {
    channels.lock().unwrap_or_else(|poisoned| {
        warn!("Progress hub mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Releases a key's channel when its subscription stream goes away.
struct Subscription {
    channels: Weak<Channels>,
    key: String,
    token: CancellationToken,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(channels) = self.channels.upgrade() else {
            return;
        };
        let mut channels = lock(&channels);
        let Some(channel) = channels.get_mut(&self.key) else {
            return;
        };
        // A superseded subscription no longer owns the channel
        if !self.token.is_cancelled() {
            self.token.cancel();
            channel.subscriber = None;
        }
        if channel.is_idle() {
            debug!("Releasing progress channel for '{}'", self.key);
            channels.remove(&self.key);
        }
    }
}

#[derive(Default)]
pub struct ProgressHub {
    channels: Arc<Channels>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_channel<T>(&self, key: &str, f: impl FnOnce(&mut Channel) -> T) -> T {
        let mut channels = lock(&self.channels);
        let channel = channels.entry(key.to_string()).or_insert_with(Channel::new);
        f(channel)
    }

    /// Record the latest progress for `key`.
    pub fn publish(&self, key: &str, progress: TrainingProgress) {
        self.with_channel(key, |channel| {
            channel.sender.send_replace(progress);
        });
    }

    /// Latest progress for `key`, or the idle default.
    pub fn current(&self, key: &str) -> TrainingProgress {
        lock(&self.channels)
            .get(key)
            .map(|channel| *channel.sender.borrow())
            .unwrap_or_default()
    }

    /// Number of keys currently holding a channel.
    pub fn len(&self) -> usize {
        lock(&self.channels).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop channels nobody listens to whose training is idle or finished.
    ///
    /// A finished run reads as the idle default afterwards.
    pub fn sweep_idle(&self) -> usize {
        let mut channels = lock(&self.channels);
        let before = channels.len();
        channels.retain(|_, channel| !channel.is_idle());
        before - channels.len()
    }

    /// Stream progress for `key` until a terminal update, superseding any
    /// earlier subscription for the same key.
    pub fn subscribe(&self, key: &str) -> BoxStream<'static, TrainingProgress> {
        let token = CancellationToken::new();
        let receiver = self.with_channel(key, |channel| {
            if let Some(previous) = channel.subscriber.replace(token.clone()) {
                debug!("Superseding progress subscription for '{}'", key);
                previous.cancel();
            }
            channel.sender.subscribe()
        });
        let subscription = Subscription {
            channels: Arc::downgrade(&self.channels),
            key: key.to_string(),
            token: token.clone(),
        };

        let updates = Box::pin(WatchStream::new(receiver).take_until(token.cancelled_owned()));
        stream::unfold(
            (updates, false, subscription),
            |(mut updates, finished, subscription)| async move {
                if finished {
                    return None;
                }
                let progress = updates.next().await?;
                let finished = progress.is_complete();
                Some((progress, (updates, finished, subscription)))
            },
        )
        .boxed()
    }
}
