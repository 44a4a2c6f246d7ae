//! Shard fleet manager
//!
//! Fetches the recommended fleet layout, starts shards bucket by bucket and
//! fans outbound payloads out to online shards.

use dashmap::DashMap;
use itx_core::Intents;
use itx_rest::{RestHandler, RestHandlerExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::GatewayError;
use crate::protocol::connection_url;
use crate::shard::{EventHandler, Shard, ShardConfig, ShardStatus};
use crate::socket::Connector;

/// Minimum gap between two identifies of the same bucket
pub const DEFAULT_IDENTIFY_SPACING: Duration = Duration::from_secs(5);

/// Owns every shard of one bot
pub struct ShardManager {
    token: String,
    rest: Arc<dyn RestHandler>,
    connector: Arc<dyn Connector>,
    on_event: EventHandler,
    identify_spacing: Duration,
    shards: Arc<DashMap<u16, Arc<Shard>>>,
    started: AtomicBool,
    root: Mutex<Option<CancellationToken>>,
    tracker: TaskTracker,
}

impl ShardManager {
    pub fn new(
        token: impl Into<String>,
        rest: Arc<dyn RestHandler>,
        connector: Arc<dyn Connector>,
        on_event: EventHandler,
    ) -> Self {
        Self {
            token: token.into(),
            rest,
            connector,
            on_event,
            identify_spacing: DEFAULT_IDENTIFY_SPACING,
            shards: Arc::new(DashMap::new()),
            started: AtomicBool::new(false),
            root: Mutex::new(None),
            tracker: TaskTracker::new(),
        }
    }

    #[must_use]
    pub fn with_identify_spacing(mut self, spacing: Duration) -> Self {
        self.identify_spacing = spacing;
        self
    }

    /// Connect the fleet and block until every shard has stopped
    ///
    /// `forced_count > 0` overrides the recommended shard count. Returns the
    /// first terminal close any shard hit; that also stops the rest of the fleet.
    pub async fn start(
        &self,
        cancel: &CancellationToken,
        intents: Intents,
        forced_count: u16,
    ) -> Result<(), GatewayError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(GatewayError::AlreadyStarted);
        }

        let root = cancel.child_token();
        *self.root.lock() = Some(root.clone());

        let gateway = match self.rest.gateway_bot().await {
            Ok(gateway) => gateway,
            Err(err) => {
                self.stop().await;
                return Err(err.into());
            }
        };

        let total = if forced_count > 0 {
            forced_count
        } else {
            gateway.shards.max(1)
        };
        let concurrency = gateway.session_start_limit.max_concurrency.max(1);
        let url = connection_url(&gateway.url);

        tracing::info!(
            shards = total,
            max_concurrency = concurrency,
            "Starting shard fleet"
        );

        let failure: Arc<Mutex<Option<GatewayError>>> = Arc::new(Mutex::new(None));

        for bucket in 0..concurrency.min(total) {
            let spawner = BucketSpawner {
                bucket,
                concurrency,
                total,
                intents,
                token: self.token.clone(),
                url: url.clone(),
                spacing: self.identify_spacing,
                connector: Arc::clone(&self.connector),
                on_event: Arc::clone(&self.on_event),
                shards: Arc::clone(&self.shards),
                tracker: self.tracker.clone(),
                root: root.clone(),
                failure: Arc::clone(&failure),
            };
            self.tracker.spawn(spawner.run());
        }

        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("All shards have stopped");

        let failure = failure.lock().take();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Cancel every shard and wait for them to exit; safe to call repeatedly
    pub async fn stop(&self) {
        let root = self.root.lock().clone();
        if let Some(root) = root {
            tracing::debug!("Stopping all shards");
            root.cancel();
        }
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub fn status(&self) -> HashMap<u16, ShardStatus> {
        self.shards
            .iter()
            .map(|entry| (*entry.key(), entry.value().status()))
            .collect()
    }

    pub fn shard(&self, shard_id: u16) -> Option<Arc<Shard>> {
        self.shards.get(&shard_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Best-effort send through one online shard; never waits on the socket
    pub fn send(&self, shard_id: u16, payload: Value) {
        let Some(shard) = self.shard(shard_id) else {
            tracing::debug!(shard_id, "No such shard, dropping payload");
            return;
        };

        if shard.status() != ShardStatus::Online {
            tracing::debug!(shard_id, status = %shard.status(), "Shard not online, dropping payload");
            return;
        }

        spawn_send(shard, payload);
    }

    /// Best-effort send through every online shard
    pub fn broadcast(&self, payload: &Value) {
        for entry in self.shards.iter() {
            let shard = entry.value();
            if shard.status() != ShardStatus::Online {
                tracing::debug!(shard_id = shard.id(), "Shard not online, skipping broadcast");
                continue;
            }
            spawn_send(Arc::clone(shard), payload.clone());
        }
    }
}

impl std::fmt::Debug for ShardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardManager")
            .field("shards", &self.shards.len())
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn spawn_send(shard: Arc<Shard>, payload: Value) {
    tokio::spawn(async move {
        if let Err(err) = shard.send(&payload).await {
            tracing::debug!(shard_id = shard.id(), error = %err, "Failed to send payload");
        }
    });
}

/// Starts the shards of one bucket, one identify spacing apart
struct BucketSpawner {
    bucket: u16,
    concurrency: u16,
    total: u16,
    intents: Intents,
    token: String,
    url: String,
    spacing: Duration,
    connector: Arc<dyn Connector>,
    on_event: EventHandler,
    shards: Arc<DashMap<u16, Arc<Shard>>>,
    tracker: TaskTracker,
    root: CancellationToken,
    failure: Arc<Mutex<Option<GatewayError>>>,
}

impl BucketSpawner {
    async fn run(self) {
        let mut shard_id = self.bucket;

        while shard_id < self.total {
            if shard_id != self.bucket {
                tracing::debug!(bucket = self.bucket, "Waiting before next identify in bucket");
                tokio::select! {
                    () = self.root.cancelled() => return,
                    () = tokio::time::sleep(self.spacing) => {}
                }
            }
            if self.root.is_cancelled() {
                return;
            }

            tracing::debug!(shard_id, bucket = self.bucket, "Spawning shard");
            let shard = Arc::new(Shard::new(
                ShardConfig {
                    id: shard_id,
                    total: self.total,
                    token: self.token.clone(),
                    intents: self.intents,
                },
                Arc::clone(&self.connector),
                Arc::clone(&self.on_event),
            ));
            self.shards.insert(shard_id, Arc::clone(&shard));

            let root = self.root.clone();
            let url = self.url.clone();
            let failure = Arc::clone(&self.failure);
            self.tracker.spawn(async move {
                if let Err(err) = shard.start(root.clone(), url).await {
                    tracing::error!(error = %err, "Shard stopped with terminal error, stopping fleet");
                    let mut failure = failure.lock();
                    if failure.is_none() {
                        *failure = Some(err);
                    }
                    drop(failure);
                    root.cancel();
                }
            });

            shard_id = shard_id.saturating_add(self.concurrency);
        }
    }
}
