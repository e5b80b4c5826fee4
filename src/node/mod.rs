//! Clustered service node
//!
//! Glue between the hosting framework's lifecycle callbacks and the
//! message layer. The framework calls, on one thread and never
//! concurrently:
//! - `on_start` once, with the latest snapshot if there is one
//! - `on_session_message` for every fragment of the replicated log
//! - `on_take_snapshot` when a snapshot is due
//!
//! None of these hooks fail outward. Failures are logged and counted,
//! and the outcome is returned for the caller to inspect.
//!
//! Replies are counted where they leave: the node's own responder sits on
//! a `MeteredChannel`, and a domain that acknowledges on its own channel
//! wraps it with the node's `metrics_handle()`.

use std::sync::Arc;

use crate::config::NodeConfig;
use crate::dispatch::{Demuxer, DispatchOutcome, DropReason};
use crate::domain::ParticipantDomain;
use crate::observability::{Event, LogSink, MetricsSnapshot, NodeMetrics};
use crate::responder::{SessionChannel, SessionResponder};
use crate::snapshot::{
    BackoffIdleStrategy, IdleStrategy, SnapshotImage, SnapshotLoadReport, SnapshotManager,
    SnapshotPublication, SnapshotResult, SnapshotState, SnapshotWriteSummary,
    DEFAULT_POLL_FRAGMENT_LIMIT,
};

/// Session channel that counts every reply it forwards
pub struct MeteredChannel<C> {
    inner: C,
    metrics: Arc<NodeMetrics>,
}

impl<C> MeteredChannel<C> {
    pub fn new(inner: C, metrics: Arc<NodeMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: SessionChannel> SessionChannel for MeteredChannel<C> {
    fn reply(&mut self, message: &[u8]) {
        self.inner.reply(message);
        self.metrics.increment_replies_sent();
    }
}

/// One replica's message layer around a participant domain
pub struct ClusterNode<D, C, L, I> {
    domain: D,
    responder: SessionResponder<MeteredChannel<C>, L>,
    demuxer: Demuxer<L>,
    snapshots: SnapshotManager<L, I>,
    metrics: Arc<NodeMetrics>,
    log: L,
}

impl<D, C, L, I> ClusterNode<D, C, L, I>
where
    D: ParticipantDomain,
    C: SessionChannel,
    L: LogSink + Clone,
    I: IdleStrategy,
{
    /// Node with default buffer and poll sizes
    pub fn new(domain: D, channel: C, log: L, idle: I) -> Self {
        let metrics = Arc::new(NodeMetrics::new());
        Self {
            domain,
            responder: SessionResponder::new(
                MeteredChannel::new(channel, Arc::clone(&metrics)),
                log.clone(),
            ),
            demuxer: Demuxer::new(log.clone()),
            snapshots: SnapshotManager::new(log.clone(), idle, DEFAULT_POLL_FRAGMENT_LIMIT),
            metrics,
            log,
        }
    }

    /// Count into `metrics` instead of the node's own registry.
    ///
    /// Hand the same registry to the `MeteredChannel` the domain
    /// acknowledges on so those replies land in `replies_sent` too.
    pub fn with_metrics(mut self, metrics: Arc<NodeMetrics>) -> Self {
        self.responder.channel_mut().metrics = Arc::clone(&metrics);
        self.metrics = metrics;
        self
    }

    /// Apply a hosting framework start. Loads `image` when the framework
    /// has a snapshot to restore from.
    pub fn on_start(
        &mut self,
        image: Option<&mut dyn SnapshotImage>,
    ) -> Option<SnapshotResult<SnapshotLoadReport>> {
        let loaded = image.map(|image| {
            let result = self.snapshots.load_snapshot(&mut self.domain, image);
            if let Ok(report) = &result {
                self.metrics.increment_snapshots_loaded();
                if !report.is_complete() {
                    self.metrics.increment_incomplete_loads();
                }
            }
            result
        });

        let snapshot = match &loaded {
            None => "none",
            Some(Ok(report)) if report.is_complete() => "loaded",
            Some(Ok(_)) => "loaded_incomplete",
            Some(Err(_)) => "failed",
        };
        self.log.info(
            Event::NodeStart,
            &[
                ("participants", &self.domain.participant_list().len().to_string()),
                ("snapshot", snapshot),
            ],
        );
        loaded
    }

    /// Apply one replicated log fragment
    pub fn on_session_message(&mut self, buffer: &[u8], offset: usize, length: usize) -> DispatchOutcome {
        let outcome = self
            .demuxer
            .dispatch(&mut self.domain, &mut self.responder, buffer, offset, length);

        match &outcome {
            DispatchOutcome::Applied(_) => self.metrics.increment_commands_applied(),
            DispatchOutcome::Dropped(reason) => {
                self.metrics.increment_messages_dropped();
                if matches!(reason, DropReason::UnknownTemplate(_)) {
                    self.metrics.increment_unknown_templates();
                }
            }
        }
        outcome
    }

    /// Write the current participants to `publication`
    pub fn on_take_snapshot(
        &mut self,
        publication: &mut dyn SnapshotPublication,
    ) -> SnapshotResult<SnapshotWriteSummary> {
        let result = self.snapshots.take_snapshot(&self.domain, publication);
        match &result {
            Ok(_) => self.metrics.increment_snapshots_written(),
            Err(_) => self.metrics.increment_snapshot_write_failures(),
        }
        result
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn domain_mut(&mut self) -> &mut D {
        &mut self.domain
    }

    pub fn responder(&self) -> &SessionResponder<MeteredChannel<C>, L> {
        &self.responder
    }

    pub fn snapshot_state(&self) -> SnapshotState {
        self.snapshots.state()
    }

    /// True when the snapshot loaded at start carried its end marker
    pub fn snapshot_complete(&self) -> bool {
        self.snapshots.completion_flag()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Shared registry, for wrapping other reply channels or for a
    /// monitoring thread to read
    pub fn metrics_handle(&self) -> Arc<NodeMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl<D, C, L> ClusterNode<D, C, L, BackoffIdleStrategy>
where
    D: ParticipantDomain,
    C: SessionChannel,
    L: LogSink + Clone,
{
    /// Node sized and paced by `config`
    pub fn from_config(domain: D, channel: C, log: L, config: &NodeConfig) -> Self {
        log.info(
            Event::ConfigLoaded,
            &[
                ("file_max_bytes", &config.snapshot.file_max_bytes.to_string()),
                ("min_severity", &config.log.min_severity),
                (
                    "poll_fragment_limit",
                    &config.snapshot.poll_fragment_limit.to_string(),
                ),
                (
                    "reply_buffer_capacity",
                    &config.responder.initial_buffer_capacity.to_string(),
                ),
            ],
        );
        let metrics = Arc::new(NodeMetrics::new());
        Self {
            domain,
            responder: SessionResponder::with_capacity(
                MeteredChannel::new(channel, Arc::clone(&metrics)),
                log.clone(),
                config.responder.initial_buffer_capacity,
            ),
            demuxer: Demuxer::new(log.clone()),
            snapshots: SnapshotManager::new(
                log.clone(),
                config.idle_strategy(),
                config.snapshot.poll_fragment_limit,
            ),
            metrics,
            log,
        }
    }
}
