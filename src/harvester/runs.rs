//! Session lifecycle and the strategy processing loop.
//!
//! `start_*` claims the single-flight run slot, records the session, and
//! spawns a driver task that walks the strategy schedule. One strategy's
//! failure is never fatal to a comprehensive or targeted run; a stop request
//! takes effect at the next strategy boundary.

use super::{ActiveRun, RunCounters, VideoHarvester};
use crate::db::SessionProgress;
use crate::error::{Error, Result};
use crate::retry::{call_with_rotation, execute_with_retry};
use crate::scoring::ScoreContext;
use crate::source::SearchOptions;
use crate::strategy::{SearchStrategy, StrategySchedule};
use crate::types::{
    Event, HarvestStatus, RunMode, RunParams, RunnerState, SessionId, SessionSnapshot,
    SessionStatus,
};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

/// Per-strategy processing result
struct StrategyOutcome {
    items_extracted: u64,
    relevant_items: u64,
    sink_errors: u64,
}

impl VideoHarvester {
    /// Start a run for one caller-supplied query.
    ///
    /// In single-query mode a strategy failure fails the session.
    pub async fn start_single(
        &self,
        query: impl Into<String>,
        params: RunParams,
    ) -> Result<SessionId> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(Error::Config {
                message: "query must not be empty".to_string(),
                key: None,
            });
        }

        let strategy = SearchStrategy::tagged(query.clone(), "single", 1)
            .with_max_results(params.max_results);
        let configuration = serde_json::json!({
            "type": "single",
            "query": query,
            "max_results": params.max_results,
            "order": params.order,
        });

        self.start_run(
            RunMode::Single,
            StrategySchedule::new(vec![strategy]),
            params,
            configuration,
        )
        .await
    }

    /// Start a comprehensive run over the configured strategy catalog.
    pub async fn start_comprehensive(&self) -> Result<SessionId> {
        let strategies = self.config.strategies.strategies.clone();
        let configuration = serde_json::json!({
            "type": "comprehensive",
            "strategies_count": strategies.len(),
        });

        self.start_run(
            RunMode::Comprehensive,
            StrategySchedule::new(strategies),
            RunParams::default(),
            configuration,
        )
        .await
    }

    /// Start a targeted run over an ad hoc query list.
    pub async fn start_targeted(
        &self,
        queries: Vec<String>,
        max_results: u32,
    ) -> Result<SessionId> {
        if queries.is_empty() {
            return Err(Error::Config {
                message: "targeted run requires at least one query".to_string(),
                key: None,
            });
        }

        let configuration = serde_json::json!({
            "type": "targeted",
            "targets": queries,
            "max_results_per_target": max_results,
        });

        let params = RunParams {
            max_results,
            ..RunParams::default()
        };

        self.start_run(
            RunMode::Targeted,
            StrategySchedule::from_queries(queries, max_results),
            params,
            configuration,
        )
        .await
    }

    /// Request a cooperative stop of the active session.
    ///
    /// The request takes effect at the next strategy boundary; in-flight
    /// calls are not forcibly cancelled. Fails with [`Error::NoActiveRun`]
    /// when nothing is running.
    pub async fn stop_run(&self) -> Result<SessionId> {
        let slot = self.run_slot.lock().await;
        let Some(run) = slot.active.as_ref() else {
            return Err(Error::NoActiveRun);
        };

        tracing::info!(session_id = %run.session_id, "Stop requested");
        run.cancel.cancel();
        Ok(run.session_id.clone())
    }

    /// Read-only status snapshot. Never fails: database-backed parts are
    /// best effort and zeroed when unavailable.
    pub async fn status(&self) -> HarvestStatus {
        let (state, session) = {
            let slot = self.run_slot.lock().await;
            match &slot.active {
                Some(run) => (RunnerState::Running, Some(run.snapshot())),
                None => (RunnerState::Idle, None),
            }
        };

        let last_session = match self.db.latest_session().await {
            Ok(Some(row)) if SessionStatus::from_i32(row.status).is_terminal() => {
                Some(SessionSnapshot::from(row))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read latest session for status");
                None
            }
        };

        let cache = self.db.cache_stats().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read cache stats for status");
            Default::default()
        });

        HarvestStatus {
            state,
            session,
            last_session,
            credentials: self.credentials.status(),
            cache,
            snapshot_at: Utc::now(),
        }
    }

    /// Wait for the active session, if any, to reach a terminal state.
    pub async fn wait_until_idle(&self) {
        let handle = {
            let mut slot = self.run_slot.lock().await;
            slot.active.as_mut().and_then(|run| run.handle.take())
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Session driver task panicked");
                // The driver could not clear the slot itself; do it here so
                // the orchestrator returns to Idle instead of wedging.
                self.run_slot.lock().await.active = None;
            }
        }
    }

    /// Claim the run slot, record the session and spawn the driver task.
    ///
    /// The check-then-set on the slot happens under one lock acquisition, so
    /// a concurrent `start_run` observes either Idle or the fully-formed
    /// active run - never an in-between state.
    async fn start_run(
        &self,
        mode: RunMode,
        schedule: StrategySchedule,
        params: RunParams,
        configuration: serde_json::Value,
    ) -> Result<SessionId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        if schedule.is_empty() {
            return Err(Error::Config {
                message: "no strategies to run".to_string(),
                key: Some("strategies.strategies".to_string()),
            });
        }

        let mut slot = self.run_slot.lock().await;
        if slot.active.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let session_id = SessionId::generate();
        let total_strategies = schedule.len() as u32;

        self.db
            .insert_session(&session_id, mode, total_strategies, Some(&configuration))
            .await?;

        let counters = Arc::new(RunCounters::default());
        let cancel = CancellationToken::new();
        let fail_fast = matches!(mode, RunMode::Single);

        let handle = {
            let harvester = self.clone();
            let session_id = session_id.clone();
            let cancel = cancel.clone();
            let counters = counters.clone();
            tokio::spawn(async move {
                harvester
                    .drive(session_id, schedule, params, cancel, counters, fail_fast)
                    .await;
            })
        };

        slot.active = Some(ActiveRun {
            session_id: session_id.clone(),
            mode,
            started_at: Utc::now(),
            total_strategies,
            counters,
            cancel,
            handle: Some(handle),
        });
        drop(slot);

        self.emit_event(Event::SessionStarted {
            session_id: session_id.clone(),
            mode,
            total_strategies,
        });
        tracing::info!(
            session_id = %session_id,
            mode = %mode,
            strategies = total_strategies,
            "Extraction session started"
        );

        Ok(session_id)
    }

    /// The driver loop: walk the schedule, pace between strategies, contain
    /// per-strategy failures, honor stop requests at boundaries, finalize
    /// the session, release the run slot.
    async fn drive(
        self,
        session_id: SessionId,
        mut schedule: StrategySchedule,
        params: RunParams,
        cancel: CancellationToken,
        counters: Arc<RunCounters>,
        fail_fast: bool,
    ) {
        let delay = self.config.strategies.delay_between;
        let mut stopped = false;
        let mut failed = false;
        let mut index: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                stopped = true;
                break;
            }

            let Some(strategy) = schedule.next().cloned() else {
                break;
            };

            if index > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        stopped = true;
                        break;
                    }
                }
            }

            self.emit_event(Event::StrategyStarted {
                session_id: session_id.clone(),
                query: strategy.query.clone(),
                index,
            });
            tracing::info!(
                session_id = %session_id,
                query = %strategy.query,
                index,
                total = schedule.len(),
                "Processing strategy"
            );

            match self.process_strategy(&session_id, &strategy, &params).await {
                Ok(outcome) => {
                    counters
                        .items_extracted
                        .fetch_add(outcome.items_extracted, Ordering::SeqCst);
                    counters
                        .relevant_items
                        .fetch_add(outcome.relevant_items, Ordering::SeqCst);
                    counters
                        .error_count
                        .fetch_add(outcome.sink_errors, Ordering::SeqCst);

                    self.emit_event(Event::StrategyCompleted {
                        session_id: session_id.clone(),
                        query: strategy.query.clone(),
                        items_extracted: outcome.items_extracted,
                        relevant_items: outcome.relevant_items,
                    });
                }
                Err(e) => {
                    counters.error_count.fetch_add(1, Ordering::SeqCst);
                    tracing::error!(
                        session_id = %session_id,
                        query = %strategy.query,
                        error = %e,
                        "Strategy failed"
                    );
                    self.emit_event(Event::StrategyFailed {
                        session_id: session_id.clone(),
                        query: strategy.query.clone(),
                        error: e.to_string(),
                    });

                    if fail_fast {
                        failed = true;
                        break;
                    }
                }
            }

            index += 1;
            counters.completed_strategies.store(index, Ordering::SeqCst);

            if let Err(e) = self
                .db
                .update_session_progress(&session_id, progress_of(&counters))
                .await
            {
                tracing::warn!(error = %e, "Failed to persist session progress");
            }
        }

        self.finalize(&session_id, &counters, stopped, failed).await;

        // Release the single-flight slot
        self.run_slot.lock().await.active = None;
    }

    async fn finalize(
        &self,
        session_id: &SessionId,
        counters: &RunCounters,
        stopped: bool,
        failed: bool,
    ) {
        let progress = progress_of(counters);

        if stopped {
            if let Err(e) = self.db.update_session_progress(session_id, progress).await {
                tracing::warn!(error = %e, "Failed to persist final session progress");
            }
            if let Err(e) = self.db.mark_session_stopped(session_id).await {
                tracing::warn!(error = %e, "Failed to mark session stopped");
            }
            self.emit_event(Event::SessionStopped {
                session_id: session_id.clone(),
            });
            tracing::info!(session_id = %session_id, "Extraction session stopped by request");
        } else if failed {
            if let Err(e) = self.db.update_session_progress(session_id, progress).await {
                tracing::warn!(error = %e, "Failed to persist final session progress");
            }
            if let Err(e) = self.db.mark_session_failed(session_id).await {
                tracing::warn!(error = %e, "Failed to mark session failed");
            }
            self.emit_event(Event::SessionFailed {
                session_id: session_id.clone(),
                error: "strategy failed in single-query mode".to_string(),
            });
        } else {
            if let Err(e) = self.db.mark_session_completed(session_id, progress).await {
                tracing::warn!(error = %e, "Failed to mark session completed");
            }
            self.emit_event(Event::SessionCompleted {
                session_id: session_id.clone(),
                items_extracted: progress.items_extracted,
                relevant_items: progress.relevant_items,
                error_count: progress.error_count,
            });
            tracing::info!(
                session_id = %session_id,
                items_extracted = progress.items_extracted,
                relevant_items = progress.relevant_items,
                error_count = progress.error_count,
                "Extraction session completed"
            );
        }
    }

    /// Process one strategy: search, batched detail fetch, dedup, score,
    /// persist accepted items, touch the seen-store for persisted ids.
    async fn process_strategy(
        &self,
        session_id: &SessionId,
        strategy: &SearchStrategy,
        params: &RunParams,
    ) -> Result<StrategyOutcome> {
        let options = SearchOptions {
            max_results: strategy.max_results,
            order: params.order.clone(),
            region_code: self.config.source.region_code.clone(),
            relevance_language: self.config.source.relevance_language.clone(),
            published_after: params.published_after,
            published_before: params.published_before,
        };

        let source = Arc::clone(&self.source);
        let query = strategy.query.clone();

        let refs = call_with_rotation(&self.credentials, &self.config.retry, |cred| {
            let source = Arc::clone(&source);
            let query = query.clone();
            let options = options.clone();
            async move { source.search(&cred.key, &query, &options).await }
        })
        .await;
        self.log_request_outcome("search", &refs).await;
        let refs = refs?;

        if refs.is_empty() {
            tracing::warn!(query = %strategy.query, "No items found for strategy");
            return Ok(StrategyOutcome {
                items_extracted: 0,
                relevant_items: 0,
                sink_errors: 0,
            });
        }

        let ids: Vec<String> = refs.into_iter().map(|r| r.video_id).collect();
        let mut details = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.config.source.detail_batch_size.max(1)) {
            let chunk: Vec<String> = chunk.to_vec();
            let result = call_with_rotation(&self.credentials, &self.config.retry, |cred| {
                let source = Arc::clone(&source);
                let chunk = chunk.clone();
                async move { source.fetch_details(&cred.key, &chunk).await }
            })
            .await;
            self.log_request_outcome("details", &result).await;
            details.extend(result?);
        }

        // Dedup before scoring to avoid wasted work, then score and split
        let window = self.config.dedup.freshness_window;
        let ctx = ScoreContext {
            search_query: strategy.query.clone(),
            watch_url_base: self.config.source.watch_url_base.clone(),
            now: Utc::now(),
        };

        let mut scored_all = Vec::new();
        let mut accepted = Vec::new();
        for detail in &details {
            if self.config.dedup.enabled
                && self.db.is_recently_seen(&detail.video_id, window).await?
            {
                continue;
            }

            let scored = self.scoring.score(detail, &ctx);
            if scored.is_relevant {
                accepted.push(scored.clone());
            }
            scored_all.push(scored);
        }

        // Every scored item lands in the local cache for the query surface;
        // the sink receives only accepted items.
        if !scored_all.is_empty() {
            if let Err(e) = self.db.save_videos_batch(&scored_all).await {
                tracing::warn!(error = %e, "Failed to cache scored items");
            }
        }

        let mut sink_errors = 0u64;
        if !accepted.is_empty() {
            let sink = Arc::clone(&self.sink);
            let batch = accepted.clone();
            let result = execute_with_retry(&self.config.retry, || {
                let sink = Arc::clone(&sink);
                let batch = batch.clone();
                async move { sink.persist(&batch).await }
            })
            .await;

            match result {
                Ok(report) => {
                    // Touch only items the sink durably accepted, one at a
                    // time: a sink failure must not poison the seen-store.
                    for id in &report.persisted {
                        if let Err(e) = self.db.mark_seen(id).await {
                            tracing::warn!(video_id = %id, error = %e, "Failed to touch seen-store");
                        }
                    }

                    if !report.errors.is_empty() {
                        sink_errors = 1;
                        tracing::warn!(
                            rejected = report.errors.len(),
                            sink = self.sink.name(),
                            "Sink rejected part of the batch"
                        );
                    }

                    self.emit_event(Event::BatchPersisted {
                        session_id: session_id.clone(),
                        persisted: report.persisted_count(),
                        errors: report.errors.len() as u64,
                    });
                }
                Err(e) => {
                    sink_errors = 1;
                    tracing::error!(
                        error = %e,
                        sink = self.sink.name(),
                        "Sink persist failed; items remain eligible for re-extraction"
                    );
                }
            }
        }

        Ok(StrategyOutcome {
            items_extracted: scored_all.len() as u64,
            relevant_items: accepted.len() as u64,
            sink_errors,
        })
    }

    /// Record one logical request outcome in the usage log.
    async fn log_request_outcome<T>(&self, kind: &str, result: &Result<T>) {
        let (success, quota) = match result {
            Ok(_) => (true, false),
            Err(e) => (false, e.is_quota()),
        };

        let hash = self.credentials.current_display_hash();
        if let Err(e) = self.db.log_usage(&hash, kind, success, quota).await {
            tracing::warn!(error = %e, "Failed to record usage log entry");
        }
    }
}

fn progress_of(counters: &RunCounters) -> SessionProgress {
    SessionProgress {
        completed_strategies: counters.completed_strategies.load(Ordering::SeqCst),
        items_extracted: counters.items_extracted.load(Ordering::SeqCst),
        relevant_items: counters.relevant_items.load(Ordering::SeqCst),
        error_count: counters.error_count.load(Ordering::SeqCst),
    }
}
