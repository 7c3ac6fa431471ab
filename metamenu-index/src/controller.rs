//! Reacting to change notifications.
//!
//! The host emits notifications at least once and without ordering
//! guarantees, and its query engine reports spurious per-document updates
//! right after startup. [`ChangeReactor`] filters those and decides between a
//! full pass and a narrow incremental update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::index::{FieldIndex, IndexOutcome};
use crate::store::ComputeScope;

/// Kind of a per-document metadata change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Update,
    Rename,
    Delete,
}

/// A notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    /// The query engine finished its initial scan
    EngineReady,
    /// The metadata cache finished a resolution batch
    CacheResolved { in_progress: usize },
    /// The query engine reindexed one document
    MetadataChange { kind: ChangeKind, path: String },
    /// A document's content was written
    Modified { path: String },
    /// Documents were created, renamed or deleted
    DocumentSetChanged,
}

/// Why a notification caused no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAnUpdate,
    BatchInProgress,
    UnknownDocument,
    ModifiedBeforeStartup,
    RevisionUnchanged,
    NoChangePending,
    EngineNotReady,
    NotACanvas,
    /// A full pass started while the reaction was running
    Superseded,
}

/// What a notification caused.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    FullIndex(IndexOutcome),
    /// A class definition changed: full pass, then its canvases
    ClassChanged {
        outcome: IndexOutcome,
        canvases: Vec<String>,
    },
    /// Formulas and lookups recomputed around one document
    Incremental { path: String, failed_steps: Vec<String> },
    CanvasUpdated { path: String },
    Ignored(IgnoreReason),
}

/// Turns notifications into index work, one at a time.
pub struct ChangeReactor {
    index: Arc<FieldIndex>,
    started_at: DateTime<Utc>,
    last_revision: u64,
    change_pending: bool,
}

impl ChangeReactor {
    pub fn new(index: Arc<FieldIndex>) -> Self {
        Self::with_start_time(index, Utc::now())
    }

    /// Reactor that considers documents modified before `started_at` unchanged.
    pub fn with_start_time(index: Arc<FieldIndex>, started_at: DateTime<Utc>) -> Self {
        let last_revision = index.context().engine.revision();
        Self {
            index,
            started_at,
            last_revision,
            change_pending: false,
        }
    }

    pub fn index(&self) -> &Arc<FieldIndex> {
        &self.index
    }

    /// Index once if the engine is already ready, then announce readiness.
    pub async fn start(&mut self) -> Option<IndexOutcome> {
        let engine = self.index.context().engine.clone();
        let outcome = if engine.is_ready() {
            self.last_revision = engine.revision();
            Some(self.index.full_index("engine running", false, false).await)
        } else {
            None
        };
        self.index.context().observer.indexed();
        outcome
    }

    /// Consume notifications until the channel closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<IndexEvent>) {
        while let Some(event) = events.recv().await {
            let reaction = self.handle(event).await;
            debug!(?reaction, "notification handled");
        }
        info!("change notifications closed");
    }

    /// React to one notification.
    pub async fn handle(&mut self, event: IndexEvent) -> Reaction {
        match event {
            IndexEvent::EngineReady => {
                let outcome = self.index.full_index("engine ready", false, false).await;
                self.last_revision = self.index.context().engine.revision();
                Reaction::FullIndex(outcome)
            }
            IndexEvent::CacheResolved { in_progress } => {
                if in_progress > 0 {
                    return Reaction::Ignored(IgnoreReason::BatchInProgress);
                }
                self.change_pending = true;
                let outcome = self.index.full_index("cache resolved", false, true).await;
                self.last_revision = self.index.context().engine.revision();
                Reaction::FullIndex(outcome)
            }
            IndexEvent::MetadataChange { kind, path } => self.on_metadata_change(kind, path).await,
            IndexEvent::Modified { path } => self.on_modified(path).await,
            IndexEvent::DocumentSetChanged => {
                Reaction::FullIndex(self.index.on_document_set_changed().await)
            }
        }
    }

    async fn on_metadata_change(&mut self, kind: ChangeKind, path: String) -> Reaction {
        if kind != ChangeKind::Update {
            return Reaction::Ignored(IgnoreReason::NotAnUpdate);
        }
        let ctx = self.index.context().clone();
        let Some(cache) = ctx.store.cache(&path).await else {
            return Reaction::Ignored(IgnoreReason::UnknownDocument);
        };
        if cache.mtime < self.started_at {
            debug!(%path, "ignoring update of a document unchanged since startup");
            return Reaction::Ignored(IgnoreReason::ModifiedBeforeStartup);
        }
        let revision = ctx.engine.revision();
        if revision == self.last_revision {
            return Reaction::Ignored(IgnoreReason::RevisionUnchanged);
        }
        if !self.change_pending {
            return Reaction::Ignored(IgnoreReason::NoChangePending);
        }
        if !ctx.engine.is_ready() {
            return Reaction::Ignored(IgnoreReason::EngineNotReady);
        }

        let generation = self.index.generation();
        let snapshot = self.index.snapshot().await;
        let mut failed_steps = Vec::new();

        if let Err(e) = ctx.computed.clean_removed_formulas(&snapshot).await {
            warn!(%path, %e, "removed formula cleanup failed");
            failed_steps.push("clean removed formulas".to_string());
        }
        if !self.index.refresh_existence(&path, generation).await {
            return Reaction::Ignored(IgnoreReason::Superseded);
        }

        let reaction = if ctx.settings.is_class_document(&path) {
            info!(%path, "class definition changed");
            let outcome = self.index.full_index("class changed", false, false).await;
            let snapshot = self.index.snapshot().await;
            let canvases = snapshot
                .class_by_path(&path)
                .map(|class| class.canvas_paths())
                .unwrap_or_default();
            let mut updated = Vec::new();
            for canvas in canvases {
                if !canvas.ends_with(".canvas") || !ctx.store.exists(&canvas).await {
                    debug!(%canvas, "canvas field target missing");
                    continue;
                }
                match ctx.computed.update_canvas(&snapshot, &canvas).await {
                    Ok(()) => updated.push(canvas),
                    Err(e) => warn!(%canvas, %e, "canvas update failed"),
                }
            }
            Reaction::ClassChanged {
                outcome,
                canvases: updated,
            }
        } else {
            let steps: [(&str, ComputeStep); 3] = [
                ("update formulas", ComputeStep::Formulas),
                ("resolve lookups", ComputeStep::ResolveLookups),
                ("update lookups", ComputeStep::UpdateLookups),
            ];
            for (name, step) in steps {
                if !self.index.is_current(generation) {
                    return Reaction::Ignored(IgnoreReason::Superseded);
                }
                let result = match step {
                    ComputeStep::Formulas => {
                        ctx.computed
                            .update_formulas(&snapshot, &ComputeScope::all("document changed"))
                            .await
                    }
                    ComputeStep::ResolveLookups => ctx.computed.resolve_lookups(&snapshot).await,
                    ComputeStep::UpdateLookups => {
                        ctx.computed
                            .update_lookups(
                                &snapshot,
                                &ComputeScope::document("document changed", path.clone()),
                            )
                            .await
                    }
                };
                if let Err(e) = result {
                    warn!(%path, step = name, %e, "incremental step failed");
                    failed_steps.push(name.to_string());
                }
            }
            Reaction::Incremental {
                path: path.clone(),
                failed_steps,
            }
        };

        self.last_revision = ctx.engine.revision();
        reaction
    }

    async fn on_modified(&mut self, path: String) -> Reaction {
        if !path.ends_with(".canvas") {
            return Reaction::Ignored(IgnoreReason::NotACanvas);
        }
        let ctx = self.index.context().clone();
        let snapshot = self.index.snapshot().await;
        if let Err(e) = ctx.computed.update_canvas(&snapshot, &path).await {
            warn!(%path, %e, "canvas update failed");
        }
        Reaction::CanvasUpdated { path }
    }
}

#[derive(Debug, Clone, Copy)]
enum ComputeStep {
    Formulas,
    ResolveLookups,
    UpdateLookups,
}
