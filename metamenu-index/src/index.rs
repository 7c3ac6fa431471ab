//! Full-index orchestration.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use metamenu_fields::Field;
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::canvas;
use crate::context::IndexContext;
use crate::error::{IndexError, Result};
use crate::existence::ExistenceTracker;
use crate::matchers::{self, Contributions};
use crate::registry::{self, Registry};
use crate::resolve::resolve_documents;
use crate::snapshot::IndexSnapshot;
use crate::store::ComputeScope;
use crate::values_list;

/// Major version legacy v1 classes are migrated to.
const MIGRATION_TARGET: u32 = 2;

/// Whether a full pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexStatus {
    Idle,
    Indexing,
}

/// Summary of one full pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub generation: u64,
    pub reason: String,
    pub classes: usize,
    pub documents: usize,
    /// Documents with an existing lookup or formula value
    pub documents_with_computed_values: usize,
    /// Everything that was skipped or degraded, as messages
    pub issues: Vec<String>,
    /// Class migrated to the next major version during this pass
    pub migrated: Option<String>,
    pub lookups_updated: bool,
    pub formulas_updated: bool,
}

/// Result of a full-index request.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    Completed(IndexReport),
    /// The query engine is not ready; the next ready signal re-runs the pass
    Deferred,
}

impl IndexOutcome {
    pub fn report(&self) -> Option<&IndexReport> {
        match self {
            IndexOutcome::Completed(report) => Some(report),
            IndexOutcome::Deferred => None,
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    snapshot: Arc<IndexSnapshot>,
    existence: ExistenceTracker,
}

/// Resets the status to idle when a pass ends, including on early return.
struct IndexingGuard<'a>(&'a watch::Sender<IndexStatus>);

impl<'a> IndexingGuard<'a> {
    fn enter(status: &'a watch::Sender<IndexStatus>) -> Self {
        status.send_replace(IndexStatus::Indexing);
        Self(status)
    }
}

impl Drop for IndexingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(IndexStatus::Idle);
    }
}

/// The metadata index.
///
/// Full passes are serialized by a single in-flight token. Each pass builds a
/// fresh [`IndexSnapshot`] and publishes it in one swap, so readers never see
/// a half-built index.
pub struct FieldIndex {
    ctx: IndexContext,
    state: RwLock<IndexState>,
    in_flight: Mutex<()>,
    generation: AtomicU64,
    first_index_done: AtomicBool,
    status: watch::Sender<IndexStatus>,
}

impl FieldIndex {
    pub fn new(ctx: IndexContext) -> Self {
        let (status, _) = watch::channel(IndexStatus::Idle);
        Self {
            ctx,
            state: RwLock::new(IndexState::default()),
            in_flight: Mutex::new(()),
            generation: AtomicU64::new(0),
            first_index_done: AtomicBool::new(false),
            status,
        }
    }

    pub fn context(&self) -> &IndexContext {
        &self.ctx
    }

    /// Generation of the latest pass, started or finished.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> IndexStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<IndexStatus> {
        self.status.subscribe()
    }

    /// The last published snapshot.
    pub async fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.state.read().await.snapshot.clone()
    }

    /// Existing lookup/formula fields of a document.
    pub async fn existence_for(&self, path: &str) -> Vec<Field> {
        self.state.read().await.existence.existing(path).to_vec()
    }

    /// Copy of the whole existence map.
    pub async fn existence(&self) -> ExistenceTracker {
        self.state.read().await.existence.clone()
    }

    /// A field id not used by any class or preset field.
    pub async fn new_field_id(&self) -> String {
        let snapshot = self.snapshot().await;
        metamenu_fields::new_field_id(snapshot.field_ids(&self.ctx.settings.preset_fields))
    }

    /// Documents were created, renamed or deleted.
    pub async fn on_document_set_changed(&self) -> IndexOutcome {
        self.full_index("document set changed", false, false).await
    }

    /// Rebuild the whole index and publish a new snapshot.
    ///
    /// `force_all` recomputes every formula; `without_lookups` skips the
    /// external lookup steps. No failure of a single class, document, query
    /// or external step aborts the pass.
    pub async fn full_index(&self, reason: &str, force_all: bool, without_lookups: bool) -> IndexOutcome {
        if !self.ctx.engine.is_ready() {
            info!(%reason, "query engine not ready, full index deferred");
            return IndexOutcome::Deferred;
        }

        let _token = self.in_flight.lock().await;
        let _indexing = IndexingGuard::enter(&self.status);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        info!(%reason, generation, force_all, without_lookups, "full index started");

        let mut issues: Vec<IndexError> = Vec::new();

        let documents = match self.ctx.store.markdown_documents().await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(%e, "document listing failed");
                issues.push(e);
                Vec::new()
            }
        };

        let (definitions, errors) = registry::load_definitions(&self.ctx, &documents).await;
        issues.extend(errors);
        let (registry, errors) = Registry::build(&definitions, &self.ctx.settings);
        issues.extend(errors);
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "registry ready");

        let mut contributions = Contributions::default();
        issues.extend(matchers::match_tags(&self.ctx, &registry, &mut contributions).await);
        issues.extend(matchers::match_queries(&self.ctx, &registry, &mut contributions).await);
        issues.extend(
            matchers::match_inner(&self.ctx, &registry, &documents, &mut contributions).await,
        );

        let resolved = resolve_documents(
            &self.ctx.settings,
            &registry.global_fields,
            &documents,
            contributions,
        );
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "fields resolved");

        let mut existence = ExistenceTracker::default();
        let tracked: Vec<(&String, &[Field])> = resolved
            .iter()
            .filter(|(_, d)| !d.lookup_and_formula.is_empty())
            .map(|(path, d)| (path, d.lookup_and_formula.as_slice()))
            .collect();
        existence
            .refresh_all(self.ctx.engine.as_ref(), tracked)
            .await;

        let (canvas_files, errors) = canvas::scan_canvases(&self.ctx).await;
        issues.extend(errors);

        let values_paths = values_list::values_list_paths(
            registry
                .classes
                .values()
                .flat_map(|c| c.fields.iter())
                .chain(self.ctx.settings.preset_fields.iter()),
        );
        let (values_lists, errors) = values_list::load_values_lists(&self.ctx, &values_paths).await;
        issues.extend(errors);

        let snapshot = Arc::new(IndexSnapshot::new(
            generation,
            registry,
            resolved,
            canvas_files,
            values_lists,
        ));
        let documents_with_computed_values = existence.len();
        {
            let mut state = self.state.write().await;
            state.snapshot = snapshot.clone();
            state.existence = existence;
        }
        debug!(generation, "snapshot published");

        let lookups_updated = !without_lookups;
        if lookups_updated {
            let scope = ComputeScope {
                source: reason.to_string(),
                document: None,
                force_all,
            };
            record(
                &mut issues,
                "resolve lookups",
                self.ctx.computed.resolve_lookups(&snapshot).await,
            );
            record(
                &mut issues,
                "update lookups",
                self.ctx.computed.update_lookups(&snapshot, &scope).await,
            );
        }

        // Formulas are recomputed in full on the first pass even when not forced.
        let first_pass = !self.first_index_done.swap(true, Ordering::SeqCst);
        let formulas_updated = force_all || first_pass;
        if formulas_updated {
            record(
                &mut issues,
                "update formulas",
                self.ctx
                    .computed
                    .update_formulas(
                        &snapshot,
                        &ComputeScope {
                            source: reason.to_string(),
                            document: None,
                            force_all,
                        },
                    )
                    .await,
            );
        }

        let migrated = self.migrate_one_legacy_class(&snapshot, &mut issues).await;

        self.ctx.observer.index_updated(generation);

        let report = IndexReport {
            generation,
            reason: reason.to_string(),
            classes: snapshot.classes.len(),
            documents: snapshot.documents.len(),
            documents_with_computed_values,
            issues: issues.iter().map(ToString::to_string).collect(),
            migrated,
            lookups_updated,
            formulas_updated,
        };
        info!(
            generation,
            classes = report.classes,
            documents = report.documents,
            issues = report.issues.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "full index complete"
        );
        IndexOutcome::Completed(report)
    }

    /// Migrate the first legacy v1 class, if any, and name it when the migrator
    /// actually rewrote it. v2 classes are left alone.
    async fn migrate_one_legacy_class(
        &self,
        snapshot: &IndexSnapshot,
        issues: &mut Vec<IndexError>,
    ) -> Option<String> {
        let class = snapshot
            .legacy_v1
            .first()
            .and_then(|path| snapshot.class_by_path(path))?;
        match self.ctx.migrator.migrate(class, MIGRATION_TARGET).await {
            Ok(true) => {
                info!(class = %class.name, target = MIGRATION_TARGET, "legacy class migrated");
                Some(class.name.clone())
            }
            Ok(false) => {
                debug!(class = %class.name, "legacy class left unmigrated");
                None
            }
            Err(e) => {
                warn!(class = %class.name, %e, "legacy class migration failed");
                issues.push(e);
                None
            }
        }
    }

    /// Refresh one document's lookup/formula existence, unless a full pass
    /// started since `expected_generation`. Returns whether it was applied.
    pub async fn refresh_existence(&self, path: &str, expected_generation: u64) -> bool {
        let snapshot = self.snapshot().await;
        let tracked = snapshot.lookup_and_formula_for(path).to_vec();
        let values = self.ctx.engine.page_values(path).await;

        let mut state = self.state.write().await;
        if self.generation() != expected_generation || state.snapshot.generation != expected_generation {
            debug!(%path, expected_generation, "existence refresh abandoned, index changed");
            return false;
        }
        state.existence.refresh(path, &tracked, values.as_ref());
        true
    }

    /// Whether no full pass started since `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }
}

fn record(issues: &mut Vec<IndexError>, step: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!(step, %e, "external step failed");
        issues.push(IndexError::external(step, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::store::MemoryVault;

    fn index_with(settings: IndexSettings, vault: Arc<MemoryVault>) -> FieldIndex {
        FieldIndex::new(IndexContext::new(settings, vault.clone(), vault))
    }

    fn settings() -> IndexSettings {
        IndexSettings {
            class_files_path: Some("Classes/".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn deferred_when_engine_not_ready() {
        let vault = Arc::new(MemoryVault::new());
        vault.set_ready(false);
        let index = index_with(settings(), vault);
        assert_eq!(index.full_index("test", false, false).await, IndexOutcome::Deferred);
        assert_eq!(index.generation(), 0);
        assert_eq!(index.snapshot().await.generation, 0);
    }

    #[tokio::test]
    async fn status_returns_to_idle() {
        let vault = Arc::new(MemoryVault::new());
        let index = index_with(settings(), vault);
        let status = index.subscribe_status();
        assert_eq!(index.status(), IndexStatus::Idle);
        index.full_index("test", false, false).await;
        assert_eq!(*status.borrow(), IndexStatus::Idle);
        assert_eq!(index.generation(), 1);
    }

    #[tokio::test]
    async fn first_pass_updates_formulas() {
        let vault = Arc::new(MemoryVault::new());
        let index = index_with(settings(), vault);
        let first = index.full_index("a", false, true).await;
        let second = index.full_index("b", false, true).await;
        let forced = index.full_index("c", true, false).await;
        assert!(first.report().unwrap().formulas_updated);
        assert!(!first.report().unwrap().lookups_updated);
        assert!(!second.report().unwrap().formulas_updated);
        assert!(forced.report().unwrap().formulas_updated);
        assert!(forced.report().unwrap().lookups_updated);
    }

    #[tokio::test]
    async fn default_migrator_reports_nothing_migrated() {
        let vault = Arc::new(MemoryVault::new());
        vault.insert("Classes/Old.md", "---\nversion: 1\n---\n").await;
        let index = index_with(settings(), vault);
        let outcome = index.full_index("test", false, false).await;
        let report = outcome.report().unwrap();
        assert_eq!(index.snapshot().await.legacy_v1, vec!["Classes/Old.md"]);
        assert_eq!(report.migrated, None);
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn new_field_id_avoids_class_ids() {
        let vault = Arc::new(MemoryVault::new());
        vault
            .insert(
                "Classes/Book.md",
                "---\nfields:\n  - name: Title\n    id: title0\n---\n",
            )
            .await;
        let index = index_with(settings(), vault);
        index.full_index("test", false, false).await;
        let id = index.new_field_id().await;
        assert_eq!(id.len(), metamenu_fields::FIELD_ID_LENGTH);
        assert_ne!(id, "title0");
    }

    #[tokio::test]
    async fn stale_existence_refresh_is_abandoned() {
        let vault = Arc::new(MemoryVault::new());
        let index = index_with(settings(), vault);
        index.full_index("one", false, false).await;
        assert!(index.refresh_existence("a.md", 1).await);
        index.full_index("two", false, false).await;
        assert!(!index.refresh_existence("a.md", 1).await);
    }
}
