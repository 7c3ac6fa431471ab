//! Everything an index pass needs from its host, passed explicitly.

use std::sync::Arc;

use crate::config::IndexSettings;
use crate::store::{
    ClassMigrator, ComputedFields, DocumentStore, IndexObserver, LogObserver, NoComputedFields,
    NoMigration, QueryEngine,
};

/// Settings plus the host collaborators.
///
/// Cloning is cheap: every member is shared.
#[derive(Clone)]
pub struct IndexContext {
    pub settings: Arc<IndexSettings>,
    pub store: Arc<dyn DocumentStore>,
    pub engine: Arc<dyn QueryEngine>,
    pub computed: Arc<dyn ComputedFields>,
    pub migrator: Arc<dyn ClassMigrator>,
    pub observer: Arc<dyn IndexObserver>,
}

impl IndexContext {
    /// Context with no lookup/formula engine, no migration and a logging observer.
    pub fn new(
        settings: IndexSettings,
        store: Arc<dyn DocumentStore>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            engine,
            computed: Arc::new(NoComputedFields),
            migrator: Arc::new(NoMigration),
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_computed(mut self, computed: Arc<dyn ComputedFields>) -> Self {
        self.computed = computed;
        self
    }

    pub fn with_migrator(mut self, migrator: Arc<dyn ClassMigrator>) -> Self {
        self.migrator = migrator;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn IndexObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl std::fmt::Debug for IndexContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
