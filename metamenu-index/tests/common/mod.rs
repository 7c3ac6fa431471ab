//! Shared fixtures for metamenu-index integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metamenu_index::store::{
    ClassMigrator, ComputeScope, ComputedFields, IndexObserver, MemoryVault,
};
use metamenu_index::{FieldIndex, FileClass, IndexContext, IndexSettings, IndexSnapshot, Result};

/// Records every external recomputation request.
#[derive(Debug, Default)]
pub struct RecordingComputed {
    calls: Mutex<Vec<String>>,
}

impl RecordingComputed {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn scope_label(scope: &ComputeScope) -> String {
    format!(
        "{}{}",
        scope.document.as_deref().unwrap_or("all"),
        if scope.force_all { ":forced" } else { "" }
    )
}

#[async_trait]
impl ComputedFields for RecordingComputed {
    async fn resolve_lookups(&self, _snapshot: &IndexSnapshot) -> Result<()> {
        self.push("resolve_lookups".into());
        Ok(())
    }

    async fn update_lookups(&self, _snapshot: &IndexSnapshot, scope: &ComputeScope) -> Result<()> {
        self.push(format!("update_lookups:{}", scope_label(scope)));
        Ok(())
    }

    async fn update_formulas(&self, _snapshot: &IndexSnapshot, scope: &ComputeScope) -> Result<()> {
        self.push(format!("update_formulas:{}", scope_label(scope)));
        Ok(())
    }

    async fn clean_removed_formulas(&self, _snapshot: &IndexSnapshot) -> Result<()> {
        self.push("clean_removed_formulas".into());
        Ok(())
    }

    async fn update_canvas(&self, _snapshot: &IndexSnapshot, canvas_path: &str) -> Result<()> {
        self.push(format!("update_canvas:{canvas_path}"));
        Ok(())
    }
}

/// Records migrated class names.
#[derive(Debug, Default)]
pub struct RecordingMigrator {
    pub migrated: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl ClassMigrator for RecordingMigrator {
    async fn migrate(&self, class: &FileClass, target_major: u32) -> Result<bool> {
        self.migrated
            .lock()
            .unwrap()
            .push((class.name.clone(), target_major));
        Ok(true)
    }
}

/// Records observer events.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub indexed: Mutex<usize>,
    pub updates: Mutex<Vec<u64>>,
    pub notices: Mutex<Vec<String>>,
}

impl IndexObserver for RecordingObserver {
    fn indexed(&self) {
        *self.indexed.lock().unwrap() += 1;
    }

    fn index_updated(&self, generation: u64) {
        self.updates.lock().unwrap().push(generation);
    }

    fn notice(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

/// Index over an in-memory vault with every collaborator recorded.
pub struct Harness {
    pub vault: Arc<MemoryVault>,
    pub computed: Arc<RecordingComputed>,
    pub migrator: Arc<RecordingMigrator>,
    pub observer: Arc<RecordingObserver>,
    pub index: Arc<FieldIndex>,
}

impl Harness {
    pub fn new(settings: IndexSettings) -> Self {
        Self::with_vault(settings, Arc::new(MemoryVault::new()))
    }

    pub fn with_vault(settings: IndexSettings, vault: Arc<MemoryVault>) -> Self {
        let computed = Arc::new(RecordingComputed::default());
        let migrator = Arc::new(RecordingMigrator::default());
        let observer = Arc::new(RecordingObserver::default());
        let ctx = IndexContext::new(settings, vault.clone(), vault.clone())
            .with_computed(computed.clone())
            .with_migrator(migrator.clone())
            .with_observer(observer.clone());
        Self {
            vault,
            computed,
            migrator,
            observer,
            index: Arc::new(FieldIndex::new(ctx)),
        }
    }
}

/// Settings with `Classes/` as the class folder.
pub fn settings() -> IndexSettings {
    IndexSettings {
        class_files_path: Some("Classes/".into()),
        ..Default::default()
    }
}

/// Ids of a field list, for compact assertions.
pub fn ids(fields: &[metamenu_index::Field]) -> Vec<String> {
    fields.iter().map(|f| f.id.clone()).collect()
}
