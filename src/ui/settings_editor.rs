use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    error::SettingsError,
    storage::{entities::Settings, kv::KeyValueStore, settings_store::SettingsStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    Proceed,
    Cancel,
    SaveThenProceed,
}

/// Asks the user what to do with unsaved changes.
#[cfg_attr(test, mockall::automock)]
pub trait ConfirmPrompt: Send {
    fn unsaved_changes(&mut self) -> LeaveDecision;
}

/// Implemented by screens that may hold unsaved state. The navigation controller consults it
/// before switching away.
#[async_trait]
pub trait LeaveGuard: Send {
    fn confirm_leave(&mut self) -> LeaveDecision;

    async fn save_before_leave(&mut self) -> Result<(), SettingsError>;

    /// Throws away pending edits after the user chose to leave without saving.
    fn discard(&mut self);
}

/// Editable copy of the settings next to the last saved version.
pub struct SettingsEditor<S> {
    store: Arc<SettingsStore<S>>,
    prompt: Box<dyn ConfirmPrompt>,
    saved: Settings,
    draft: Settings,
}

impl<S: KeyValueStore> SettingsEditor<S> {
    pub async fn open(store: Arc<SettingsStore<S>>, prompt: Box<dyn ConfirmPrompt>) -> Self {
        let saved = store.load().await;
        Self {
            store,
            prompt,
            saved,
            draft: saved,
        }
    }

    pub fn draft(&self) -> &Settings {
        &self.draft
    }

    pub fn saved(&self) -> &Settings {
        &self.saved
    }

    pub fn update(&mut self, edit: impl FnOnce(&mut Settings)) {
        edit(&mut self.draft);
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.saved
    }

    /// Validates and stores the draft. On failure the draft stays as it was so the user can fix
    /// the offending field.
    pub async fn save(&mut self) -> Result<(), SettingsError> {
        self.store.save(&self.draft).await?;
        self.saved = self.draft;
        Ok(())
    }

    pub fn revert(&mut self) {
        self.draft = self.saved;
    }
}

#[async_trait]
impl<S: KeyValueStore> LeaveGuard for SettingsEditor<S> {
    fn confirm_leave(&mut self) -> LeaveDecision {
        if !self.is_dirty() {
            return LeaveDecision::Proceed;
        }
        let decision = self.prompt.unsaved_changes();
        debug!("Unsaved settings, user chose {decision:?}");
        decision
    }

    async fn save_before_leave(&mut self) -> Result<(), SettingsError> {
        self.save().await
    }

    fn discard(&mut self) {
        info!("Discarding unsaved settings");
        self.revert();
    }
}
