use crate::domain::manual_order::{decode_order, encode_order};
use crate::domain::models::SourceKind;
use crate::domain::visibility::HiddenSet;
use crate::infrastructure::error::AgendaError;
use crate::infrastructure::settings_store::{
    SettingsStore, ACCENT_SELECTION_KEY, BADGE_ENABLED_KEY, HIDDEN_EVENT_SOURCES_KEY,
    HIDDEN_TASK_SOURCES_KEY, MANUAL_ORDER_KEY_PREFIX,
};
use std::sync::Arc;

pub struct Preferences<S>
where
    S: SettingsStore,
{
    store: Arc<S>,
}

impl<S> Clone for Preferences<S>
where
    S: SettingsStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> Preferences<S>
where
    S: SettingsStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn hidden_sources(&self, kind: SourceKind) -> HiddenSet {
        HiddenSet::decode(self.load_or_absent(hidden_key(kind)).as_deref())
    }

    pub fn set_source_hidden(
        &self,
        kind: SourceKind,
        source_id: &str,
        hidden: bool,
    ) -> Result<bool, AgendaError> {
        let source_id = source_id.trim();
        if source_id.is_empty() {
            return Err(AgendaError::InvalidInput("source id must not be empty".to_string()));
        }

        let mut changed = false;
        self.store.update(hidden_key(kind), &mut |current| {
            let mut set = HiddenSet::decode(current);
            changed = set.set_hidden(source_id, hidden);
            changed.then(|| set.encode())
        })?;
        Ok(changed)
    }

    pub fn manual_order(&self, scope: &str) -> Vec<String> {
        decode_order(self.load_or_absent(&manual_order_key(scope)).as_deref())
    }

    pub fn replace_manual_order(&self, scope: &str, ids: &[String]) -> Result<(), AgendaError> {
        let encoded = encode_order(ids);
        self.store
            .update(&manual_order_key(scope), &mut |_| Some(encoded.clone()))
    }

    pub fn badge_enabled(&self) -> bool {
        let Some(raw) = self.load_or_absent(BADGE_ENABLED_KEY) else {
            return true;
        };
        serde_json::from_slice::<bool>(&raw)
            .map_err(|error| AgendaError::Decode(format!("{BADGE_ENABLED_KEY}: {error}")))
            .unwrap_or_else(|error| {
                log::warn!("defaulting badge to enabled: {error}");
                true
            })
    }

    pub fn set_badge_enabled(&self, enabled: bool) -> Result<(), AgendaError> {
        let encoded = serde_json::to_vec(&enabled)?;
        self.store.store(BADGE_ENABLED_KEY, &encoded)
    }

    pub fn accent_selection(&self) -> Option<Vec<u8>> {
        self.load_or_absent(ACCENT_SELECTION_KEY)
    }

    pub fn set_accent_selection(&self, value: &[u8]) -> Result<(), AgendaError> {
        self.store.store(ACCENT_SELECTION_KEY, value)
    }

    fn load_or_absent(&self, key: &str) -> Option<Vec<u8>> {
        match self.store.load(key) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("failed to read setting {key}, using default: {error}");
                None
            }
        }
    }
}

fn hidden_key(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Task => HIDDEN_TASK_SOURCES_KEY,
        SourceKind::Event => HIDDEN_EVENT_SOURCES_KEY,
    }
}

fn manual_order_key(scope: &str) -> String {
    format!("{MANUAL_ORDER_KEY_PREFIX}.{}", scope.trim())
}
