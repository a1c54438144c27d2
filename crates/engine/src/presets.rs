//! User preset storage: an ordered list of named instructions persisted as
//! one JSON array in the preference store.

use shared::preset::Preset;
use shared::settings::CUSTOM_MODES_KEY;
use thiserror::Error;

use crate::store::KvStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("mode name cannot be empty")]
    EmptyName,
    #[error("mode instruction cannot be empty")]
    EmptyInstruction,
    #[error("a mode named \"{0}\" already exists")]
    DuplicateName(String),
    #[error("no custom mode at position {0}")]
    BadIndex(usize),
}

#[derive(Default)]
pub struct PresetStore {
    entries: Vec<Preset>,
}

impl PresetStore {
    /// Load the last-saved list. A missing or unreadable value yields an
    /// empty store.
    pub fn load(kv: &dyn KvStore) -> Self {
        let entries = kv
            .get(CUSTOM_MODES_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(entries) => Some(entries),
                Err(err) => {
                    tracing::warn!(%err, "stored custom modes unreadable, ignoring");
                    None
                }
            })
            .unwrap_or_default();
        Self { entries }
    }

    /// Persist the full list in one write.
    pub fn save(&self, kv: &mut dyn KvStore) -> anyhow::Result<()> {
        let json = serde_json::to_string(&self.entries)?;
        kv.set(CUSTOM_MODES_KEY, &json)
    }

    pub fn list(&self) -> &[Preset] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.entries.get(index)
    }

    /// Create (`index: None`) or edit (`index: Some`) an entry. A rejected
    /// mutation leaves the list untouched.
    pub fn upsert(
        &mut self,
        index: Option<usize>,
        name: &str,
        instruction: &str,
    ) -> Result<Preset, PresetError> {
        let name = name.trim();
        let instruction = instruction.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName);
        }
        if instruction.is_empty() {
            return Err(PresetError::EmptyInstruction);
        }
        let lowered = name.to_lowercase();
        let collision = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, preset)| Some(i) != index && preset.name.to_lowercase() == lowered);
        if collision {
            return Err(PresetError::DuplicateName(name.to_string()));
        }

        let preset = Preset::new(name, instruction);
        match index {
            Some(i) => {
                let slot = self.entries.get_mut(i).ok_or(PresetError::BadIndex(i))?;
                *slot = preset.clone();
            }
            None => self.entries.push(preset.clone()),
        }
        Ok(preset)
    }

    pub fn remove(&mut self, index: usize) -> Result<Preset, PresetError> {
        if index >= self.entries.len() {
            return Err(PresetError::BadIndex(index));
        }
        Ok(self.entries.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_upsert_appends_in_order() {
        let mut store = PresetStore::default();
        store.upsert(None, "One", "first").unwrap();
        store.upsert(None, "Two", "second").unwrap();
        let names: Vec<_> = store.list().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["One", "Two"]);
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut store = PresetStore::default();
        assert_eq!(store.upsert(None, "  ", "x"), Err(PresetError::EmptyName));
        assert_eq!(
            store.upsert(None, "Name", "   "),
            Err(PresetError::EmptyInstruction)
        );
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_duplicate_name_case_insensitive_leaves_list_unchanged() {
        let mut store = PresetStore::default();
        store.upsert(None, "Reviewer", "a").unwrap();
        let before = store.list().to_vec();
        assert_eq!(
            store.upsert(None, "REVIEWER", "b"),
            Err(PresetError::DuplicateName("REVIEWER".into()))
        );
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_edit_keeps_own_name() {
        let mut store = PresetStore::default();
        store.upsert(None, "Reviewer", "a").unwrap();
        // Renaming in place to a different casing of itself is allowed.
        let updated = store.upsert(Some(0), "reviewer", "b").unwrap();
        assert_eq!(updated.name, "reviewer");
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].instruction, "b");
    }

    #[test]
    fn test_edit_colliding_with_other_entry_rejected() {
        let mut store = PresetStore::default();
        store.upsert(None, "One", "a").unwrap();
        store.upsert(None, "Two", "b").unwrap();
        assert_eq!(
            store.upsert(Some(1), "one", "c"),
            Err(PresetError::DuplicateName("one".into()))
        );
        assert_eq!(store.list()[1].name, "Two");
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut store = PresetStore::default();
        assert_eq!(store.remove(0), Err(PresetError::BadIndex(0)));
    }

    #[test]
    fn test_persistence_round_trip() {
        let mut kv = MemoryStore::default();
        let mut store = PresetStore::default();
        store.upsert(None, "Reviewer", "Review code critically").unwrap();
        store.upsert(None, "Pirate", "Answer like a pirate").unwrap();
        store.save(&mut kv).unwrap();

        let reloaded = PresetStore::load(&kv);
        assert_eq!(reloaded.list(), store.list());
    }

    #[test]
    fn test_corrupt_stored_value_ignored() {
        let mut kv = MemoryStore::default();
        kv.set(CUSTOM_MODES_KEY, "{broken").unwrap();
        let store = PresetStore::load(&kv);
        assert!(store.list().is_empty());
    }
}
