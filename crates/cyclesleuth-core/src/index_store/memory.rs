//! In-memory index store for single-process runs and tests.
use super::{format_line, IndexStore};
use crate::error::Result;
use crate::model::IndexTag;
use parking_lot::Mutex;

#[derive(Default)]
pub struct InMemoryIndexStore {
    tags: Mutex<Vec<IndexTag>>,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents in the file store's line format.
    pub fn lines(&self) -> Vec<String> {
        self.tags.lock().iter().map(format_line).collect()
    }
}

impl IndexStore for InMemoryIndexStore {
    fn append(&self, tag: &IndexTag) -> Result<bool> {
        let mut tags = self.tags.lock();
        if tags.contains(tag) {
            return Ok(false);
        }
        tags.push(tag.clone());
        Ok(true)
    }

    fn truncate(&self) -> Result<()> {
        self.tags.lock().clear();
        Ok(())
    }

    fn read_tags(&self) -> Result<Vec<IndexTag>> {
        Ok(self.tags.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IterationIndex, Role, WorkstationId};

    #[test]
    fn append_dedups_and_truncate_clears() {
        let store = InMemoryIndexStore::new();
        let t = IndexTag::new(WorkstationId::new("WS-1"), Role::Abnormal, IterationIndex(2));
        assert!(store.append(&t).unwrap());
        assert!(!store.append(&t).unwrap());
        assert_eq!(store.lines(), vec!["WS-1:abnormal:2"]);
        store.truncate().unwrap();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn append_all_counts_new_tags() {
        let store = InMemoryIndexStore::new();
        let ws = WorkstationId::new("WS-1");
        let tags = vec![
            IndexTag::new(ws.clone(), Role::Min, IterationIndex(1)),
            IndexTag::new(ws.clone(), Role::Min, IterationIndex(1)),
            IndexTag::new(ws, Role::Max, IterationIndex(4)),
        ];
        assert_eq!(store.append_all(&tags).unwrap(), 2);
    }
}
