use crate::supervisor::TaskSupervisor;
use crate::task::TaskId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory mapping from local task id to its supervisor.
///
/// Cloning is cheap and yields a handle to the same map. The registry only
/// touches the mapping; it never reaches into a supervisor.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<HashMap<TaskId, Arc<TaskSupervisor>>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the supervisor registered under `id`.
    pub fn set(&self, id: TaskId, supervisor: Arc<TaskSupervisor>) {
        self.inner.write().insert(id, supervisor);
    }

    /// Insert only if `id` is free. Returns false and leaves the existing
    /// entry untouched otherwise.
    pub fn insert_if_absent(&self, id: TaskId, supervisor: Arc<TaskSupervisor>) -> bool {
        let mut tasks = self.inner.write();
        if tasks.contains_key(&id) {
            return false;
        }
        tasks.insert(id, supervisor);
        true
    }

    pub fn get(&self, id: &TaskId) -> Option<Arc<TaskSupervisor>> {
        self.inner.read().get(id).cloned()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.inner.read().contains_key(id)
    }

    pub fn delete(&self, id: &TaskId) -> Option<Arc<TaskSupervisor>> {
        self.inner.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.inner.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::tests::idle_supervisor;

    #[test]
    fn test_set_get_delete() {
        let registry = TaskRegistry::new();
        assert!(registry.is_empty());

        let id = TaskId::from("test-set-1");
        registry.set(id.clone(), idle_supervisor("test-set-1"));
        assert!(registry.get(&id).is_some());
        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);

        assert!(registry.delete(&id).is_some());
        assert!(registry.get(&id).is_none());
        assert!(registry.delete(&id).is_none());
    }

    #[test]
    fn test_insert_if_absent_keeps_first_entry() {
        let registry = TaskRegistry::new();
        let id = TaskId::from("dup");
        let first = idle_supervisor("dup");

        assert!(registry.insert_if_absent(id.clone(), first.clone()));
        assert!(!registry.insert_if_absent(id.clone(), idle_supervisor("dup")));

        let stored = registry.get(&id).unwrap();
        assert!(Arc::ptr_eq(&stored, &first));
    }

    #[test]
    fn test_clones_share_the_map() {
        let registry = TaskRegistry::new();
        let other = registry.clone();
        other.set(TaskId::from("b"), idle_supervisor("b"));
        registry.set(TaskId::from("a"), idle_supervisor("a"));
        assert_eq!(other.ids(), vec![TaskId::from("a"), TaskId::from("b")]);
    }
}
