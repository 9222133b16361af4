use std::sync::Arc;

use tokio::sync::RwLock;

use crate::core::state::runtime::runtime_state_repository_trait::RuntimeStateRepositoryTrait;

/// In-memory, copy-on-write store for one piece of runtime state.
pub struct RuntimeStateRepository<S> {
    state: Arc<RwLock<Arc<S>>>,
}

impl<S: Default> RuntimeStateRepository<S> {
    pub fn new() -> Self {
        Self::with_state(S::default())
    }
}

impl<S: Default> Default for RuntimeStateRepository<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RuntimeStateRepository<S> {
    pub fn with_state(state: S) -> Self {
        Self {
            state: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl<S> RuntimeStateRepositoryTrait<S> for RuntimeStateRepository<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn get(&self) -> Arc<S> {
        self.state.read().await.clone()
    }

    async fn update<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut S) -> T + Send,
        T: Send,
    {
        let mut guard = self.state.write().await;

        let mut new_state = (**guard).clone();
        let out = f(&mut new_state);

        *guard = Arc::new(new_state);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_publishes_a_new_snapshot() {
        let repo = RuntimeStateRepository::<Vec<u32>>::new();
        let before = repo.get().await;

        let len = repo
            .update(|state| {
                state.push(1);
                state.len()
            })
            .await;

        assert_eq!(len, 1);
        assert!(before.is_empty());
        assert_eq!(*repo.get().await, vec![1]);

        repo.update(|state| *state = vec![4, 5]).await;
        assert_eq!(*repo.get().await, vec![4, 5]);
        assert_eq!(*before, Vec::<u32>::new());
    }
}
