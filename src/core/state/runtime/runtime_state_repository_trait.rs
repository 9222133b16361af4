use std::sync::Arc;

use async_trait::async_trait;

#[async_trait]
pub trait RuntimeStateRepositoryTrait<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Current snapshot. Readers never block writers for longer than a pointer swap.
    async fn get(&self) -> Arc<S>;

    /// Mutate a copy of the state and publish it; returns whatever `f` returns.
    async fn update<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut S) -> T + Send,
        T: Send;
}
