//! Fixed-capacity pool of HTTP client handles.
//!
//! Handles are created up front and lent out one at a time. A
//! [`PooledHandle`] puts its client back when dropped, on every exit path.
//! Acquisition waits while the pool is empty.

use std::sync::{Mutex, PoisonError};

use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

use super::HttpClient;

pub struct HandlePool {
    available: Semaphore,
    handles: Mutex<Vec<HttpClient>>,
    capacity: usize,
}

impl HandlePool {
    #[must_use]
    pub fn new(capacity: usize, make: impl Fn() -> HttpClient) -> Self {
        let capacity = capacity.max(1);
        Self {
            available: Semaphore::new(capacity),
            handles: Mutex::new((0..capacity).map(|_| make()).collect()),
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handles currently sitting in the pool.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.available.available_permits()
    }

    pub async fn acquire(&self) -> Result<PooledHandle<'_>, AcquireError> {
        let permit = self.available.acquire().await?;
        // One permit per stored handle, so the vector cannot be empty here.
        let client = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        Ok(PooledHandle {
            pool: self,
            client,
            _permit: permit,
        })
    }
}

pub struct PooledHandle<'a> {
    pool: &'a HandlePool,
    client: Option<HttpClient>,
    // Dropped after `drop` below returns the client.
    _permit: SemaphorePermit<'a>,
}

impl PooledHandle<'_> {
    #[must_use]
    pub fn client(&self) -> Option<&HttpClient> {
        self.client.as_ref()
    }
}

impl Drop for PooledHandle<'_> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(client);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sync::build_http_client;

    #[tokio::test]
    async fn handles_return_on_drop() {
        let pool = HandlePool::new(2, || build_http_client(Duration::from_secs(30)));
        assert_eq!(pool.idle(), 2);

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert!(first.client().is_some());
        assert!(second.client().is_some());
        assert_eq!(pool.idle(), 0);

        drop(first);
        assert_eq!(pool.idle(), 1);
        drop(second);
        assert_eq!(pool.idle(), 2);
    }

    #[tokio::test]
    async fn acquire_waits_while_empty() {
        let pool = HandlePool::new(1, || build_http_client(Duration::from_secs(30)));
        let held = pool.acquire().await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await;
        assert!(blocked.is_err());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(200), pool.acquire()).await;
        assert!(again.is_ok());
    }
}
