use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Caps concurrent requests per upstream host.
pub struct HostLimiter {
    per_host: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host: per_host.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.lock().unwrap_or_else(|e| e.into_inner());
        hosts
            .entry(host.to_ascii_lowercase())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
            .clone()
    }

    /// Wait for a slot on `url`'s host. The slot is released when the permit drops.
    pub async fn acquire(&self, url: &Url) -> OwnedSemaphorePermit {
        let host = url.host_str().unwrap_or_default();
        self.semaphore(host)
            .acquire_owned()
            .await
            .expect("Semaphore closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_per_host() {
        let limiter = HostLimiter::new(1);
        let a = Url::parse("https://a.example/1").unwrap();
        let b = Url::parse("https://b.example/1").unwrap();

        let _held = limiter.acquire(&a).await;
        // A different host is not blocked by the held permit.
        let _other = limiter.acquire(&b).await;

        let same_host = limiter.semaphore("A.EXAMPLE");
        assert_eq!(same_host.available_permits(), 0);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = HostLimiter::new(2);
        let url = Url::parse("https://a.example/1").unwrap();
        {
            let _p1 = limiter.acquire(&url).await;
            let _p2 = limiter.acquire(&url).await;
            assert_eq!(limiter.semaphore("a.example").available_permits(), 0);
        }
        assert_eq!(limiter.semaphore("a.example").available_permits(), 2);
    }
}
