use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::error::ApiError;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;
const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Login emails in use across all tenants.
///
/// Lookups go filter, then cache, then `users`. The cuckoo filter answers
/// "free" without a query; the moka cache answers "taken" for emails seen
/// recently. Only filter hits that miss the cache reach the database.
pub struct EmailRegistry {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, ()>,
}

impl Default for EmailRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub static EMAILS: Lazy<EmailRegistry> = Lazy::new(EmailRegistry::new);

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl EmailRegistry {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    fn might_exist(&self, email: &str) -> bool {
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(email)
    }

    /// `Ok(true)` when no login uses `email` yet.
    pub async fn is_available(&self, email: &str, pool: &MySqlPool) -> Result<bool, ApiError> {
        let email = normalize(email);

        if !self.might_exist(&email) {
            return Ok(true);
        }
        if self.taken.contains_key(&email) {
            return Ok(false);
        }

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(&email)
            .fetch_one(pool)
            .await?;

        if count > 0 {
            self.taken.insert(email, ()).await;
            return Ok(false);
        }
        Ok(true)
    }

    /// A login was created with this email.
    pub async fn remember(&self, email: &str) {
        let email = normalize(email);
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&email);
        self.taken.insert(email, ()).await;
    }

    /// An existing login was used; keeps it warm in the cache only.
    pub async fn touch(&self, email: &str) {
        self.taken.insert(normalize(email), ()).await;
    }

    /// The login was deleted, so the email is free again.
    pub async fn forget(&self, email: &str) {
        let email = normalize(email);
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&email);
        self.taken.invalidate(&email).await;
    }

    /// Streams every login email into the filter in batches. Logins active in
    /// the last `recent_days` days also go into the cache.
    pub async fn warmup(&self, pool: &MySqlPool, recent_days: u32, batch_size: usize) -> Result<usize> {
        let mut rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT email, COALESCE(last_login_at >= NOW() - INTERVAL ? DAY, 0) AS recent
            FROM users
            "#,
        )
        .bind(recent_days)
        .fetch(pool);

        let batch_size = batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = rows.next().await {
            let (email, recent) = row.context("reading users for email warmup")?;
            batch.push((normalize(&email), recent != 0));
            total += 1;

            if batch.len() == batch_size {
                self.load_batch(&batch).await;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.load_batch(&batch).await;
        }

        tracing::info!(total, recent_days, "Email registry warmup complete");
        Ok(total)
    }

    async fn load_batch(&self, batch: &[(String, bool)]) {
        {
            let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
            for (email, _) in batch {
                filter.add(email);
            }
        }

        let inserts: Vec<_> = batch
            .iter()
            .filter(|(_, recent)| *recent)
            .map(|(email, _)| self.taken.insert(email.clone(), ()))
            .collect();
        futures::future::join_all(inserts).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lazy_pool;

    #[actix_web::test]
    async fn unknown_emails_are_free_without_a_query() {
        let registry = EmailRegistry::new();
        // The pool never connects, so a database lookup would fail.
        assert!(registry.is_available("new@acme.com", &lazy_pool()).await.unwrap());
    }

    #[actix_web::test]
    async fn remembered_emails_are_taken_in_any_case() {
        let registry = EmailRegistry::new();
        registry.remember("Lina@Acme.com").await;

        let pool = lazy_pool();
        assert!(!registry.is_available("lina@acme.com", &pool).await.unwrap());
        assert!(!registry.is_available("  LINA@ACME.COM ", &pool).await.unwrap());
    }

    #[actix_web::test]
    async fn forgotten_emails_are_free_again() {
        let registry = EmailRegistry::new();
        registry.remember("gone@acme.com").await;
        registry.forget("GONE@acme.com").await;

        assert!(!registry.might_exist("gone@acme.com"));
        assert!(registry.is_available("gone@acme.com", &lazy_pool()).await.unwrap());
    }

    #[actix_web::test]
    async fn touch_only_warms_the_cache() {
        let registry = EmailRegistry::new();
        registry.touch("seen@acme.com").await;

        assert!(!registry.might_exist("seen@acme.com"));
        assert!(registry.taken.contains_key("seen@acme.com"));
    }
}
