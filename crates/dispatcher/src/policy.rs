//! Distribution policies - resolve a batch to its target destinations

use contracts::{Distribution, MetricBatch};

use crate::destination::Destination;
use crate::error::DispatcherError;
use crate::pool::Pool;

/// Extracts the routing key hashed by [`DistributionPolicy::HashRoute`]
pub type KeyFn = fn(&MetricBatch) -> &str;

/// Default routing key: the submitting tenant
pub fn tenant_key(batch: &MetricBatch) -> &str {
    batch.routing_key()
}

/// Routing policy, fixed at construction
#[derive(Debug, Clone)]
pub enum DistributionPolicy {
    /// Every destination gets every batch
    Broadcast,
    /// One destination per batch, chosen by `crc32(key) % table.len()`
    HashRoute {
        key_fn: KeyFn,
        /// Destination addresses, sorted so the mapping depends only on membership
        table: Vec<String>,
    },
}

impl DistributionPolicy {
    /// Build the policy selected by configuration for `pool`
    ///
    /// # Errors
    /// Empty pool
    pub fn for_pool(distribution: Distribution, pool: &Pool) -> Result<Self, DispatcherError> {
        if pool.is_empty() {
            return Err(DispatcherError::EmptyPool);
        }
        Ok(match distribution {
            Distribution::Broadcast => Self::Broadcast,
            Distribution::HashRoute => Self::hash_route(pool, tenant_key),
        })
    }

    /// Hash routing over the current pool membership with a custom key
    pub fn hash_route(pool: &Pool, key_fn: KeyFn) -> Self {
        Self::hash_route_over(pool.addresses(), key_fn)
    }

    /// Hash routing over a bare address list (no running destinations needed)
    pub fn hash_route_over<I, S>(addresses: I, key_fn: KeyFn) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table: Vec<String> = addresses.into_iter().map(Into::into).collect();
        table.sort();
        table.dedup();
        Self::HashRoute { key_fn, table }
    }

    pub fn distribution(&self) -> Distribution {
        match self {
            Self::Broadcast => Distribution::Broadcast,
            Self::HashRoute { .. } => Distribution::HashRoute,
        }
    }

    /// Address a routing key maps to (hash-route only)
    pub fn route_key(&self, key: &str) -> Option<&str> {
        match self {
            Self::Broadcast => None,
            Self::HashRoute { table, .. } if table.is_empty() => None,
            Self::HashRoute { table, .. } => {
                let slot = crc32fast::hash(key.as_bytes()) as usize % table.len();
                Some(table[slot].as_str())
            }
        }
    }

    /// Target destinations for `batch`
    pub fn resolve<'p>(&self, batch: &MetricBatch, pool: &'p Pool) -> Vec<&'p Destination> {
        match self {
            Self::Broadcast => pool.all().iter().collect(),
            Self::HashRoute { key_fn, .. } => self
                .route_key(key_fn(batch))
                .and_then(|address| pool.lookup(address))
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConsoleTransport;
    use contracts::BackoffConfig;

    fn pool_of(addresses: &[&str]) -> Pool {
        let mut pool = Pool::new();
        for address in addresses {
            pool.register(Destination::spawn(
                ConsoleTransport::new(*address),
                4,
                BackoffConfig::default(),
            ))
            .unwrap();
        }
        pool
    }

    fn first_line(batch: &MetricBatch) -> &str {
        batch.lines().first().map(String::as_str).unwrap_or("")
    }

    #[tokio::test]
    async fn test_empty_pool_rejected() {
        let pool = Pool::new();
        let err = DistributionPolicy::for_pool(Distribution::Broadcast, &pool).unwrap_err();
        assert!(matches!(err, DispatcherError::EmptyPool));
    }

    #[tokio::test]
    async fn test_broadcast_targets_whole_pool() {
        let pool = pool_of(&["a:1", "b:2", "c:3"]);
        let policy = DistributionPolicy::for_pool(Distribution::Broadcast, &pool).unwrap();
        let batch = MetricBatch::from_lines(["x 1 1"]);

        let targets: Vec<&str> = policy
            .resolve(&batch, &pool)
            .into_iter()
            .map(Destination::address)
            .collect();
        assert_eq!(targets, vec!["a:1", "b:2", "c:3"]);
    }

    #[tokio::test]
    async fn test_hash_route_is_deterministic() {
        let pool = pool_of(&["a:1", "b:2", "c:3"]);
        let policy = DistributionPolicy::for_pool(Distribution::HashRoute, &pool).unwrap();

        for tenant in ["tenantX", "tenantY", "acme", ""] {
            let batch = MetricBatch::with_tenant(vec!["x 1 1".into()], tenant);
            let first = policy.resolve(&batch, &pool);
            assert_eq!(first.len(), 1);
            for _ in 0..10 {
                let again = policy.resolve(&batch, &pool);
                assert_eq!(again[0].address(), first[0].address());
            }
        }
    }

    #[tokio::test]
    async fn test_hash_route_ignores_registration_order() {
        let forward = pool_of(&["a:1", "b:2", "c:3"]);
        let reverse = pool_of(&["c:3", "b:2", "a:1"]);
        let p1 = DistributionPolicy::for_pool(Distribution::HashRoute, &forward).unwrap();
        let p2 = DistributionPolicy::for_pool(Distribution::HashRoute, &reverse).unwrap();

        for i in 0..50 {
            let key = format!("tenant-{i}");
            assert_eq!(p1.route_key(&key), p2.route_key(&key));
        }
    }

    #[tokio::test]
    async fn test_hash_route_spreads_keys() {
        let pool = pool_of(&["a:1", "b:2", "c:3"]);
        let policy = DistributionPolicy::for_pool(Distribution::HashRoute, &pool).unwrap();

        let used: std::collections::HashSet<&str> = (0..100)
            .filter_map(|i| policy.route_key(&format!("tenant-{i}")))
            .collect();
        assert_eq!(used.len(), 3);
    }

    #[tokio::test]
    async fn test_hash_route_custom_key() {
        let pool = pool_of(&["a:1", "b:2"]);
        let policy = DistributionPolicy::hash_route(&pool, first_line);

        let batch = MetricBatch::from_lines(["cpu 1 1"]);
        let expected = policy.route_key("cpu 1 1").unwrap();
        assert_eq!(policy.resolve(&batch, &pool)[0].address(), expected);
    }

    #[tokio::test]
    async fn test_broadcast_has_no_route_key() {
        let pool = pool_of(&["a:1"]);
        let policy = DistributionPolicy::for_pool(Distribution::Broadcast, &pool).unwrap();
        assert!(policy.route_key("anything").is_none());
        assert_eq!(policy.distribution(), Distribution::Broadcast);
    }
}
