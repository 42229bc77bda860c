//! # Integration Tests
//!
//! End-to-end tests over real loopback TCP sockets.
//!
//! Covers:
//! - broadcast and hash-route delivery
//! - drop-newest on a full destination queue
//! - reconnect after the peer closes the connection
//! - isolation of healthy destinations from an unreachable one

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use contracts::{BackoffConfig, Distribution, GatewayConfig};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::time::{sleep, timeout, Duration};

    /// Loopback endpoint recording every received line
    pub struct Collector {
        pub address: String,
        lines: Arc<Mutex<Vec<String>>>,
        connections: Arc<AtomicUsize>,
    }

    impl Collector {
        /// Accept connections and read lines until the test ends
        pub async fn start() -> Self {
            Self::start_with(false).await
        }

        /// Like `start`, but the first accepted connection is closed immediately
        pub async fn start_hanging_up_first() -> Self {
            Self::start_with(true).await
        }

        async fn start_with(hang_up_first: bool) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = listener.local_addr().unwrap().to_string();
            let lines = Arc::new(Mutex::new(Vec::new()));
            let connections = Arc::new(AtomicUsize::new(0));

            let sink = Arc::clone(&lines);
            let accepted = Arc::clone(&connections);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let n = accepted.fetch_add(1, Ordering::SeqCst);
                    if hang_up_first && n == 0 {
                        drop(stream);
                        continue;
                    }
                    let sink = Arc::clone(&sink);
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            sink.lock().unwrap().push(line);
                        }
                    });
                }
            });

            Self {
                address,
                lines,
                connections,
            }
        }

        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub fn connections(&self) -> usize {
            self.connections.load(Ordering::SeqCst)
        }

        /// Wait until at least `n` lines arrived
        pub async fn wait_for_lines(&self, n: usize) -> Vec<String> {
            timeout(Duration::from_secs(5), async {
                loop {
                    let lines = self.lines();
                    if lines.len() >= n {
                        return lines;
                    }
                    sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .unwrap_or_else(|_| panic!("{}: timed out waiting for {n} lines", self.address))
        }
    }

    /// Address nothing listens on
    pub async fn unreachable_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    }

    pub fn config(destinations: &[&str], distribution: Distribution, queue_cap: usize) -> GatewayConfig {
        GatewayConfig {
            destinations: destinations.iter().map(|s| s.to_string()).collect(),
            distribution,
            queue_cap,
            connect_timeout_ms: 500,
            backoff: BackoffConfig {
                min_delay_ms: 10,
                max_delay_ms: 50,
                factor: 2.0,
            },
            ..Default::default()
        }
    }

    /// Poll `f` until it holds or five seconds pass
    pub async fn eventually<F: Fn() -> bool>(f: F) {
        timeout(Duration::from_secs(5), async {
            while !f() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ConnectionState, Distribution, MetricBatch};
    use dispatcher::create_distributor;
    use tokio::time::{sleep, Duration};

    use crate::support::{config, eventually, unreachable_address, Collector};

    fn b1() -> MetricBatch {
        MetricBatch::from_lines(["a 1 100"])
    }

    fn b2() -> MetricBatch {
        MetricBatch::from_lines(["b 2 200"])
    }

    #[tokio::test]
    async fn test_broadcast_delivers_in_order_exactly_once() {
        let d1 = Collector::start().await;
        let d2 = Collector::start().await;

        let (ingress, distributor) = create_distributor(config(
            &[d1.address.as_str(), d2.address.as_str()],
            Distribution::Broadcast,
            2,
        ))
        .unwrap();
        let _task = distributor.spawn();

        ingress.submit_wait(b1()).await.unwrap();
        ingress.submit_wait(b2()).await.unwrap();

        for collector in [&d1, &d2] {
            let lines = collector.wait_for_lines(2).await;
            assert_eq!(lines, vec!["a 1 100", "b 2 200"]);
        }

        sleep(Duration::from_millis(100)).await;
        assert_eq!(d1.lines().len(), 2);
        assert_eq!(d2.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_hash_route_same_tenant_same_destination() {
        let d1 = Collector::start().await;
        let d2 = Collector::start().await;

        let (ingress, distributor) = create_distributor(config(
            &[d1.address.as_str(), d2.address.as_str()],
            Distribution::HashRoute,
            2,
        ))
        .unwrap();
        let pool = Arc::clone(distributor.pool());
        let _task = distributor.spawn();

        ingress
            .submit_wait(MetricBatch::with_tenant(vec!["a 1 100".into()], "tenantX"))
            .await
            .unwrap();
        ingress
            .submit_wait(MetricBatch::with_tenant(vec!["b 2 200".into()], "tenantX"))
            .await
            .unwrap();

        eventually(|| d1.lines().len() + d2.lines().len() >= 2).await;
        sleep(Duration::from_millis(100)).await;

        let (target, other) = if d1.lines().is_empty() { (&d2, &d1) } else { (&d1, &d2) };
        assert_eq!(target.lines(), vec!["a 1 100", "b 2 200"]);
        assert!(other.lines().is_empty());

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.routed, 2);
        assert_eq!(snapshot.destination(&target.address).unwrap().sent, 2);
        assert_eq!(snapshot.destination(&other.address).unwrap().accepted, 0);
    }

    #[tokio::test]
    async fn test_disconnected_destination_drops_newest() {
        let address = unreachable_address().await;

        let (ingress, distributor) =
            create_distributor(config(&[address.as_str()], Distribution::Broadcast, 1)).unwrap();
        let pool = Arc::clone(distributor.pool());
        let _task = distributor.spawn();

        ingress.submit_wait(b1()).await.unwrap();
        ingress.submit_wait(b2()).await.unwrap();

        eventually(|| pool.snapshot().routed == 2).await;

        let snapshot = pool.snapshot();
        let stats = snapshot.destination(&address).unwrap();
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.queue_len, 1);
        assert_eq!(stats.sent, 0);
        assert_ne!(stats.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_reconnects_after_peer_hangs_up() {
        let d1 = Collector::start_hanging_up_first().await;

        let (ingress, distributor) =
            create_distributor(config(&[d1.address.as_str()], Distribution::Broadcast, 16)).unwrap();
        let pool = Arc::clone(distributor.pool());
        let _task = distributor.spawn();

        // Keep feeding until a batch lands on a fresh connection
        let mut n = 0;
        while d1.lines().is_empty() {
            n += 1;
            assert!(n < 500, "no batch delivered after reconnect");
            ingress
                .submit_wait(MetricBatch::from_lines([format!("m {n} {n}")]))
                .await
                .unwrap();
            sleep(Duration::from_millis(10)).await;
        }

        assert!(d1.connections() >= 2);
        let snapshot = pool.snapshot();
        let stats = snapshot.destination(&d1.address).unwrap();
        assert!(stats.reconnects >= 1);
        assert!(stats.write_errors >= 1);
        assert_eq!(stats.lost, stats.write_errors);
    }

    #[tokio::test]
    async fn test_unreachable_destination_does_not_delay_healthy_one() {
        let healthy = Collector::start().await;
        let dead = unreachable_address().await;

        let (ingress, distributor) = create_distributor(config(
            &[healthy.address.as_str(), dead.as_str()],
            Distribution::Broadcast,
            8,
        ))
        .unwrap();
        let pool = Arc::clone(distributor.pool());
        let _task = distributor.spawn();

        let live = pool.lookup(&healthy.address).unwrap();
        eventually(|| live.state() == ConnectionState::Connected).await;

        for i in 0..100u64 {
            ingress
                .submit_wait(MetricBatch::from_lines([format!("m {i} {i}")]))
                .await
                .unwrap();
            // Keep the healthy queue from filling; the dead one fills regardless
            eventually(|| live.metrics().sent() == i + 1).await;
        }

        let lines = healthy.wait_for_lines(100).await;
        let expected: Vec<String> = (0..100).map(|i| format!("m {i} {i}")).collect();
        assert_eq!(lines, expected);

        let snapshot = pool.snapshot();
        let dead_stats = snapshot.destination(&dead).unwrap();
        assert_eq!(dead_stats.accepted, 8);
        assert_eq!(dead_stats.dropped, 92);
        assert!(dead_stats.connect_failures >= 1);
        assert!(dead_stats.last_error.is_some());
        assert_eq!(snapshot.destination(&healthy.address).unwrap().dropped, 0);
    }

    #[tokio::test]
    async fn test_config_file_to_delivery() {
        let d1 = Collector::start().await;
        let d2 = Collector::start().await;

        let toml = format!(
            "destinations = \"{}, {}\"\nqueue_cap = 4\n\n[backoff]\nmin_delay_ms = 10\nmax_delay_ms = 50\n",
            d1.address, d2.address
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.distribution, Distribution::Broadcast);

        let (ingress, distributor) = create_distributor(config).unwrap();
        let _task = distributor.spawn();

        ingress
            .submit_wait(MetricBatch::from_lines(["x 1 1", "y 2 2"]))
            .await
            .unwrap();

        assert_eq!(d1.wait_for_lines(2).await, vec!["x 1 1", "y 2 2"]);
        assert_eq!(d2.wait_for_lines(2).await, vec!["x 1 1", "y 2 2"]);
    }
}
