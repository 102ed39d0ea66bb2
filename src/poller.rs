use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::api::HealthState;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::EventFetcher;
use crate::notifier::Notifier;
use crate::state::DedupStore;
use crate::transform::normalize;
use crate::types::{FetchFilter, NormalizedSale};

/// Outcome of one fetch-and-notify pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub skipped: usize,
    pub notified: usize,
}

pub struct Poller {
    fetcher: EventFetcher,
    notifier: Notifier,
    store: Arc<DedupStore>,
    health: Arc<HealthState>,
    filter: FetchFilter,
    profile_base_url: String,
    poll_interval: Duration,
    await_sends: bool,
}

impl Poller {
    pub fn new(cfg: &Config, store: Arc<DedupStore>, health: Arc<HealthState>) -> Result<Self> {
        Ok(Self {
            fetcher: EventFetcher::new(cfg)?,
            notifier: Notifier::new(cfg)?,
            store,
            health,
            filter: cfg.fetch_filter(),
            profile_base_url: cfg.profile_base_url.clone(),
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
            await_sends: cfg.await_sends,
        })
    }

    /// Starts a cycle on every tick, the first one immediately. Cycles are
    /// spawned rather than awaited, so a slow cycle can overlap the next one.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.poll_interval);

        loop {
            ticker.tick().await;
            let poller = Arc::clone(&self);
            tokio::spawn(async move {
                match poller.run_cycle().await {
                    Ok(_) => poller.health.record_cycle_ok(now_ns()),
                    Err(e) => {
                        poller.health.record_cycle_failed();
                        error!("Poll cycle failed: {e}");
                    }
                }
            });
        }
    }

    /// Fetch, skip known ids, and for each new sale: mark it, then send it.
    ///
    /// The mark happens first so a crash can drop a notification but never
    /// repeat one. A failed send is logged and the mark stays.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let events = self.fetcher.fetch_raw(&self.filter).await?;
        let mut stats = CycleStats {
            fetched: events.len(),
            ..CycleStats::default()
        };

        for event in &events {
            if self.store.has_notified(event.id) {
                stats.skipped += 1;
                continue;
            }

            let sale = normalize(event, &self.profile_base_url);
            debug!(
                event_id = event.id,
                asset = %sale.asset_name,
                quantity = event.quantity.as_deref().unwrap_or("1"),
                "New sale: {} for {} {}",
                sale.asset_name,
                sale.price.native,
                sale.price.currency,
            );

            self.store.mark_notified(event.id).await?;
            self.dispatch(sale).await;
            stats.notified += 1;
        }

        info!(
            fetched = stats.fetched,
            skipped = stats.skipped,
            notified = stats.notified,
            "Poll cycle complete: {} fetched, {} new",
            stats.fetched,
            stats.notified,
        );
        Ok(stats)
    }

    async fn dispatch(&self, sale: NormalizedSale) {
        if self.await_sends {
            deliver(&self.notifier, &self.health, &sale).await;
        } else {
            let notifier = self.notifier.clone();
            let health = Arc::clone(&self.health);
            tokio::spawn(async move { deliver(&notifier, &health, &sale).await });
        }
    }
}

async fn deliver(notifier: &Notifier, health: &HealthState, sale: &NormalizedSale) {
    match notifier.send(sale).await {
        Ok(()) => health.record_send(true),
        Err(e) => {
            health.record_send(false);
            warn!(event_id = sale.event_id, "Webhook send failed for event {}: {e}", sale.event_id);
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_EVENT_LIMIT, PROFILE_BASE_URL};
    use crate::db;
    use crate::test_support::{marketplace, raw_event, webhook};
    use crate::types::EventType;
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn config(api_url: &str, webhook_url: &str, await_sends: bool) -> Config {
        Config {
            api_url: api_url.to_string(),
            api_key: "test-key".to_string(),
            webhook_url: webhook_url.to_string(),
            profile_base_url: PROFILE_BASE_URL.to_string(),
            log_level: "debug".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            poll_interval_secs: 3600,
            http_timeout_secs: 5,
            await_sends,
            contract_address: Some("0xabc".to_string()),
            collection_slug: None,
            event_type: EventType::Successful,
            event_limit: DEFAULT_EVENT_LIMIT,
        }
    }

    async fn poller(cfg: &Config) -> (Poller, Arc<DedupStore>, Arc<HealthState>) {
        let store = DedupStore::load(db::open_in_memory().await.unwrap()).await.unwrap();
        let health = Arc::new(HealthState::new());
        let p = Poller::new(cfg, Arc::clone(&store), Arc::clone(&health)).unwrap();
        (p, store, health)
    }

    async fn wait_for_bodies(bodies: &Arc<Mutex<Vec<Value>>>, n: usize) {
        for _ in 0..100 {
            if bodies.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {n} webhook bodies, got {}", bodies.lock().unwrap().len());
    }

    #[tokio::test]
    async fn second_cycle_over_same_events_sends_nothing() {
        let (api, _) = marketplace(json!([raw_event(1), raw_event(2)]), StatusCode::OK).await;
        let (hook, bodies) = webhook(StatusCode::NO_CONTENT).await;
        let (p, store, health) = poller(&config(&api, &hook, true)).await;

        let first = p.run_cycle().await.unwrap();
        assert_eq!(first, CycleStats { fetched: 2, skipped: 0, notified: 2 });
        assert!(store.has_notified(1));
        assert!(store.has_notified(2));

        let second = p.run_cycle().await.unwrap();
        assert_eq!(second, CycleStats { fetched: 2, skipped: 2, notified: 0 });

        assert_eq!(bodies.lock().unwrap().len(), 2);
        assert_eq!(health.notifications_sent(), 2);
    }

    #[tokio::test]
    async fn sends_follow_input_order() {
        let (api, _) = marketplace(json!([raw_event(2), raw_event(1)]), StatusCode::OK).await;
        let (hook, bodies) = webhook(StatusCode::OK).await;
        let (p, _, _) = poller(&config(&api, &hook, true)).await;

        p.run_cycle().await.unwrap();
        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies[0]["embeds"][0]["title"], "Cat #2 was purchased!");
        assert_eq!(bodies[1]["embeds"][0]["title"], "Cat #1 was purchased!");
    }

    #[tokio::test]
    async fn already_known_ids_are_skipped() {
        let (api, _) = marketplace(json!([raw_event(1), raw_event(2)]), StatusCode::OK).await;
        let (hook, bodies) = webhook(StatusCode::OK).await;
        let (p, store, _) = poller(&config(&api, &hook, true)).await;
        store.mark_notified(1).await.unwrap();

        let stats = p.run_cycle().await.unwrap();
        assert_eq!(stats.notified, 1);
        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["embeds"][0]["title"], "Cat #2 was purchased!");
    }

    #[tokio::test]
    async fn failed_send_keeps_event_marked() {
        let (api, _) = marketplace(json!([raw_event(7)]), StatusCode::OK).await;
        let (hook, _) = webhook(StatusCode::INTERNAL_SERVER_ERROR).await;
        let (p, store, health) = poller(&config(&api, &hook, true)).await;

        let stats = p.run_cycle().await.unwrap();
        assert_eq!(stats.notified, 1);
        assert!(store.has_notified(7));
        assert!(store.is_persisted(7).await.unwrap());
        assert_eq!(health.send_failures(), 1);

        // Not re-sent on the next cycle.
        let stats = p.run_cycle().await.unwrap();
        assert_eq!(stats.notified, 0);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_cycle() {
        let (api, _) = marketplace(json!([raw_event(1)]), StatusCode::INTERNAL_SERVER_ERROR).await;
        let (hook, bodies) = webhook(StatusCode::OK).await;
        let (p, store, _) = poller(&config(&api, &hook, true)).await;

        assert!(p.run_cycle().await.is_err());
        assert!(!store.has_notified(1));
        assert!(bodies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawned_sends_still_arrive() {
        let (api, _) = marketplace(json!([raw_event(1), raw_event(2)]), StatusCode::OK).await;
        let (hook, bodies) = webhook(StatusCode::OK).await;
        let (p, _, _) = poller(&config(&api, &hook, false)).await;

        let stats = p.run_cycle().await.unwrap();
        assert_eq!(stats.notified, 2);
        wait_for_bodies(&bodies, 2).await;
    }

    #[tokio::test]
    async fn run_fires_first_cycle_immediately() {
        let (api, seen) = marketplace(json!([raw_event(3)]), StatusCode::OK).await;
        let (hook, bodies) = webhook(StatusCode::OK).await;
        let (p, _, health) = poller(&config(&api, &hook, true)).await;

        let handle = tokio::spawn(Arc::new(p).run());
        wait_for_bodies(&bodies, 1).await;
        for _ in 0..100 {
            if health.cycles_completed() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert_eq!(health.cycles_completed(), 1);
        assert_eq!(health.notifications_sent(), 1);
        let queries = seen.queries.lock().unwrap();
        assert!(queries[0].contains(&("asset_contract_address".to_string(), "0xabc".to_string())));
        assert_eq!(seen.api_keys.lock().unwrap()[0].as_deref(), Some("test-key"));
    }
}
