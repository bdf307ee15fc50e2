use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::classify::classify_batch;
use crate::feed::client::FeedClient;
use crate::feed::error::FeedError;
use crate::feed::message::{convert_batch, decode_push};
use crate::feed::state::{ConnectionState, FeedStatus};
use crate::model::{RestrictedZone, Snapshot, TelemetryRecord};
use crate::synth::SyntheticGenerator;

/// Batches with zero unauthorized records after classification are padded
/// with this many forced-unauthorized synthetic records. Deliberate product
/// policy: an all-clear feed is treated as insufficiently informative.
fn default_topup_count() -> usize {
    5
}

fn default_topup_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopUpPolicy {
    #[serde(default = "default_topup_enabled")]
    pub enabled: bool,
    #[serde(default = "default_topup_count")]
    pub count: usize,
}

impl Default for TopUpPolicy {
    fn default() -> Self {
        Self {
            enabled: default_topup_enabled(),
            count: default_topup_count(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub records_url: String,
    pub zones_url: Option<String>,
    pub push_url: String,
    pub reconnect_delay: Duration,
    pub zone_refresh: Option<Duration>,
    /// Synthetic records substituted when the bootstrap record fetch fails.
    pub bootstrap_fallback_count: usize,
    pub topup: TopUpPolicy,
    /// Initial zone set, used until (and unless) a zones endpoint delivers one.
    pub static_zones: Vec<RestrictedZone>,
}

#[derive(Debug)]
struct Shared {
    state: ConnectionState,
    zones: Vec<RestrictedZone>,
    version: u64,
}

struct SyncContext {
    settings: SyncSettings,
    client: FeedClient,
    generator: SyntheticGenerator,
    shared: StdMutex<Shared>,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Owns the connection to the upstream feed and the published snapshot.
/// All snapshot mutation happens on the single worker task; consumers read
/// immutable `Arc<Snapshot>` values and never block the worker.
pub struct Synchronizer {
    ctx: Arc<SyncContext>,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    worker: Option<WorkerHandle>,
}

impl Synchronizer {
    pub fn new(settings: SyncSettings, client: FeedClient, generator: SyntheticGenerator) -> Self {
        let zones = settings.static_zones.clone();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::empty()));
        let ctx = Arc::new(SyncContext {
            settings,
            client,
            generator,
            shared: StdMutex::new(Shared {
                state: ConnectionState::Disconnected,
                zones,
                version: 0,
            }),
            snapshot_tx,
        });
        Self {
            ctx,
            snapshot_rx,
            worker: None,
        }
    }

    /// Latest published snapshot. Cheap; clones an `Arc`.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscription handle; resolves whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.ctx.snapshot_tx.subscribe()
    }

    pub fn status(&self) -> FeedStatus {
        let shared = self.ctx.shared.lock().unwrap();
        FeedStatus {
            state: shared.state,
            snapshot_version: shared.version,
            last_updated: self.snapshot_rx.borrow().last_updated,
        }
    }

    /// Zone set the next classification pass will use.
    pub fn zones(&self) -> Vec<RestrictedZone> {
        self.ctx.shared.lock().unwrap().zones.clone()
    }

    /// Spawn the worker: bootstrap fetch, then the push channel with its
    /// reconnect loop. At most one worker may run.
    pub fn start(&mut self) -> Result<(), FeedError> {
        if self.worker.is_some() {
            return Err(FeedError::AlreadyRunning);
        }

        let ctx = self.ctx.clone();
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_sync_loop(ctx, stop_rx));
        self.worker = Some(WorkerHandle { stop_tx, join });
        Ok(())
    }

    /// Close the channel and cancel any pending reconnect timer. No partial
    /// reconnect attempt survives this.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
        self.ctx.shared.lock().unwrap().state = ConnectionState::Disconnected;
    }
}

/// Classify an ingested batch and apply the top-up policy. Used for new
/// record batches only, never for zone-driven re-classification.
fn prepare_batch(
    records: Vec<TelemetryRecord>,
    zones: &[RestrictedZone],
    generator: &SyntheticGenerator,
    topup: &TopUpPolicy,
) -> Vec<TelemetryRecord> {
    let mut records = classify_batch(records, zones);
    if topup.enabled && !records.iter().any(|r| r.is_unauthorized()) {
        records.extend(generator.generate(topup.count, true));
    }
    records
}

fn set_state(ctx: &SyncContext, state: ConnectionState) {
    let mut shared = ctx.shared.lock().unwrap();
    if shared.state != state {
        log::info!("feed connection: {:?} -> {:?}", shared.state, state);
        shared.state = state;
    }
}

/// Publish a complete snapshot by atomic swap. Single caller discipline:
/// only the worker task publishes.
fn publish(ctx: &SyncContext, records: Vec<TelemetryRecord>, zones: Vec<RestrictedZone>) {
    let unauthorized = records.iter().filter(|r| r.is_unauthorized()).count();
    let version = {
        let mut shared = ctx.shared.lock().unwrap();
        shared.version += 1;
        shared.version
    };
    log::info!(
        "snapshot v{version}: {} records, {unauthorized} unauthorized",
        records.len()
    );
    ctx.snapshot_tx.send_replace(Arc::new(Snapshot {
        records,
        zones,
        last_updated: Utc::now(),
    }));
}

fn ingest(ctx: &SyncContext, records: Vec<TelemetryRecord>) {
    let zones = ctx.shared.lock().unwrap().zones.clone();
    let records = prepare_batch(records, &zones, &ctx.generator, &ctx.settings.topup);
    publish(ctx, records, zones);
}

async fn bootstrap(ctx: &SyncContext) {
    // Zones first so the first classification pass can use them. A failed
    // zone fetch degrades to the configured static set (empty by default)
    // and never blocks record ingestion.
    if let Some(url) = &ctx.settings.zones_url {
        match ctx.client.fetch_zones(url).await {
            Ok(zones) => {
                log::info!("loaded {} restricted zones", zones.len());
                ctx.shared.lock().unwrap().zones = zones;
            }
            Err(e) => log::warn!("zone fetch failed: {e}; starting with the static zone set"),
        }
    }

    let records = match ctx.client.fetch_records(&ctx.settings.records_url).await {
        Ok(batch) => convert_batch(batch),
        Err(e) => {
            let count = ctx.settings.bootstrap_fallback_count;
            log::warn!("record fetch failed: {e}; substituting {count} synthetic records");
            ctx.generator.generate(count, false)
        }
    };
    ingest(ctx, records);
}

fn handle_push_text(ctx: &SyncContext, text: &str) {
    match decode_push(text) {
        Ok(batch) => ingest(ctx, convert_batch(batch)),
        Err(e) => log::warn!("discarding push message: {e}"),
    }
}

/// Re-fetch the zone set and re-classify the entire current record set.
/// No top-up here: padding on re-classification would grow the synthetic
/// population without bound across repeated zone updates.
async fn refresh_zones(ctx: &SyncContext) {
    let Some(url) = &ctx.settings.zones_url else {
        return;
    };
    match ctx.client.fetch_zones(url).await {
        Ok(zones) => {
            ctx.shared.lock().unwrap().zones = zones.clone();
            let current = ctx.snapshot_tx.borrow().records.clone();
            let records = classify_batch(current, &zones);
            publish(ctx, records, zones);
        }
        Err(e) => log::warn!("zone refresh failed: {e}; keeping current zones"),
    }
}

enum ChannelExit {
    Stopped,
    Closed,
}

async fn run_sync_loop(ctx: Arc<SyncContext>, mut stop_rx: oneshot::Receiver<()>) {
    tokio::select! {
        _ = bootstrap(&ctx) => {}
        _ = &mut stop_rx => {
            set_state(&ctx, ConnectionState::Disconnected);
            return;
        }
    }

    loop {
        set_state(&ctx, ConnectionState::Connecting);
        let connected = tokio::select! {
            result = connect_async(ctx.settings.push_url.as_str()) => result,
            _ = &mut stop_rx => {
                set_state(&ctx, ConnectionState::Disconnected);
                return;
            }
        };
        match connected {
            Ok((channel, _)) => {
                log::info!("push channel open: {}", ctx.settings.push_url);
                set_state(&ctx, ConnectionState::Connected);
                match read_push_channel(&ctx, channel, &mut stop_rx).await {
                    ChannelExit::Stopped => {
                        set_state(&ctx, ConnectionState::Disconnected);
                        return;
                    }
                    ChannelExit::Closed => log::warn!("push channel closed"),
                }
            }
            Err(e) => log::warn!("push connect failed: {e}"),
        }

        // Exactly one reconnect attempt, after the fixed delay. Stop cancels
        // the pending timer.
        set_state(&ctx, ConnectionState::ReconnectWait);
        tokio::select! {
            _ = sleep(ctx.settings.reconnect_delay) => {}
            _ = &mut stop_rx => {
                set_state(&ctx, ConnectionState::Disconnected);
                return;
            }
        }
    }
}

async fn read_push_channel<S>(
    ctx: &SyncContext,
    mut channel: S,
    stop_rx: &mut oneshot::Receiver<()>,
) -> ChannelExit
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut zone_tick = ctx.settings.zone_refresh.map(|period| {
        tokio::time::interval_at(tokio::time::Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            _ = &mut *stop_rx => return ChannelExit::Stopped,
            _ = async { zone_tick.as_mut().unwrap().tick().await }, if zone_tick.is_some() => {
                refresh_zones(ctx).await;
            }
            message = channel.next() => match message {
                Some(Ok(Message::Text(text))) => handle_push_text(ctx, text.as_str()),
                Some(Ok(Message::Close(_))) | None => return ChannelExit::Closed,
                Some(Ok(_)) => {} // ping/pong/binary: nothing to ingest
                Some(Err(e)) => {
                    log::warn!("push channel error: {e}");
                    return ChannelExit::Closed;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthorizationStatus, Provenance};
    use crate::report;
    use crate::synth::{SynthBands, SIMULATED_REASON};

    fn generator() -> SyntheticGenerator {
        SyntheticGenerator::new(SynthBands::default())
    }

    fn live_record(id: &str, lat: f64, lon: f64) -> TelemetryRecord {
        TelemetryRecord {
            id: id.to_string(),
            latitude: lat,
            longitude: lon,
            altitude_m: 1200.0,
            velocity_kmh: 90.0,
            country_of_origin: None,
            timestamp_ms: 1_700_000_000_000,
            status: AuthorizationStatus::Authorized,
            reason: String::new(),
            provenance: Provenance::Live,
        }
    }

    fn settings(reconnect_delay: Duration) -> SyncSettings {
        // Port 9 (discard) is not listening; connects fail fast.
        SyncSettings {
            records_url: "http://127.0.0.1:9/drones".to_string(),
            zones_url: None,
            push_url: "ws://127.0.0.1:9/ws".to_string(),
            reconnect_delay,
            zone_refresh: None,
            bootstrap_fallback_count: 10,
            topup: TopUpPolicy::default(),
            static_zones: Vec::new(),
        }
    }

    #[test]
    fn all_clear_batch_is_topped_up() {
        let records = vec![
            live_record("D1", 40.0, -100.0),
            live_record("D2", 41.0, -101.0),
            live_record("D3", 42.0, -102.0),
        ];
        let prepared = prepare_batch(records, &[], &generator(), &TopUpPolicy::default());

        assert_eq!(prepared.len(), 8);
        let forced: Vec<_> = prepared.iter().filter(|r| r.is_unauthorized()).collect();
        assert_eq!(forced.len(), 5);
        assert!(forced.iter().all(|r| r.reason == SIMULATED_REASON));
        assert!(forced.iter().all(|r| r.provenance == Provenance::Synthetic));

        let snapshot = Snapshot {
            records: prepared,
            zones: Vec::new(),
            last_updated: Utc::now(),
        };
        let validation = report::validate(&snapshot);
        assert_eq!(validation.total_drones, 8);
        assert_eq!(validation.authorized, 3);
        assert_eq!(validation.unauthorized, 5);
        assert!(validation.validation_passed);
    }

    #[test]
    fn batch_with_violations_is_not_padded() {
        let zones = vec![RestrictedZone {
            name: "Area51".to_string(),
            latitude: 37.235,
            longitude: -115.811,
            radius_km: 50.0,
        }];
        let records = vec![live_record("D1", 37.3, -115.8), live_record("D2", 40.0, -100.0)];
        let prepared = prepare_batch(records, &zones, &generator(), &TopUpPolicy::default());

        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].reason, "Restricted Zone: Area51");
    }

    #[test]
    fn disabled_topup_leaves_all_clear_batches_alone() {
        let policy = TopUpPolicy {
            enabled: false,
            count: 5,
        };
        let prepared = prepare_batch(
            vec![live_record("D1", 40.0, -100.0)],
            &[],
            &generator(),
            &policy,
        );
        assert_eq!(prepared.len(), 1);
    }

    #[test]
    fn empty_batch_is_topped_up_to_the_policy_count() {
        let prepared = prepare_batch(Vec::new(), &[], &generator(), &TopUpPolicy::default());
        assert_eq!(prepared.len(), 5);
        assert!(prepared.iter().all(|r| r.is_unauthorized()));
    }

    #[tokio::test]
    async fn bootstrap_falls_back_to_synthetic_records() {
        let mut sync = Synchronizer::new(
            settings(Duration::from_secs(600)),
            FeedClient::new(Duration::from_secs(1)).unwrap(),
            generator(),
        );
        let mut rx = sync.subscribe();
        sync.start().unwrap();

        tokio::time::timeout(Duration::from_secs(10), rx.changed())
            .await
            .expect("no snapshot published")
            .unwrap();

        let snapshot = sync.snapshot();
        // 10 fallback records, plus 5 top-up records when the Bernoulli
        // draws happened to mark none of the 10 unauthorized.
        assert!(snapshot.records.len() == 10 || snapshot.records.len() == 15);
        assert!(snapshot.unauthorized_count() >= 1);
        let validation = report::validate(&snapshot);
        assert!(validation.validation_passed);

        sync.stop().await;
    }

    #[tokio::test]
    async fn stop_cancels_a_pending_reconnect() {
        let mut sync = Synchronizer::new(
            settings(Duration::from_secs(600)),
            FeedClient::new(Duration::from_secs(1)).unwrap(),
            generator(),
        );
        let mut rx = sync.subscribe();
        sync.start().unwrap();
        tokio::time::timeout(Duration::from_secs(10), rx.changed())
            .await
            .expect("no snapshot published")
            .unwrap();

        // The worker is parked in its 600 s reconnect wait by now (or will
        // be shortly); stop must not wait the delay out.
        tokio::time::timeout(Duration::from_secs(5), sync.stop())
            .await
            .expect("stop did not cancel the reconnect timer");
        assert_eq!(sync.status().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let mut sync = Synchronizer::new(
            settings(Duration::from_secs(600)),
            FeedClient::new(Duration::from_secs(1)).unwrap(),
            generator(),
        );
        sync.start().unwrap();
        assert!(matches!(sync.start(), Err(FeedError::AlreadyRunning)));
        sync.stop().await;
    }
}
