use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use super::Poller;

/// Shortest delay allowed between cycle starts
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the polling task
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between the starts of consecutive cycles
    pub poll_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
        }
    }
}

/// Runs poll cycles on a fixed interval, forever.
///
/// A failed cycle is logged and retried on the next tick. A cycle that
/// overruns the interval delays the next one instead of stacking up.
#[instrument(skip(poller), fields(channel_id = poller.channel_id()))]
pub async fn start_polling_task(poller: Arc<Poller>, config: PollerConfig) {
    let period = if config.poll_interval < MIN_POLL_INTERVAL {
        warn!(
            requested_ms = config.poll_interval.as_millis() as u64,
            "Poll interval too short, using {:?}", MIN_POLL_INTERVAL
        );
        MIN_POLL_INTERVAL
    } else {
        config.poll_interval
    };

    info!(
        poll_interval_secs = period.as_secs(),
        "Starting message polling task"
    );

    let mut poll_interval = interval(period);
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        poll_interval.tick().await;
        debug!("Running poll cycle");

        if let Err(e) = poller.poll_once().await {
            error!(error = %e, "Poll cycle failed, retrying next interval");
        }
    }
}
