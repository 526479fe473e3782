use embassy_time::Ticker;
use log::{info, warn};

use super::Trigger;
use crate::app_state::AppContext;
use crate::config::{ActivationMode, PublishMode};
use crate::publisher::{NetworkClient, Publisher};

/// One heartbeat period: publish the live store (heartbeat mode only), then
/// resume the chained producers.
pub async fn heartbeat_step<C: NetworkClient>(ctx: &AppContext<'_>, publisher: &mut Publisher<'_, C>) {
    if ctx.config.publish_mode == PublishMode::Heartbeat {
        match ctx.store.read(ctx.config.store_read_wait()).await {
            Ok(snapshot) => {
                // Logged inside the publisher; the next period tries again.
                publisher.publish_heartbeat(&snapshot, &ctx.identity).await.ok();
            }
            Err(e) => warn!("Heartbeat skipped: {}", e),
        }
    }

    if ctx.config.activation == ActivationMode::Chained {
        ctx.chain.fire(Trigger::HeartbeatTick);
    }
}

/// Heartbeat task body.
pub async fn run_heartbeat<C: NetworkClient>(ctx: &AppContext<'_>, client: C) -> ! {
    let mut publisher = Publisher::new(
        client,
        &ctx.broker,
        ctx.config.publish_timeout(),
        &ctx.sequence,
    );
    let mut ticker = Ticker::every(ctx.config.heartbeat_interval());
    info!(
        "Heartbeat task started, every {} ms",
        ctx.config.heartbeat_interval_ms
    );

    loop {
        ticker.next().await;
        heartbeat_step(ctx, &mut publisher).await;
    }
}
