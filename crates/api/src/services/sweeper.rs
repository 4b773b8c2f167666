//! Background fulfillment sweeper.
//!
//! Periodically promotes paid orders along the fulfillment timeline:
//! processing orders older than the shipping cutoff become shipped, shipped
//! orders older than the delivery cutoff become delivered. The promotion
//! itself is one pass of `OrderRepository::sweep_fulfillment`.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info};

use crate::db::OrderRepository;

/// Spawn the periodic fulfillment sweep.
///
/// Runs one pass per `interval`, starting immediately. A failed pass is
/// logged and retried on the next tick; the task itself never exits.
pub fn spawn_fulfillment_sweeper(pool: PgPool, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Spawning fulfillment sweeper");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let repo = OrderRepository::new(&pool);
            match repo.sweep_fulfillment(Utc::now()).await {
                Ok(outcome) => {
                    if outcome.shipped > 0 || outcome.delivered > 0 {
                        info!(
                            shipped = outcome.shipped,
                            delivered = outcome.delivered,
                            "Fulfillment sweep promoted orders"
                        );
                    }
                }
                Err(e) => {
                    error!(error = %e, "Fulfillment sweep failed");
                }
            }
        }
    });
}
