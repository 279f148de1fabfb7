use std::time::Duration;

use tracing::{info, warn};

use plaza_api::auth::AppState;
use plaza_core::stories;

/// Background task that hides stories past their time-to-live.
pub async fn run_story_expiry_loop(state: AppState, ttl: chrono::Duration, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let db_state = state.clone();
        let result =
            tokio::task::spawn_blocking(move || stories::expire_stories(&db_state.db, chrono::Utc::now(), ttl)).await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Story sweep: hid {} expired stories", count);
                }
            }
            Ok(Err(e)) => warn!("Story sweep error: {}", e),
            Err(e) => warn!("Story sweep task failed: {}", e),
        }
    }
}
