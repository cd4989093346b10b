use std::fmt;
use std::time::Duration;

use layers::{LayerHandle, PendingTiles, all_settled};
use tokio::sync::watch;
use tokio::time::timeout;

/// Tiles were still loading when the wait gave up. Playback carries on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileSettleTimeout {
    pub after: Duration,
}

impl fmt::Display for TileSettleTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tiles did not settle within {} ms", self.after.as_millis())
    }
}

impl std::error::Error for TileSettleTimeout {}

/// Wait until none of `handles` has pending tiles, or `limit` elapses.
///
/// A closed channel counts as settled: nothing further will load.
pub async fn wait_for_settle(
    mut tiles: watch::Receiver<PendingTiles>,
    handles: &[LayerHandle],
    limit: Duration,
) -> Result<(), TileSettleTimeout> {
    let waited = timeout(limit, tiles.wait_for(|pending| all_settled(pending, handles)))
        .await
        .is_ok();
    if waited {
        Ok(())
    } else {
        Err(TileSettleTimeout { after: limit })
    }
}
