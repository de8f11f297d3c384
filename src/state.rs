// =============================================================================
// Shared application state
// =============================================================================

use parking_lot::RwLock;

use crate::config::GatewayConfig;
use crate::upstream::HistoryClient;

/// State shared across request handlers, held behind an `Arc` by the router.
///
/// The config sits behind a lock so a future reload path can swap it without
/// restarting; the upstream client is immutable and internally `Clone`.
pub struct GatewayState {
    pub config: RwLock<GatewayConfig>,
    pub history: HistoryClient,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, history: HistoryClient) -> Self {
        Self {
            config: RwLock::new(config),
            history,
        }
    }
}
