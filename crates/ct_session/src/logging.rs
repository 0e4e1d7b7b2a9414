use std::sync::Once;

use tracing::Level;

static INIT: Once = Once::new();

/// Installs a default fmt subscriber once. Safe to call from every test
/// or binary entry point; later calls are no-ops.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .try_init();
    });
}
