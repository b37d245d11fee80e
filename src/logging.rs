use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

static INIT: OnceCell<()> = OnceCell::new();

/// One time init, `RUST_LOG` wins over `default_filter` when set
///
/// Calling again is a no op, and a subscriber the host installed first is left alone
pub fn init(default_filter: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init();

        if let Err(error) = installed {
            tracing::debug!("keeping existing subscriber: {error}");
        }
    });
}
