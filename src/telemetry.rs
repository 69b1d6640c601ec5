//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "amr_dashboard=info,floorplan_view=info,floorplan_model=info";

/// Install the fmt subscriber, filtered by `RUST_LOG` or [`DEFAULT_FILTER`].
///
/// Returns false when a global subscriber was already set; calling this
/// twice is harmless.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
