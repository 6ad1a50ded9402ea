//==================================================
// File: logging.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tracing subscriber setup for the orrery binary
// Objective: Install one compact fmt subscriber, honouring RUST_LOG
//==================================================

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Initialise tracing once; later calls are ignored. `verbose` lowers the
/// default level to `debug`.
pub fn init(verbose: bool) {
    INIT.get_or_init(|| {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        let filter = EnvFilter::from_default_env().add_directive(level.into());
        let _ = SubscriberBuilder::default()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

//==================================================
// End of file
//==================================================
