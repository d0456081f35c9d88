//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod load;
pub mod probe;
pub mod rest;
pub mod schema;

use crate::config::IngestConfig;
use crate::connection::ConnectionDescriptor;
use crate::error::Result;
use crate::probe::{ConnectivityProber, PgDialer};
use crate::store::PgStore;
use tracing::info;

/// Probe routes from the environment descriptor and wrap the first live
/// connection in a store
pub(crate) async fn connect_store(config: &IngestConfig) -> Result<PgStore> {
    let primary = ConnectionDescriptor::from_env()?;
    let prober = ConnectivityProber::new(
        PgDialer::new(config.connect_timeout()),
        config.pooler_region.clone(),
    );
    let (conn, descriptor) = prober.establish(&primary).await?;
    info!(route = %descriptor.route, host = %descriptor.host, "Connected");
    Ok(PgStore::new(conn))
}
