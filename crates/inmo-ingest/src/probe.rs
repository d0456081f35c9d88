//! Connectivity prober
//!
//! ```text
//! Unresolved ──dns ok, connect ok──────────────────────────► ResolvedDirect
//!     │ dns ok, connect fails ─────────────────────────────► Failed
//!     │ dns fails, host is db.<ref>.supabase.co
//!     └──► pooler aws-1-<region>.pooler.supabase.com ──ok──► ResolvedPooler
//!                                                  └─fails─► Failed
//! ```
//!
//! Every attempt is kept in the report, including the failed ones, so the
//! `probe` command can print what was tried.

use crate::connection::{self, ConnectionDescriptor, Route};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Connection, PgConnection};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeState {
    Unresolved,
    ResolvedDirect,
    ResolvedPooler,
    Failed,
}

impl ProbeState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ProbeState::ResolvedDirect | ProbeState::ResolvedPooler)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStage {
    Dns,
    Connect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteAttempt {
    pub route: Route,
    pub host: String,
    pub port: u16,
    /// Stage reached; for a failure, the stage that failed
    pub stage: ProbeStage,
    pub error: Option<String>,
}

impl RouteAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ProbeReport<C> {
    pub state: ProbeState,
    pub attempts: Vec<RouteAttempt>,
    /// Descriptor of the route that worked
    pub descriptor: Option<ConnectionDescriptor>,
    pub connection: Option<C>,
}

impl<C> ProbeReport<C> {
    fn new() -> Self {
        Self {
            state: ProbeState::Unresolved,
            attempts: Vec::new(),
            descriptor: None,
            connection: None,
        }
    }

    fn attempt(&mut self, target: &ConnectionDescriptor, stage: ProbeStage, error: Option<String>) {
        match &error {
            None => info!(
                outcome = "info",
                route = %target.route,
                host = %target.host,
                port = target.port,
                "Route reachable"
            ),
            Some(e) => warn!(
                outcome = "warning",
                route = %target.route,
                host = %target.host,
                stage = ?stage,
                error = %e,
                "Route attempt failed"
            ),
        }
        self.attempts.push(RouteAttempt {
            route: target.route,
            host: target.host.clone(),
            port: target.port,
            stage,
            error,
        });
    }

    /// One line per attempt, for the connectivity error message
    pub fn describe_attempts(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.error {
                Some(e) => format!("{} {}:{} ({:?}): {}", a.route, a.host, a.port, a.stage, e),
                None => format!("{} {}:{} ok", a.route, a.host, a.port),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Name resolution and connection setup, split out so routes can be
/// exercised without a network
#[async_trait]
pub trait Dialer: Send + Sync {
    type Connection: Send;

    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>>;

    async fn connect(&self, target: &ConnectionDescriptor) -> Result<Self::Connection>;
}

/// Real dialer: system resolver and a TLS Postgres connection
pub struct PgDialer {
    connect_timeout: Duration,
}

impl PgDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Dialer for PgDialer {
    type Connection = PgConnection;

    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
        if addrs.is_empty() {
            return Err(IngestError::connectivity(format!("{} resolved to no addresses", host)));
        }
        Ok(addrs)
    }

    async fn connect(&self, target: &ConnectionDescriptor) -> Result<PgConnection> {
        let options = target.connect_options()?;
        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options)).await
        {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(IngestError::connectivity(format!(
                "connect to {} timed out after {}s",
                target.host,
                self.connect_timeout.as_secs()
            ))),
        }
    }
}

pub struct ConnectivityProber<D> {
    dialer: D,
    pooler_region: String,
}

impl<D: Dialer> ConnectivityProber<D> {
    pub fn new(dialer: D, pooler_region: impl Into<String>) -> Self {
        Self {
            dialer,
            pooler_region: pooler_region.into(),
        }
    }

    /// Run the route state machine from `primary`. Never errors; a dead end
    /// is reported as [`ProbeState::Failed`].
    pub async fn probe(&self, primary: &ConnectionDescriptor) -> ProbeReport<D::Connection> {
        let mut report = ProbeReport::new();
        info!(target_url = %primary.redacted(), "Probing database connectivity");

        match self.dialer.resolve(&primary.host, primary.port).await {
            Ok(addrs) => {
                info!(host = %primary.host, addresses = addrs.len(), "DNS resolved");
                self.finish(&mut report, primary, ProbeState::ResolvedDirect).await;
            },
            Err(e) => {
                report.attempt(primary, ProbeStage::Dns, Some(e.to_string()));
                match connection::pooler_target(primary, &self.pooler_region) {
                    Some(pooler) => {
                        info!(
                            outcome = "info",
                            host = %pooler.host,
                            options = pooler.options.as_deref().unwrap_or_default(),
                            "Falling back to session pooler"
                        );
                        match self.dialer.resolve(&pooler.host, pooler.port).await {
                            Ok(_) => {
                                self.finish(&mut report, &pooler, ProbeState::ResolvedPooler).await
                            },
                            Err(e) => {
                                report.attempt(&pooler, ProbeStage::Dns, Some(e.to_string()));
                                report.state = ProbeState::Failed;
                            },
                        }
                    },
                    None => report.state = ProbeState::Failed,
                }
            },
        }

        if report.state == ProbeState::Failed {
            error!(outcome = "error", attempts = %report.describe_attempts(), "No route to database");
        }
        report
    }

    async fn finish(
        &self,
        report: &mut ProbeReport<D::Connection>,
        target: &ConnectionDescriptor,
        resolved: ProbeState,
    ) {
        match self.dialer.connect(target).await {
            Ok(conn) => {
                report.attempt(target, ProbeStage::Connect, None);
                report.state = resolved;
                report.descriptor = Some(target.clone());
                report.connection = Some(conn);
            },
            Err(e) => {
                report.attempt(target, ProbeStage::Connect, Some(e.to_string()));
                report.state = ProbeState::Failed;
            },
        }
    }

    /// Probe and hand back the live connection, or a connectivity error
    /// naming every route tried
    pub async fn establish(
        &self,
        primary: &ConnectionDescriptor,
    ) -> Result<(D::Connection, ConnectionDescriptor)> {
        let report = self.probe(primary).await;
        let summary = report.describe_attempts();
        match (report.state.is_resolved(), report.connection, report.descriptor) {
            (true, Some(conn), Some(descriptor)) => Ok((conn, descriptor)),
            _ => Err(IngestError::connectivity(format!("all routes failed: {}", summary))),
        }
    }
}
