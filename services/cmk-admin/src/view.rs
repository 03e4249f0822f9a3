//! View pipeline client: alert acknowledgement, downtime scheduling, and
//! problem reports against the `view.py` endpoint.

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::io::{check_status, HttpClient};
use crate::response::{interpret_report, ReportOutcome};
use crate::urls::{masked_view_url, view_url, ReportAction, ViewOptions};
use crate::{CmkError, Result};

/// Report variants exposed to callers, folded onto the two report actions
/// plus the acknowledged filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    HostAck,
    HostUnack,
    SvcAck,
    SvcUnack,
    Host,
    Service,
}

impl ReportKind {
    fn action(&self) -> ReportAction {
        match self {
            ReportKind::HostAck | ReportKind::HostUnack | ReportKind::Host => {
                ReportAction::HostReport
            }
            ReportKind::SvcAck | ReportKind::SvcUnack | ReportKind::Service => {
                ReportAction::SvcReport
            }
        }
    }

    fn acknowledged(&self) -> Option<bool> {
        match self {
            ReportKind::HostAck | ReportKind::SvcAck => Some(true),
            ReportKind::HostUnack | ReportKind::SvcUnack => Some(false),
            ReportKind::Host | ReportKind::Service => None,
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = CmkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "host_ack" => Ok(ReportKind::HostAck),
            "host_unack" => Ok(ReportKind::HostUnack),
            "svc_ack" => Ok(ReportKind::SvcAck),
            "svc_unack" => Ok(ReportKind::SvcUnack),
            "host" => Ok(ReportKind::Host),
            "hostservice" => Ok(ReportKind::Service),
            _ => Err(CmkError::InvalidAction(s.to_string())),
        }
    }
}

/// Client for the view endpoint
pub struct ViewClient {
    config: ConnectionConfig,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ViewClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewClient")
            .field("config", &self.config)
            .finish()
    }
}

impl ViewClient {
    pub fn new(config: ConnectionConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    /// One request/response round-trip: build, GET, translate the status,
    /// interpret the body. All data travels in the query string.
    async fn call(&self, action: ReportAction, opts: &ViewOptions) -> Result<ReportOutcome> {
        self.config.validate()?;
        let url = view_url(&self.config, action, opts)?;
        if self.config.debug {
            tracing::debug!("url: {}", masked_view_url(&self.config, action, opts)?);
        }

        let response = self.http.get(&url).await?;
        check_status(&response)?;

        if self.config.debug {
            tracing::debug!("raw response: {}", response.body);
        }
        Ok(interpret_report(&response.body, self.config.debug))
    }

    /// Acknowledge a host or service alert. The report that comes back may
    /// not say much.
    pub async fn acknowledge(&self, opts: &ViewOptions) -> Result<ReportOutcome> {
        self.call(ReportAction::Ack, opts).await
    }

    /// Schedule downtime for a host or service.
    pub async fn schedule_downtime(&self, opts: &ViewOptions) -> Result<ReportOutcome> {
        self.call(ReportAction::Downtime, opts).await
    }

    /// Fetch a host or service problem report.
    pub async fn report(&self, kind: ReportKind) -> Result<ReportOutcome> {
        let opts = ViewOptions {
            acknowledged: kind.acknowledged(),
            ..Default::default()
        };
        self.call(kind.action(), &opts).await
    }
}
