//! URL construction for both Check_MK web-API pipelines.
//!
//! The WATO inventory endpoint (`webapi.py`) takes `&`-joined raw tokens
//! with the request payload in a POST body; the view endpoint (`view.py`)
//! takes a percent-encoded query string and no body. Both builders have a
//! masked twin that renders the same request with the automation secret
//! replaced by `...` for debug echoes.

use chrono::{Duration, Local, NaiveDateTime};

use crate::config::ConnectionConfig;
use crate::{CmkError, Result};

/// Mask used in place of the automation secret in debug renderings
const SECRET_MASK: &str = "...";

// ============================================================================
// Inventory pipeline (webapi.py)
// ============================================================================

/// Actions understood by the WATO inventory endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryAction {
    ActivateChanges,
    AddHost,
    DeleteHost,
    DiscoverServices,
    EditHost,
    GetAllHosts,
    GetHost,
}

impl InventoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryAction::ActivateChanges => "activate_changes",
            InventoryAction::AddHost => "add_host",
            InventoryAction::DeleteHost => "delete_host",
            InventoryAction::DiscoverServices => "discover_services",
            InventoryAction::EditHost => "edit_host",
            InventoryAction::GetAllHosts => "get_all_hosts",
            InventoryAction::GetHost => "get_host",
        }
    }
}

impl std::fmt::Display for InventoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InventoryAction {
    type Err = CmkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "activate_changes" => Ok(InventoryAction::ActivateChanges),
            "add_host" => Ok(InventoryAction::AddHost),
            "delete_host" => Ok(InventoryAction::DeleteHost),
            "discover_services" => Ok(InventoryAction::DiscoverServices),
            "edit_host" => Ok(InventoryAction::EditHost),
            "get_all_hosts" => Ok(InventoryAction::GetAllHosts),
            "get_host" => Ok(InventoryAction::GetHost),
            _ => Err(CmkError::InvalidAction(s.to_string())),
        }
    }
}

/// Optional modifiers for inventory requests. Each field is consumed by
/// exactly one action and ignored by the rest.
#[derive(Debug, Clone, Default)]
pub struct InventoryOptions {
    /// `activate_changes`: also activate changes made by other users
    /// (default: off)
    pub foreign_ok: bool,
    /// `add_host`: when set, emits `create_folders=0`, switching folder
    /// auto-creation OFF on the server. The token value is inverted relative
    /// to the flag name; kept bit-for-bit for wire compatibility with every
    /// historical client version (default: off)
    pub create_folders: bool,
    /// `discover_services`: throw away the current service list and re-scan
    /// from scratch (`mode=refresh`) (default: off)
    pub tabula_rasa: bool,
    /// `get_host`: request folder/tag-inherited attributes with the given
    /// value (default: absent)
    pub effective_attributes: Option<String>,
}

fn inventory_tokens(
    config: &ConnectionConfig,
    action: InventoryAction,
    opts: &InventoryOptions,
) -> Vec<String> {
    let mut parts = vec![format!(
        "https://{}/{}/check_mk/webapi.py?_username={}",
        config.server, config.site, config.user
    )];
    parts.push(format!("action={}", action.as_str()));

    match action {
        InventoryAction::ActivateChanges => {
            parts.push("mode=dirty".to_string());
            if opts.foreign_ok {
                parts.push("allow_foreign_changes=1".to_string());
            }
        }
        InventoryAction::AddHost => {
            if opts.create_folders {
                parts.push("create_folders=0".to_string());
            }
        }
        InventoryAction::DiscoverServices => {
            if opts.tabula_rasa {
                parts.push("mode=refresh".to_string());
            }
        }
        InventoryAction::GetHost => {
            if let Some(value) = &opts.effective_attributes {
                parts.push(format!("effective_attributes={}", value));
            }
        }
        InventoryAction::DeleteHost | InventoryAction::EditHost | InventoryAction::GetAllHosts => {}
    }

    parts
}

/// Build the webapi.py request URL. The secret is always the last token so
/// it stays out of every other rendering.
pub fn inventory_url(
    config: &ConnectionConfig,
    action: InventoryAction,
    opts: &InventoryOptions,
) -> String {
    let mut parts = inventory_tokens(config, action, opts);
    parts.push(format!("_secret={}", config.apikey));
    parts.join("&")
}

/// Same token list with the secret masked; safe to log.
pub fn masked_inventory_url(
    config: &ConnectionConfig,
    action: InventoryAction,
    opts: &InventoryOptions,
) -> String {
    let mut parts = inventory_tokens(config, action, opts);
    parts.push(format!("_secret={}", SECRET_MASK));
    parts.join("&")
}

// ============================================================================
// Report/action pipeline (view.py)
// ============================================================================

/// Actions understood by the view endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    Ack,
    Downtime,
    HostReport,
    SvcReport,
}

impl std::str::FromStr for ReportAction {
    type Err = CmkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ack" => Ok(ReportAction::Ack),
            "downtime" => Ok(ReportAction::Downtime),
            "hostreport" => Ok(ReportAction::HostReport),
            "svcreport" => Ok(ReportAction::SvcReport),
            _ => Err(CmkError::InvalidAction(s.to_string())),
        }
    }
}

/// What an acknowledgement or downtime applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Host,
    Service,
}

impl std::str::FromStr for TargetType {
    type Err = CmkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "host" => Ok(TargetType::Host),
            // 'svc' is a long-standing operator shorthand
            "service" | "svc" => Ok(TargetType::Service),
            _ => Err(CmkError::InvalidTargetType(s.to_string())),
        }
    }
}

/// Optional parameters for view.py requests. Each field is consumed only by
/// the actions named on it.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    /// `hostreport`/`svcreport`: restrict to acknowledged (true) or
    /// unacknowledged (false) alerts (default: no filter)
    pub acknowledged: Option<bool>,
    /// `ack`/`downtime`: what the host/service pair identifies (required for
    /// those actions)
    pub target: Option<TargetType>,
    /// `ack`/`downtime`: host name (required for those actions)
    pub host: Option<String>,
    /// `ack`/`downtime`: service description, required for service targets
    pub service: Option<String>,
    /// `ack`/`downtime`: operator comment (required for those actions)
    pub comment: Option<String>,
    /// `downtime`: start of the window (default: now)
    pub start: Option<NaiveDateTime>,
    /// `downtime`: explicit end of the window
    pub end: Option<NaiveDateTime>,
    /// `downtime`: window length in hours, used when no explicit end is given
    pub hours: Option<i64>,
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| CmkError::InvalidParameter(format!("{name} is not set")))
}

/// Append the host/service identifiers and matching view_name for an ack or
/// downtime command.
fn push_target(pairs: &mut Vec<(&'static str, String)>, opts: &ViewOptions) -> Result<()> {
    let host = required(&opts.host, "host")?;
    match opts.target {
        Some(TargetType::Host) => {
            pairs.push(("host", host));
            pairs.push(("view_name", "hoststatus".to_string()));
        }
        Some(TargetType::Service) => {
            pairs.push(("host", host));
            pairs.push(("service", required(&opts.service, "service")?));
            pairs.push(("view_name", "service".to_string()));
        }
        None => {
            return Err(CmkError::InvalidParameter(
                "target type is not set".to_string(),
            ))
        }
    }
    Ok(())
}

fn view_pairs(
    config: &ConnectionConfig,
    action: ReportAction,
    opts: &ViewOptions,
) -> Result<Vec<(&'static str, String)>> {
    let mut pairs = vec![
        ("_username", config.user.clone()),
        ("_secret", config.apikey.clone()),
        ("output_format", "json".to_string()),
    ];

    match action {
        ReportAction::HostReport => {
            pairs.push(("view_name", "hostproblems_expanded".to_string()));
            if let Some(ack) = opts.acknowledged {
                pairs.push(("is_host_acknowledged", flag(ack)));
            }
        }
        ReportAction::SvcReport => {
            pairs.push(("view_name", "svcproblems_expanded".to_string()));
            if let Some(ack) = opts.acknowledged {
                pairs.push(("is_service_acknowledged", flag(ack)));
            }
        }
        ReportAction::Downtime => {
            push_confirmation(&mut pairs);

            let start = opts.start.unwrap_or_else(|| Local::now().naive_local());
            let end = match (opts.end, opts.hours) {
                (Some(end), _) => end,
                (None, Some(hours)) => start + Duration::hours(hours),
                (None, None) => {
                    return Err(CmkError::InvalidParameter(
                        "downtime needs an end time or an hour count".to_string(),
                    ))
                }
            };

            pairs.push(("_down_custom", "Custom+time_range".to_string()));
            pairs.push(("_down_from_date", start.format("%Y-%m-%d").to_string()));
            pairs.push(("_down_from_time", start.format("%H:%M").to_string()));
            pairs.push(("_down_to_date", end.format("%Y-%m-%d").to_string()));
            pairs.push(("_down_to_time", end.format("%H:%M").to_string()));
            pairs.push(("_down_comment", required(&opts.comment, "comment")?));

            push_target(&mut pairs, opts)?;
        }
        ReportAction::Ack => {
            push_confirmation(&mut pairs);

            pairs.push(("_ack_comment", required(&opts.comment, "comment")?));
            pairs.push(("_acknowledge", "Acknowledge".to_string()));

            push_target(&mut pairs, opts)?;
        }
    }

    Ok(pairs)
}

/// Transaction-confirmation triple shared by ack and downtime commands
fn push_confirmation(pairs: &mut Vec<(&'static str, String)>) {
    pairs.push(("_transid", "-1".to_string()));
    pairs.push(("_do_confirm", "yes".to_string()));
    pairs.push(("_do_actions", "yes".to_string()));
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn encode_pairs(pairs: &[(&'static str, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the view.py request URL with a percent-encoded query string.
///
/// Construction can fail before any I/O: a downtime with neither an end time
/// nor an hour count, or an ack/downtime without host/comment/target, never
/// reaches the network.
pub fn view_url(
    config: &ConnectionConfig,
    action: ReportAction,
    opts: &ViewOptions,
) -> Result<String> {
    let pairs = view_pairs(config, action, opts)?;
    Ok(format!(
        "https://{}/{}/check_mk/view.py?{}",
        config.server,
        config.site,
        encode_pairs(&pairs)
    ))
}

/// Same query string with the secret masked; safe to log.
pub fn masked_view_url(
    config: &ConnectionConfig,
    action: ReportAction,
    opts: &ViewOptions,
) -> Result<String> {
    let mut pairs = view_pairs(config, action, opts)?;
    for (key, value) in pairs.iter_mut() {
        if *key == "_secret" {
            *value = SECRET_MASK.to_string();
        }
    }
    Ok(format!(
        "https://{}/{}/check_mk/view.py?{}",
        config.server,
        config.site,
        encode_pairs(&pairs)
    ))
}
