//! cmk-admin CLI
//!
//! One subcommand per web-API operation. Connection defaults come from a
//! YAML file and can be overridden per flag; exit code is 0 only when the
//! server reports success.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use cmk_admin::{
    load_config, CmkError, ConnectionConfig, FileConfig, HostSpec, InventoryOutcome, ReportKind,
    ReportOutcome, ReqwestHttpClient, TargetType, ViewClient, ViewOptions, WatoClient,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "cmk-admin")]
#[command(about = "Check_MK remote administration client")]
#[command(version)]
struct Args {
    /// Path to the YAML configuration file with connection defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Monitoring server host name
    #[arg(long)]
    server: Option<String>,

    /// OMD site name
    #[arg(long)]
    site: Option<String>,

    /// Web-API user name
    #[arg(long)]
    user: Option<String>,

    /// Automation secret for the web-API user
    #[arg(long)]
    apikey: Option<String>,

    /// Echo the outbound request (key masked) and the raw response
    #[arg(long)]
    debug: bool,

    /// Log level (forced to debug when --debug is set)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a host entry
    AddHost {
        host: String,

        /// WATO folder to file the host under
        #[arg(long)]
        folder: Option<String>,

        /// Role tag
        #[arg(long)]
        role: Option<String>,

        /// Instance tag
        #[arg(long)]
        instance: Option<String>,

        /// IP address
        #[arg(long)]
        ip: Option<String>,

        /// Additional shell-quoted key=value attribute pairs
        #[arg(long)]
        extra: Option<String>,

        /// Switch off server-side folder auto-creation
        #[arg(long)]
        create_folders: bool,
    },

    /// Update a host entry, creating it when absent
    UpdateHost {
        host: String,

        /// Role tag
        #[arg(long)]
        role: Option<String>,

        /// Instance tag
        #[arg(long)]
        instance: Option<String>,

        /// IP address
        #[arg(long)]
        ip: Option<String>,

        /// Additional shell-quoted key=value attribute pairs
        #[arg(long)]
        extra: Option<String>,

        /// Attribute name to clear (repeatable)
        #[arg(long)]
        unset: Vec<String>,

        /// Switch off server-side folder auto-creation (create path only)
        #[arg(long)]
        create_folders: bool,
    },

    /// Remove a host entry
    DeleteHost { host: String },

    /// Show a host entry
    GetHost {
        host: String,

        /// Include attributes inherited from folders and tags
        #[arg(long)]
        effective_attributes: bool,
    },

    /// List all host entries
    ListHosts {
        /// Only show hosts whose site attribute matches
        #[arg(long)]
        site: Option<String>,
    },

    /// Scan a host for services
    Discover {
        host: String,

        /// Drop the current service list and re-scan from scratch
        #[arg(long)]
        tabula_rasa: bool,
    },

    /// Activate pending configuration changes
    Activate {
        /// Also activate changes made by other users
        #[arg(long)]
        foreign_ok: bool,
    },

    /// Acknowledge a host or service alert
    Ack {
        host: String,

        /// Target type: host, service (or svc)
        #[arg(long = "type", default_value = "host")]
        target: String,

        /// Service description, for service targets
        #[arg(long)]
        service: Option<String>,

        /// Acknowledgement comment
        #[arg(long)]
        comment: String,
    },

    /// Schedule downtime for a host or service
    Downtime {
        host: String,

        /// Target type: host, service (or svc)
        #[arg(long = "type", default_value = "host")]
        target: String,

        /// Service description, for service targets
        #[arg(long)]
        service: Option<String>,

        /// Downtime comment
        #[arg(long)]
        comment: String,

        /// Start of the window, "YYYY-MM-DD HH:MM" (default: now)
        #[arg(long)]
        start: Option<String>,

        /// End of the window, "YYYY-MM-DD HH:MM"
        #[arg(long)]
        end: Option<String>,

        /// Window length in hours, used when no end is given
        #[arg(long)]
        hours: Option<i64>,
    },

    /// Fetch a problem report
    Report {
        /// One of: host, host_ack, host_unack, hostservice, svc_ack, svc_unack
        kind: String,
    },
}

fn parse_timestamp(value: &str) -> cmk_admin::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .map_err(|e| CmkError::InvalidParameter(format!("timestamp '{}': {}", value, e)))
}

fn connection(args: &Args) -> Result<ConnectionConfig, Box<dyn std::error::Error>> {
    let file = match &args.config {
        Some(path) => {
            tracing::debug!("loading configuration from {:?}", path);
            load_config(path)?
        }
        None => FileConfig::default(),
    };
    let config = file.merge(
        args.server.clone(),
        args.site.clone(),
        args.user.clone(),
        args.apikey.clone(),
        args.debug,
    );
    config.validate()?;
    Ok(config)
}

/// Print the payload (if any) and report whether the server said yes.
fn finish_inventory(outcome: InventoryOutcome) -> cmk_admin::Result<bool> {
    if let Some(payload) = &outcome.payload {
        println!("{}", serde_json::to_string_pretty(payload)?);
    }
    Ok(outcome.success)
}

fn finish_report(outcome: ReportOutcome) -> cmk_admin::Result<bool> {
    match outcome {
        ReportOutcome::Rows(rows) => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        ReportOutcome::Message(line) => {
            println!("{}", line);
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.debug {
        Level::DEBUG
    } else {
        args.log_level
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = connection(&args)?;
    let http = Arc::new(ReqwestHttpClient::default());

    let ok = run(args.command, config, http).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: Commands,
    config: ConnectionConfig,
    http: Arc<ReqwestHttpClient>,
) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Commands::AddHost {
            host,
            folder,
            role,
            instance,
            ip,
            extra,
            create_folders,
        } => {
            let wato = WatoClient::new(config, http);
            let spec = HostSpec {
                folder,
                role,
                instance,
                ip,
                extra,
                unset: Vec::new(),
            };
            let outcome = wato.create_host(&host, &spec, create_folders).await?;
            Ok(finish_inventory(outcome)?)
        }
        Commands::UpdateHost {
            host,
            role,
            instance,
            ip,
            extra,
            unset,
            create_folders,
        } => {
            let wato = WatoClient::new(config, http);
            let spec = HostSpec {
                folder: None,
                role,
                instance,
                ip,
                extra,
                unset,
            };
            let outcome = wato.update_host(&host, &spec, create_folders).await?;
            Ok(finish_inventory(outcome)?)
        }
        Commands::DeleteHost { host } => {
            let wato = WatoClient::new(config, http);
            let outcome = wato.delete_host(&host).await?;
            Ok(finish_inventory(outcome)?)
        }
        Commands::GetHost {
            host,
            effective_attributes,
        } => {
            let wato = WatoClient::new(config, http);
            let effective = effective_attributes.then(|| "1".to_string());
            let outcome = wato.read_host(&host, effective).await?;
            Ok(finish_inventory(outcome)?)
        }
        Commands::ListHosts { site } => {
            let wato = WatoClient::new(config, http);
            let outcome = match site {
                Some(site) => wato.list_hosts_filtered(&site).await?,
                None => wato.list_hosts().await?,
            };
            Ok(finish_inventory(outcome)?)
        }
        Commands::Discover { host, tabula_rasa } => {
            let wato = WatoClient::new(config, http);
            let outcome = wato.discover_services(&host, tabula_rasa).await?;
            Ok(finish_inventory(outcome)?)
        }
        Commands::Activate { foreign_ok } => {
            let wato = WatoClient::new(config, http);
            let outcome = wato.activate_changes(foreign_ok).await?;
            Ok(finish_inventory(outcome)?)
        }
        Commands::Ack {
            host,
            target,
            service,
            comment,
        } => {
            let view = ViewClient::new(config, http);
            let opts = ViewOptions {
                target: Some(target.parse::<TargetType>()?),
                host: Some(host),
                service,
                comment: Some(comment),
                ..Default::default()
            };
            let outcome = view.acknowledge(&opts).await?;
            Ok(finish_report(outcome)?)
        }
        Commands::Downtime {
            host,
            target,
            service,
            comment,
            start,
            end,
            hours,
        } => {
            let view = ViewClient::new(config, http);
            let opts = ViewOptions {
                target: Some(target.parse::<TargetType>()?),
                host: Some(host),
                service,
                comment: Some(comment),
                start: start.as_deref().map(parse_timestamp).transpose()?,
                end: end.as_deref().map(parse_timestamp).transpose()?,
                hours,
                ..Default::default()
            };
            let outcome = view.schedule_downtime(&opts).await?;
            Ok(finish_report(outcome)?)
        }
        Commands::Report { kind } => {
            let view = ViewClient::new(config, http);
            let outcome = view.report(kind.parse::<ReportKind>()?).await?;
            Ok(finish_report(outcome)?)
        }
    }
}
