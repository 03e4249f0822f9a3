//! cmk-admin - Check_MK remote administration client
//!
//! Talks to a Check_MK site's WATO web API (host inventory, service
//! discovery, change activation) and its view API (alert acknowledgement,
//! downtime scheduling, problem reports). Each operation issues exactly one
//! blocking round-trip; there is no retry, caching, or shared state.

pub mod config;
pub mod error;
pub mod io;
pub mod response;
pub mod urls;
pub mod view;
pub mod wato;

pub use config::{load_config, ConnectionConfig, FileConfig};
pub use error::{CmkError, Result};
pub use io::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use response::{InventoryOutcome, ReportOutcome};
pub use urls::{InventoryAction, InventoryOptions, ReportAction, TargetType, ViewOptions};
pub use view::{ReportKind, ViewClient};
pub use wato::{HostSpec, WatoClient, UNSET};
