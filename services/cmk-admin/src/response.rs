//! Response interpretation for both pipelines.
//!
//! The server does not always honor `output_format=json`: partial failures
//! come back as an HTML error page or, on the view endpoint, a bare
//! `MESSAGE:` status line. Those shapes are interpreted here as soft
//! outcomes — logged and returned as data, never raised — so callers decide
//! whether "could not parse" is fatal.

use serde::Deserialize;
use serde_json::Value;

/// Outcome of an inventory (webapi.py) call. Either a well-formed payload or
/// an explicit failure marker, never partially filled.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryOutcome {
    pub success: bool,
    pub payload: Option<Value>,
}

impl InventoryOutcome {
    fn failed() -> Self {
        InventoryOutcome {
            success: false,
            payload: None,
        }
    }
}

/// Outcome of a report (view.py) call. The two variants are deliberately
/// distinct shapes; callers must match.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// Table rows with the header row stripped, in server order
    Rows(Vec<Value>),
    /// Bare status line the server sometimes returns instead of a table
    Message(String),
}

/// The `{result_code, result}` envelope wrapped around every inventory
/// response
#[derive(Debug, Deserialize)]
struct Envelope {
    result_code: i64,
    #[serde(default)]
    result: Value,
}

/// Extract the text of an error `div` from an HTML error page, if the body
/// contains one. Kept separate from the JSON paths so the fallback can be
/// swapped without touching them.
fn error_div_text(body: &str) -> Option<String> {
    let re = regex::Regex::new(r#"(?is)<div[^>]*class="[^"]*error[^"]*"[^>]*>(.*?)</div>"#).ok()?;
    let caps = re.captures(body)?;
    let text = caps.get(1)?.as_str().trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn log_unparseable(body: &str) {
    match error_div_text(body) {
        Some(text) => tracing::error!("server returned an error page: {}", text),
        None => tracing::error!(
            "response is neither JSON nor a recognizable error page: {}",
            body
        ),
    }
}

/// Interpret an inventory response body.
///
/// `result_code == 0` is the only success signal; any other code carries the
/// result payload as failure detail. Unparseable bodies are soft failures.
pub fn interpret_inventory(body: &str, debug: bool) -> InventoryOutcome {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) => {
            log_unparseable(body);
            return InventoryOutcome::failed();
        }
    };

    if debug {
        if let Ok(pretty) = serde_json::to_string_pretty(&envelope.result) {
            tracing::debug!("result payload:\n{}", pretty);
        }
    }

    if envelope.result_code == 0 {
        InventoryOutcome {
            success: true,
            payload: Some(envelope.result),
        }
    } else {
        if debug {
            tracing::debug!("result code was: {}", envelope.result_code);
        }
        InventoryOutcome {
            success: false,
            payload: Some(envelope.result),
        }
    }
}

/// Interpret a report response body.
///
/// A JSON array is a table dump whose first row names the columns; the rest
/// come back verbatim, order preserved. A body whose first line starts with
/// `MESSAGE: ` is a status line. Anything else is logged and yields an empty
/// row set.
pub fn interpret_report(body: &str, debug: bool) -> ReportOutcome {
    let mut rows: Vec<Value> = match serde_json::from_str(body) {
        Ok(rows) => rows,
        Err(_) => {
            let first_line = body.lines().next().unwrap_or("");
            if first_line.starts_with("MESSAGE: ") {
                return ReportOutcome::Message(first_line.to_string());
            }
            log_unparseable(body);
            return ReportOutcome::Rows(Vec::new());
        }
    };

    if debug {
        if let Ok(pretty) = serde_json::to_string_pretty(&rows) {
            tracing::debug!("report rows:\n{}", pretty);
        }
    }

    // header-only or empty: nothing matched
    if rows.len() <= 1 {
        return ReportOutcome::Rows(Vec::new());
    }

    rows.remove(0);
    ReportOutcome::Rows(rows)
}
