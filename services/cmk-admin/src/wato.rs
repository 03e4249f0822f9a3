//! WATO inventory pipeline client: host lifecycle, service discovery, and
//! change activation against the `webapi.py` endpoint.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::ConnectionConfig;
use crate::io::{check_status, HttpClient};
use crate::response::{interpret_inventory, InventoryOutcome};
use crate::urls::{inventory_url, masked_inventory_url, InventoryAction, InventoryOptions};
use crate::{CmkError, Result};

/// Attribute value that marks a field as intentionally absent
pub const UNSET: &str = "UNSET";

/// WATO folder hosts are filed under when the caller names none
const DEFAULT_FOLDER: &str = "cmk-admin-api";

/// Host attributes for create and update operations.
///
/// Fields set to the literal [`UNSET`] sentinel are treated the same as
/// absent ones, so callers can thread flag values through unchanged.
#[derive(Debug, Clone, Default)]
pub struct HostSpec {
    /// WATO folder to file the host under (create only; default:
    /// `cmk-admin-api`)
    pub folder: Option<String>,
    /// Role tag, stored as `tag_role`
    pub role: Option<String>,
    /// Instance tag, stored as `tag_instance`
    pub instance: Option<String>,
    /// IP address, stored as `ipaddress`
    pub ip: Option<String>,
    /// Additional shell-quoted `key=value` pairs, e.g. `color=red size=big`
    pub extra: Option<String>,
    /// Attribute names to clear (update only)
    pub unset: Vec<String>,
}

impl HostSpec {
    /// Build the attributes mapping: tag fields minus UNSET values, plus the
    /// parsed `extra` pairs. Later `extra` keys win on collision.
    fn attributes(&self) -> Result<Map<String, Value>> {
        let mut attributes = Map::new();

        for (key, value) in [
            ("tag_role", &self.role),
            ("tag_instance", &self.instance),
            ("ipaddress", &self.ip),
        ] {
            if let Some(value) = value {
                if value != UNSET {
                    attributes.insert(key.to_string(), Value::String(value.clone()));
                }
            }
        }

        if let Some(extra) = &self.extra {
            if extra != UNSET && extra.contains('=') {
                let tokens = shell_words::split(extra)
                    .map_err(|e| CmkError::InvalidParameter(format!("extra attributes: {}", e)))?;
                for token in tokens {
                    if let Some((key, value)) = token.split_once('=') {
                        attributes.insert(key.to_string(), Value::String(value.to_string()));
                    }
                }
            }
        }

        Ok(attributes)
    }
}

fn request_body(request: &Value) -> Result<String> {
    Ok(format!("request={}", serde_json::to_string(request)?))
}

/// Client for the WATO inventory endpoint
pub struct WatoClient {
    config: ConnectionConfig,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for WatoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatoClient")
            .field("config", &self.config)
            .finish()
    }
}

impl WatoClient {
    pub fn new(config: ConnectionConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    /// One request/response round-trip: build, POST, translate the status,
    /// interpret the body.
    async fn call(
        &self,
        action: InventoryAction,
        opts: &InventoryOptions,
        body: String,
    ) -> Result<InventoryOutcome> {
        self.config.validate()?;
        let url = inventory_url(&self.config, action, opts);
        if self.config.debug {
            tracing::debug!(
                "url: {}",
                masked_inventory_url(&self.config, action, opts)
            );
            tracing::debug!("request body: {}", body);
        }

        let response = self.http.post(&url, &body).await?;
        check_status(&response)?;

        if self.config.debug {
            tracing::debug!("raw response: {}", response.body);
        }
        Ok(interpret_inventory(&response.body, self.config.debug))
    }

    /// Activate pending configuration changes. This can be slow.
    pub async fn activate_changes(&self, foreign_ok: bool) -> Result<InventoryOutcome> {
        let opts = InventoryOptions {
            foreign_ok,
            ..Default::default()
        };
        self.call(InventoryAction::ActivateChanges, &opts, String::new())
            .await
    }

    /// Create a host entry.
    pub async fn create_host(
        &self,
        host: &str,
        spec: &HostSpec,
        create_folders: bool,
    ) -> Result<InventoryOutcome> {
        let request = json!({
            "hostname": host,
            "folder": spec.folder.as_deref().unwrap_or(DEFAULT_FOLDER),
            "attributes": spec.attributes()?,
        });
        let opts = InventoryOptions {
            create_folders,
            ..Default::default()
        };
        self.call(InventoryAction::AddHost, &opts, request_body(&request)?)
            .await
    }

    /// Get information about a host.
    pub async fn read_host(
        &self,
        host: &str,
        effective_attributes: Option<String>,
    ) -> Result<InventoryOutcome> {
        let request = json!({ "hostname": host });
        let opts = InventoryOptions {
            effective_attributes,
            ..Default::default()
        };
        self.call(InventoryAction::GetHost, &opts, request_body(&request)?)
            .await
    }

    /// Update a host, creating it when it does not exist yet.
    ///
    /// The preceding read is the only existence check: a failed read outcome
    /// (not a transport error) routes the whole call to [`create_host`]
    /// with the same arguments.
    ///
    /// [`create_host`]: WatoClient::create_host
    pub async fn update_host(
        &self,
        host: &str,
        spec: &HostSpec,
        create_folders: bool,
    ) -> Result<InventoryOutcome> {
        let existing = self.read_host(host, None).await?;
        if !existing.success {
            return self.create_host(host, spec, create_folders).await;
        }

        let mut request = json!({
            "hostname": host,
            "attributes": spec.attributes()?,
        });
        if !spec.unset.is_empty() {
            request["unset_attributes"] = json!(spec.unset);
        }
        self.call(
            InventoryAction::EditHost,
            &InventoryOptions::default(),
            request_body(&request)?,
        )
        .await
    }

    /// Remove a host.
    pub async fn delete_host(&self, host: &str) -> Result<InventoryOutcome> {
        let request = json!({ "hostname": host });
        self.call(
            InventoryAction::DeleteHost,
            &InventoryOptions::default(),
            request_body(&request)?,
        )
        .await
    }

    /// Scan a host for services.
    pub async fn discover_services(
        &self,
        host: &str,
        tabula_rasa: bool,
    ) -> Result<InventoryOutcome> {
        let request = json!({ "hostname": host });
        let opts = InventoryOptions {
            tabula_rasa,
            ..Default::default()
        };
        self.call(
            InventoryAction::DiscoverServices,
            &opts,
            request_body(&request)?,
        )
        .await
    }

    /// List all hosts.
    pub async fn list_hosts(&self) -> Result<InventoryOutcome> {
        self.call(
            InventoryAction::GetAllHosts,
            &InventoryOptions::default(),
            String::new(),
        )
        .await
    }

    /// List all hosts whose `site` attribute equals the given filter.
    ///
    /// The server does no filtering here; entries are stripped client-side
    /// and surviving ones keep all their fields.
    pub async fn list_hosts_filtered(&self, site: &str) -> Result<InventoryOutcome> {
        let mut outcome = self.list_hosts().await?;
        if let Some(Value::Object(hosts)) = outcome.payload.as_mut() {
            hosts.retain(|_, details| {
                details
                    .get("attributes")
                    .and_then(|attributes| attributes.get("site"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    == site
            });
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn test_config() -> ConnectionConfig {
        ConnectionConfig {
            server: "mon1.example.com".to_string(),
            site: "prod".to_string(),
            user: "automation".to_string(),
            apikey: "sekrit-key".to_string(),
            debug: false,
        }
    }

    fn ok_response(result: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: format!(r#"{{"result_code":0,"result":{result}}}"#),
        }
    }

    fn failed_response(result: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: format!(r#"{{"result_code":1,"result":{result}}}"#),
        }
    }

    fn body_json(body: &str) -> Value {
        let json = body.strip_prefix("request=").expect("request= prefix");
        serde_json::from_str(json).expect("valid request JSON")
    }

    #[test]
    fn attributes_skip_unset_and_merge_extra() {
        let spec = HostSpec {
            role: Some(UNSET.to_string()),
            instance: Some("db".to_string()),
            extra: Some("color=red size=big".to_string()),
            ..Default::default()
        };
        let attributes = spec.attributes().unwrap();
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes["tag_instance"], "db");
        assert_eq!(attributes["color"], "red");
        assert_eq!(attributes["size"], "big");
        assert!(!attributes.contains_key("tag_role"));
    }

    #[test]
    fn attributes_extra_respects_shell_quoting_and_later_keys_win() {
        let spec = HostSpec {
            extra: Some(r#"alias="web frontend" alias=web2"#.to_string()),
            ..Default::default()
        };
        let attributes = spec.attributes().unwrap();
        assert_eq!(attributes["alias"], "web2");

        let spec = HostSpec {
            extra: Some(r#"note="two words""#.to_string()),
            ..Default::default()
        };
        let attributes = spec.attributes().unwrap();
        assert_eq!(attributes["note"], "two words");
    }

    #[test]
    fn attributes_extra_without_equals_is_ignored() {
        let spec = HostSpec {
            ip: Some("10.0.0.1".to_string()),
            extra: Some("justaword".to_string()),
            ..Default::default()
        };
        let attributes = spec.attributes().unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes["ipaddress"], "10.0.0.1");
    }

    #[test]
    fn attributes_extra_with_broken_quoting_is_an_error() {
        let spec = HostSpec {
            extra: Some(r#"note="unterminated"#.to_string()),
            ..Default::default()
        };
        let err = spec.attributes().unwrap_err();
        assert!(matches!(err, CmkError::InvalidParameter(_)), "{err:?}");
    }

    #[tokio::test]
    async fn create_host_posts_the_expected_request() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url, body| {
                let request = body_json(body);
                url.contains("action=add_host")
                    && url.ends_with("_secret=sekrit-key")
                    && request["hostname"] == "h1"
                    && request["folder"] == "cmk-admin-api"
                    && request["attributes"]["tag_instance"] == "db"
                    && request["attributes"]["color"] == "red"
                    && request["attributes"]["size"] == "big"
                    && request["attributes"].get("tag_role").is_none()
            })
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        let spec = HostSpec {
            role: Some(UNSET.to_string()),
            instance: Some("db".to_string()),
            extra: Some("color=red size=big".to_string()),
            ..Default::default()
        };
        let outcome = client.create_host("h1", &spec, false).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn create_host_honors_folder_and_create_folders_flag() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url, body| {
                url.contains("create_folders=0") && body_json(body)["folder"] == "ops/web"
            })
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        let spec = HostSpec {
            folder: Some("ops/web".to_string()),
            ..Default::default()
        };
        client.create_host("h1", &spec, true).await.unwrap();
    }

    #[tokio::test]
    async fn update_host_falls_back_to_create_when_the_read_fails() {
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_post()
            .once()
            .in_sequence(&mut seq)
            .withf(|url, body| {
                url.contains("action=get_host") && body_json(body)["hostname"] == "h1"
            })
            .returning(|_, _| Box::pin(async { Ok(failed_response(r#""no such host""#)) }));
        mock.expect_post()
            .once()
            .in_sequence(&mut seq)
            .withf(|url, body| {
                url.contains("action=add_host") && body_json(body)["hostname"] == "h1"
            })
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        let spec = HostSpec {
            instance: Some("db".to_string()),
            ..Default::default()
        };
        let outcome = client.update_host("h1", &spec, false).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn update_host_edits_when_the_read_succeeds() {
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_post()
            .once()
            .in_sequence(&mut seq)
            .withf(|url, _| url.contains("action=get_host"))
            .returning(|_, _| Box::pin(async { Ok(ok_response(r#"{"attributes":{}}"#)) }));
        mock.expect_post()
            .once()
            .in_sequence(&mut seq)
            .withf(|url, body| {
                let request = body_json(body);
                url.contains("action=edit_host")
                    && request["attributes"]["tag_instance"] == "db"
                    && request["unset_attributes"] == serde_json::json!(["tag_role"])
            })
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        let spec = HostSpec {
            instance: Some("db".to_string()),
            unset: vec!["tag_role".to_string()],
            ..Default::default()
        };
        client.update_host("h1", &spec, false).await.unwrap();
    }

    #[tokio::test]
    async fn update_host_without_unset_omits_unset_attributes() {
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_post()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Box::pin(async { Ok(ok_response("{}")) }));
        mock.expect_post()
            .once()
            .in_sequence(&mut seq)
            .withf(|url, body| {
                url.contains("action=edit_host")
                    && body_json(body).get("unset_attributes").is_none()
            })
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        client
            .update_host("h1", &HostSpec::default(), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_host_propagates_transport_errors_from_the_read() {
        let mut mock = MockHttpClient::new();
        mock.expect_post().once().returning(|_, _| {
            Box::pin(async { Err(CmkError::UrlError("connection refused".to_string())) })
        });

        let client = WatoClient::new(test_config(), Arc::new(mock));
        let err = client
            .update_host("h1", &HostSpec::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CmkError::UrlError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn delete_host_posts_the_hostname() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url, body| {
                url.contains("action=delete_host") && body_json(body)["hostname"] == "h1"
            })
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        client.delete_host("h1").await.unwrap();
    }

    #[tokio::test]
    async fn discover_services_tabula_rasa_requests_a_refresh() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url, _| url.contains("action=discover_services") && url.contains("mode=refresh"))
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        client.discover_services("h1", true).await.unwrap();
    }

    #[tokio::test]
    async fn activate_changes_posts_an_empty_body() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url, body| {
                url.contains("action=activate_changes")
                    && url.contains("mode=dirty")
                    && url.contains("allow_foreign_changes=1")
                    && body.is_empty()
            })
            .returning(|_, _| Box::pin(async { Ok(ok_response("null")) }));

        let client = WatoClient::new(test_config(), Arc::new(mock));
        client.activate_changes(true).await.unwrap();
    }

    #[tokio::test]
    async fn list_hosts_filtered_keeps_only_the_matching_site() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url, _| url.contains("action=get_all_hosts"))
            .returning(|_, _| {
                Box::pin(async {
                    Ok(ok_response(
                        r#"{
                            "h1": {"attributes": {"site": "siteA", "ipaddress": "10.0.0.1"}},
                            "h2": {"attributes": {"site": "siteB"}},
                            "h3": {"attributes": {}}
                        }"#,
                    ))
                })
            });

        let client = WatoClient::new(test_config(), Arc::new(mock));
        let outcome = client.list_hosts_filtered("siteA").await.unwrap();
        assert!(outcome.success);
        let hosts = outcome.payload.unwrap();
        let hosts = hosts.as_object().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts["h1"]["attributes"]["ipaddress"], "10.0.0.1");
    }

    #[tokio::test]
    async fn http_statuses_map_to_the_error_taxonomy() {
        for (status, check) in [
            (404, CmkError::PageNotFound),
            (403, CmkError::AccessDenied),
            (500, CmkError::HttpError(500)),
        ] {
            let mut mock = MockHttpClient::new();
            mock.expect_post().returning(move |_, _| {
                Box::pin(async move {
                    Ok(HttpResponse {
                        status,
                        body: String::new(),
                    })
                })
            });

            let client = WatoClient::new(test_config(), Arc::new(mock));
            let err = client.list_hosts().await.unwrap_err();
            assert_eq!(
                std::mem::discriminant(&err),
                std::mem::discriminant(&check),
                "{err:?}"
            );
        }
    }

    #[tokio::test]
    async fn empty_config_is_rejected_before_any_request() {
        let mock = MockHttpClient::new();
        let config = ConnectionConfig {
            server: String::new(),
            site: "prod".to_string(),
            user: "automation".to_string(),
            apikey: "sekrit".to_string(),
            debug: false,
        };
        let client = WatoClient::new(config, Arc::new(mock));
        let err = client.list_hosts().await.unwrap_err();
        assert!(matches!(err, CmkError::InvalidParameter(_)), "{err:?}");
    }
}
