use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{error::TransportError, queue::Properties};

pub const REQUESTED_BY_HEADER: &str = "X-Requested-By";
pub const DEFAULT_REQUESTED_BY: &str = "view-capacity-scheduler";
pub const CONFIG_TYPE: &str = "capacity-scheduler";

#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub user: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Full URL of the scheduler configuration resource.
    pub base_url: String,
    pub requested_by: String,
    pub basic_auth: Option<BasicAuth>,
    pub connect_timeout: Duration,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            requested_by: DEFAULT_REQUESTED_BY.to_string(),
            basic_auth: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Thin HTTP wrapper over the scheduler configuration resource of one view instance.
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    base: String,
    requested_by: String,
    basic_auth: Option<BasicAuth>,
    client: reqwest::Client,
}

impl SchedulerClient {
    pub fn new(options: ClientOptions) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("capsched/{}", crate::version::VERSION))
            .connect_timeout(options.connect_timeout)
            .build()?;
        Ok(Self {
            base: options.base_url.trim_end_matches('/').to_string(),
            requested_by: options.requested_by,
            basic_auth: options.basic_auth,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        for s in segments {
            url.push('/');
            url.push_str(s.trim_matches('/'));
        }
        url
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        debug!(%method, %url, "scheduler request");
        let req = self
            .client
            .request(method, url)
            .header(REQUESTED_BY_HEADER, &self.requested_by);
        match &self.basic_auth {
            Some(auth) => req.basic_auth(&auth.user, auth.password.as_deref()),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        Err(TransportError::Http {
            status: status.as_u16(),
            body: error_body(resp.text().await),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, TransportError> {
        let req = self.request(reqwest::Method::GET, self.url(segments));
        Ok(self.send(req).await?.json::<T>().await?)
    }

    pub async fn get_configuration(&self) -> Result<ConfigurationItem, TransportError> {
        self.get_json::<ConfigurationResponse>(&[])
            .await?
            .into_first()
    }

    pub async fn get_configuration_by_tag(
        &self,
        tag: &str,
    ) -> Result<ConfigurationItem, TransportError> {
        let mut item = self
            .get_json::<ConfigurationResponse>(&["byTag", tag])
            .await?
            .into_first()?;
        if item.tag.is_empty() {
            item.tag = tag.to_string();
        }
        Ok(item)
    }

    /// Full replace of the `capacity-scheduler` config type. Returns the applied configs
    /// echoed back by the service.
    pub async fn put_configuration(
        &self,
        tag: &str,
        note: Option<&str>,
        properties: &Properties,
    ) -> Result<Properties, TransportError> {
        let body = DesiredConfigRequest {
            clusters: DesiredConfigs {
                desired_config: vec![DesiredConfig {
                    kind: CONFIG_TYPE,
                    tag,
                    service_config_version_note: note,
                    properties,
                }],
            },
        };
        let req = self
            .request(reqwest::Method::PUT, self.url(&[]))
            .json(&body);
        self.send(req)
            .await?
            .json::<UpdateResponse>()
            .await?
            .into_configs()
    }

    /// Activation signal for a change staged by a previous update.
    pub async fn put_save(&self, marker: &str) -> Result<(), TransportError> {
        let req = self
            .request(reqwest::Method::PUT, self.url(&[marker]))
            .json(&serde_json::json!({ "save": true }));
        self.send(req).await?;
        Ok(())
    }

    pub async fn get_node_labels(&self) -> Result<serde_json::Value, TransportError> {
        self.get_json(&["nodeLabels"]).await
    }

    pub async fn get_privilege(&self) -> Result<serde_json::Value, TransportError> {
        self.get_json(&["privilege"]).await
    }

    pub async fn get_all_tags(&self) -> Result<serde_json::Value, TransportError> {
        self.get_json(&["all"]).await
    }
}

fn error_body(text: Result<String, reqwest::Error>) -> String {
    match text {
        Ok(body) => body.trim().to_string(),
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

#[derive(Debug, Deserialize)]
struct ConfigurationResponse {
    #[serde(default)]
    items: Vec<ConfigurationItem>,
}

impl ConfigurationResponse {
    fn into_first(self) -> Result<ConfigurationItem, TransportError> {
        self.items
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::decode("configuration response has no items"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationItem {
    #[serde(default)]
    pub tag: String,
    #[serde(rename = "Config", default)]
    pub config: ItemConfig,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemConfig {
    #[serde(default)]
    pub cluster_name: String,
}

#[derive(Debug, Serialize)]
struct DesiredConfigRequest<'a> {
    #[serde(rename = "Clusters")]
    clusters: DesiredConfigs<'a>,
}

#[derive(Debug, Serialize)]
struct DesiredConfigs<'a> {
    desired_config: Vec<DesiredConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct DesiredConfig<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    tag: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_config_version_note: Option<&'a str>,
    properties: &'a Properties,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    resources: Vec<UpdateResource>,
}

#[derive(Debug, Deserialize)]
struct UpdateResource {
    #[serde(default)]
    configurations: Vec<AppliedConfiguration>,
}

#[derive(Debug, Deserialize)]
struct AppliedConfiguration {
    #[serde(default)]
    configs: Properties,
}

impl UpdateResponse {
    fn into_configs(self) -> Result<Properties, TransportError> {
        self.resources
            .into_iter()
            .next()
            .and_then(|r| r.configurations.into_iter().next())
            .map(|c| c.configs)
            .ok_or_else(|| TransportError::decode("update response has no applied configuration"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn desired_config_body_shape() {
        let mut props = Properties::new();
        props.insert("a".to_string(), "1".to_string());
        let body = DesiredConfigRequest {
            clusters: DesiredConfigs {
                desired_config: vec![DesiredConfig {
                    kind: CONFIG_TYPE,
                    tag: "version1",
                    service_config_version_note: None,
                    properties: &props,
                }],
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "Clusters": {
                    "desired_config": [
                        { "type": "capacity-scheduler", "tag": "version1", "properties": { "a": "1" } }
                    ]
                }
            })
        );
    }

    #[test]
    fn update_response_without_configurations_is_decode_error() {
        let resp: UpdateResponse = serde_json::from_value(json!({ "resources": [] })).unwrap();
        let err = resp.into_configs().unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }

    #[test]
    fn error_body_keeps_read_failures() {
        assert_eq!(error_body(Ok("  tag not found\n".to_string())), "tag not found");

        let read_err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let body = error_body(Err(read_err));
        assert!(body.starts_with("<unreadable body: "), "{body}");
    }

    #[test]
    fn url_joins_segments_under_base() {
        let client = SchedulerClient::new(ClientOptions::new("http://h/base/")).unwrap();
        assert_eq!(client.base_url(), "http://h/base");
        assert_eq!(client.url(&[]), "http://h/base");
        assert_eq!(client.url(&["byTag", "v1"]), "http://h/base/byTag/v1");
    }
}
