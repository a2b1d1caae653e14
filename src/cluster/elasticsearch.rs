//! Elasticsearch-compatible REST client.
//!
//! Endpoints used:
//! - `GET /` ping (cluster name and version)
//! - `GET /{pattern}/_alias` list indices matching a pattern
//! - `DELETE /{a,b,c}` bulk index deletion
//! - `PUT /_snapshot/{repository}` register a filesystem repository
//! - `PUT /_snapshot/{repository}/{snapshot}` start a snapshot

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use super::{ClusterClient, ClusterConnector, ClusterError, ClusterInfo, ClusterResult};
use crate::config::ClusterConfig;

/// Longest response body excerpt carried in a [`ClusterError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct PingResponse {
    #[serde(default)]
    cluster_name: String,
    version: PingVersion,
}

#[derive(Debug, Deserialize)]
struct PingVersion {
    number: String,
}

#[derive(Debug, Deserialize)]
struct AcknowledgedResponse {
    acknowledged: bool,
}

#[derive(Debug, Deserialize)]
struct SnapshotAcceptedResponse {
    #[serde(default)]
    accepted: bool,
}

#[derive(Debug, Serialize)]
struct FsRepositoryRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    settings: FsRepositorySettings<'a>,
}

#[derive(Debug, Serialize)]
struct FsRepositorySettings<'a> {
    location: &'a str,
    compress: bool,
}

#[derive(Debug, Serialize)]
struct SnapshotRequest {
    indices: String,
    ignore_unavailable: bool,
    include_global_state: bool,
}

/// Shared HTTP plumbing for the connector and the per-cycle client.
#[derive(Clone)]
struct Transport {
    http: reqwest::Client,
    base: Url,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl Transport {
    /// Append `segments` to the base URL. Each segment is percent-encoded,
    /// so `?`, `#` or `/` inside a name can never change the endpoint.
    fn url(&self, segments: &[&str]) -> ClusterResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClusterError::Request {
                operation: "build request url",
                message: format!("{} cannot be a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClusterResult<reqwest::RequestBuilder> {
        let builder = self.http.request(method, self.url(segments)?);
        Ok(match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        })
    }

    /// Send a request and decode a successful JSON response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> ClusterResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| self.classify_transport_error(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterError::Status {
                operation,
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify_transport_error(operation, e))?;
        tracing::debug!(
            operation,
            body = %String::from_utf8_lossy(&bytes),
            "Cluster response"
        );
        serde_json::from_slice(&bytes).map_err(|e| ClusterError::Decode {
            operation,
            message: e.to_string(),
        })
    }

    /// Map an HTTP library error onto the crate's failure classes.
    ///
    /// Only failures to establish a connection count as the cluster being
    /// unreachable; timeouts and protocol errors on an established
    /// connection are per-request failures.
    fn classify_transport_error(&self, operation: &'static str, err: reqwest::Error) -> ClusterError {
        if err.is_connect() {
            ClusterError::Unreachable {
                url: self.base_url.clone(),
                message: error_chain(&err),
            }
        } else {
            ClusterError::Request {
                operation,
                message: error_chain(&err),
            }
        }
    }
}

/// Builds [`ElasticsearchClient`] handles, pinging the cluster each time.
pub struct ElasticsearchConnector {
    transport: Transport,
}

impl ElasticsearchConnector {
    pub fn new(config: &ClusterConfig) -> ClusterResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(concat!("indexkeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClusterError::Request {
                operation: "build http client",
                message: error_chain(&e),
            })?;

        let base_url = config.url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| ClusterError::Request {
            operation: "build http client",
            message: format!("invalid cluster url '{base_url}': {e}"),
        })?;

        Ok(Self {
            transport: Transport {
                http,
                base,
                base_url,
                username: config.username.clone(),
                password: config.password.clone(),
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }
}

#[async_trait]
impl ClusterConnector for ElasticsearchConnector {
    async fn connect(&self) -> ClusterResult<Box<dyn ClusterClient>> {
        let ping: PingResponse = self
            .transport
            .send_json("ping", self.transport.request(Method::GET, &[])?)
            .await?;

        let info = ClusterInfo {
            cluster_name: ping.cluster_name,
            version: ping.version.number,
        };

        tracing::debug!(
            url = %self.transport.base_url,
            cluster_name = %info.cluster_name,
            version = %info.version,
            "Connected to cluster"
        );

        Ok(Box::new(ElasticsearchClient {
            transport: self.transport.clone(),
            info,
        }))
    }
}

/// A cluster handle valid for one cycle.
pub struct ElasticsearchClient {
    transport: Transport,
    info: ClusterInfo,
}

#[async_trait]
impl ClusterClient for ElasticsearchClient {
    fn info(&self) -> &ClusterInfo {
        &self.info
    }

    async fn list_indices(&self, pattern: &str) -> ClusterResult<BTreeSet<String>> {
        let request = self.transport.request(Method::GET, &[pattern, "_alias"])?;
        let indices: HashMap<String, serde_json::Value> = self
            .transport
            .send_json("list indices", request)
            .await?;
        Ok(indices.into_keys().collect())
    }

    async fn delete_indices(&self, names: &[String]) -> ClusterResult<()> {
        let joined = names.join(",");
        let request = self.transport.request(Method::DELETE, &[joined.as_str()])?;
        let response: AcknowledgedResponse = self
            .transport
            .send_json("delete indices", request)
            .await?;

        if !response.acknowledged {
            return Err(ClusterError::NotAcknowledged {
                operation: "delete indices",
            });
        }
        Ok(())
    }

    async fn create_fs_repository(&self, repository: &str, location: &str) -> ClusterResult<()> {
        let body = FsRepositoryRequest {
            kind: "fs",
            settings: FsRepositorySettings {
                location,
                compress: true,
            },
        };
        let request = self
            .transport
            .request(Method::PUT, &["_snapshot", repository])?
            .json(&body);
        let response: AcknowledgedResponse = self
            .transport
            .send_json("create snapshot repository", request)
            .await?;

        if !response.acknowledged {
            return Err(ClusterError::NotAcknowledged {
                operation: "create snapshot repository",
            });
        }
        Ok(())
    }

    async fn create_snapshot(
        &self,
        repository: &str,
        snapshot: &str,
        indices: &[String],
    ) -> ClusterResult<()> {
        let body = SnapshotRequest {
            indices: indices.join(","),
            ignore_unavailable: true,
            include_global_state: false,
        };
        let segments = ["_snapshot", repository, snapshot];
        tracing::debug!(url = %self.transport.url(&segments)?, indices = %body.indices, "Creating snapshot");

        let request = self
            .transport
            .request(Method::PUT, &segments)?
            .json(&body);
        let response: SnapshotAcceptedResponse = self
            .transport
            .send_json("create snapshot", request)
            .await?;

        if !response.accepted {
            return Err(ClusterError::NotAcknowledged {
                operation: "create snapshot",
            });
        }
        Ok(())
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

/// Render an error with its source chain, since `reqwest` hides the root
/// cause (e.g. "connection refused") behind a generic top-level message.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
