use std::time::Duration;

use log::trace;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::{
    provider::{
        AllParams, GetBlockOutput, GetBlockTransactionsOutput, GetNodesOutput, PageRequest,
        Provider, ProviderError,
    },
    utils::retry_with_backoff,
};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RpcProviderConfig {
    pub rpc_url: Url,
    /// Total attempts per call, including the first one.
    pub retries: u32,
    pub timeout: Duration,
}

impl RpcProviderConfig {
    pub fn new(rpc_url: Url) -> Self {
        Self {
            rpc_url,
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Provider implementation as a client to a Pocket node's `/v1/query` HTTP API.
#[derive(Debug, Clone)]
pub struct PocketRpcProvider {
    http_client: Client,
    rpc_url: Url,
    retries: u32,
}

#[derive(Debug, Serialize)]
struct HeightRequest {
    height: u64,
}

#[derive(Debug, Serialize)]
struct EmptyRequest {}

#[derive(Debug, Deserialize)]
struct HeightResponse {
    height: u64,
}

#[derive(Debug, Serialize)]
struct NodesRequest {
    height: u64,
    opts: NodesRequestOptions,
}

#[derive(Debug, Serialize)]
struct NodesRequestOptions {
    page: u64,
    per_page: u64,
}

#[derive(Debug, Serialize)]
struct BlockTransactionsRequest {
    height: u64,
    page: u64,
    per_page: u64,
    prove: bool,
    order: &'static str,
}

impl PocketRpcProvider {
    pub fn new(config: RpcProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: ClientBuilder::new().timeout(config.timeout).build()?,
            rpc_url: config.rpc_url,
            retries: config.retries.max(1),
        })
    }

    fn endpoint(&self, path: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.rpc_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.rpc_url.to_string()))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    async fn query<B, R>(&self, method: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = self.endpoint(&["v1", "query", method])?;

        retry_with_backoff(
            || self.post_once(&url, body),
            method,
            self.retries,
            RETRY_BASE_DELAY,
        )
        .await
    }

    async fn post_once<B, R>(&self, url: &Url, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        trace!("POST {}", url);

        let response = self
            .http_client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(e, url))?;
        if !response.status().is_success() {
            return Err(status_error(response.status(), url));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ProviderError::Body {
            url: url.to_string(),
            source,
        })
    }
}

/// Node-side 5xx responses mean the node is down or overloaded, not that the request was bad.
fn status_error(status: StatusCode, url: &Url) -> ProviderError {
    if status.is_server_error() {
        ProviderError::Unavailable(format!("{} answered {}", url, status))
    } else {
        ProviderError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}

fn send_error(e: reqwest::Error, url: &Url) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::Unavailable(format!("{}: {}", url, e))
    } else {
        ProviderError::Reqwest(e)
    }
}

impl Provider for PocketRpcProvider {
    async fn get_block_height(&self) -> Result<u64, ProviderError> {
        let response: HeightResponse = self.query("height", &EmptyRequest {}).await?;
        Ok(response.height)
    }

    async fn get_block(&self, height: u64) -> Result<GetBlockOutput, ProviderError> {
        self.query("block", &HeightRequest { height }).await
    }

    async fn get_nodes(&self, request: PageRequest) -> Result<GetNodesOutput, ProviderError> {
        let body = NodesRequest {
            height: request.height,
            opts: NodesRequestOptions {
                page: request.page,
                per_page: request.per_page,
            },
        };
        self.query("nodes", &body).await
    }

    async fn get_block_transactions(
        &self,
        request: PageRequest,
    ) -> Result<GetBlockTransactionsOutput, ProviderError> {
        let body = BlockTransactionsRequest {
            height: request.height,
            page: request.page,
            per_page: request.per_page,
            prove: false,
            order: "asc",
        };
        self.query("blocktxs", &body).await
    }

    async fn get_all_params(&self, height: u64) -> Result<AllParams, ProviderError> {
        self.query("allParams", &HeightRequest { height }).await
    }
}
