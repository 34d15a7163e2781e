use crate::config::Config;
use crate::models::{AccountEntry, AccountSnapshot, Address, Receivable, Transaction};
use crate::node::client::{HeightSearch, NodeClient, NodeError, NodeStream};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

const NDJSON: &str = "application/x-ndjson";

// Upper bound for one streamed record
const MAX_LINE_LENGTH: usize = 1024 * 1024;

#[derive(Serialize)]
struct AddressesRequest<'a> {
    addresses: &'a [Address],
}

/// Node client speaking JSON over HTTP, with newline-delimited JSON for
/// the long-lived streams.
#[derive(Clone)]
pub struct HttpNodeClient {
    http: Client,
    base_url: String,
}

impl HttpNodeClient {
    pub fn new(config: &Config) -> Result<Self, NodeError> {
        info!("Initializing node client with endpoint: {}", config.node_base_url);

        // No request timeout: streams stay open indefinitely. Keepalive probes
        // turn a silently dead peer into a read error.
        let http = Client::builder()
            .connect_timeout(config.node_connect_timeout)
            .tcp_keepalive(config.node_tcp_keepalive)
            .build()?;

        Ok(Self {
            http,
            base_url: config.node_base_url.clone(),
        })
    }

    async fn open_stream<B, T>(&self, path: &str, body: &B) -> Result<NodeStream<T>, NodeError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Opening node stream {}", url);

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, NDJSON)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let reader = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
        let lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

        let records = lines.filter_map(|line| async move {
            match line {
                // keep-alive
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(serde_json::from_str::<T>(&line).map_err(NodeError::from)),
                Err(e) => Some(Err(NodeError::from(e))),
            }
        });

        Ok(records.boxed())
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn fetch_account_snapshots(&self, addresses: &[Address]) -> Result<Vec<AccountSnapshot>, NodeError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let snapshots = self
            .http
            .post(format!("{}/accounts", self.base_url))
            .json(&AddressesRequest { addresses })
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<AccountSnapshot>>()
            .await?;

        Ok(snapshots)
    }

    async fn subscribe_account_snapshots(&self, addresses: &[Address]) -> Result<NodeStream<AccountSnapshot>, NodeError> {
        self.open_stream("/accounts/stream", &AddressesRequest { addresses }).await
    }

    async fn subscribe_receivables(&self, addresses: &[Address]) -> Result<NodeStream<Receivable>, NodeError> {
        self.open_stream("/accounts/receivables/stream", &AddressesRequest { addresses })
            .await
    }

    async fn subscribe_transactions(&self, search: &HeightSearch) -> Result<NodeStream<Transaction>, NodeError> {
        self.open_stream("/accounts/transactions/stream", search).await
    }

    async fn subscribe_account_entries(&self, search: &HeightSearch) -> Result<NodeStream<AccountEntry>, NodeError> {
        self.open_stream("/accounts/entries/stream", search).await
    }
}
