//! HTTP client for the record-store service.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Record, RecordId},
    error::{ApiError, ApiException},
    protocol::{
        record_route, records_query_route, records_route, DeleteRecordResponse,
        FetchRecordResponse, QueryEvent, RecordQuery, SaveRecordRequest, SaveRecordResponse,
    },
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use url::Url;

use crate::database::{RecordDatabase, RecordStream};

const QUERY_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct HttpRecordDatabase {
    http: Client,
    server_url: String,
}

impl HttpRecordDatabase {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self> {
        let parsed = Url::parse(server_url)
            .with_context(|| format!("invalid record store url '{server_url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "record store url must use http or https, got '{}'",
                parsed.scheme()
            ));
        }
        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}{route}", self.server_url)
    }
}

#[async_trait]
impl RecordDatabase for HttpRecordDatabase {
    async fn save(&self, record: Record) -> Result<Option<Record>> {
        let res = self
            .http
            .post(self.endpoint(records_route()))
            .json(&SaveRecordRequest { record })
            .send()
            .await
            .context("failed to send save request")?;
        // An update of a record the store no longer has is an empty result, not a transport error.
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: SaveRecordResponse = checked(res).await?.json().await?;
        Ok(body.record)
    }

    async fn fetch(&self, record_id: &RecordId) -> Result<Option<Record>> {
        let res = self
            .http
            .get(self.endpoint(&record_route(record_id)))
            .send()
            .await
            .context("failed to send fetch request")?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: FetchRecordResponse = checked(res).await?.json().await?;
        Ok(body.record)
    }

    async fn delete(&self, record_id: &RecordId) -> Result<Option<RecordId>> {
        let res = self
            .http
            .delete(self.endpoint(&record_route(record_id)))
            .send()
            .await
            .context("failed to send delete request")?;
        let body: DeleteRecordResponse = checked(res).await?.json().await?;
        Ok(body.record_id)
    }

    async fn query(&self, query: RecordQuery) -> Result<RecordStream> {
        let res = self
            .http
            .post(self.endpoint(records_query_route()))
            .json(&query)
            .send()
            .await
            .context("failed to send query request")?;
        let res = checked(res).await?;

        let (tx, rx) = mpsc::channel(QUERY_CHANNEL_CAPACITY);
        tokio::spawn(forward_query_lines(res, tx));
        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Turns a non-success response into an error carrying the store's `ApiError` when it sent one.
async fn checked(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    match res.json::<ApiError>().await {
        Ok(api_error) => Err(anyhow::Error::new(ApiException::from(api_error))
            .context(format!("record store responded {status}"))),
        Err(_) => Err(anyhow!("record store responded {status}")),
    }
}

enum LineOutcome {
    Continue,
    Stop,
}

async fn forward_query_lines(res: Response, tx: mpsc::Sender<Result<Record>>) {
    let mut chunks = res.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                let _ = tx
                    .send(Err(anyhow::Error::new(err).context("query stream interrupted")))
                    .await;
                return;
            }
        };
        buffer.extend_from_slice(&chunk);

        while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            if let LineOutcome::Stop = forward_line(&line, &tx).await {
                return;
            }
        }
    }

    if let LineOutcome::Stop = forward_line(&buffer, &tx).await {
        return;
    }
    let _ = tx
        .send(Err(anyhow!("query stream ended without a completion marker")))
        .await;
}

async fn forward_line(line: &[u8], tx: &mpsc::Sender<Result<Record>>) -> LineOutcome {
    let line = line.trim_ascii();
    if line.is_empty() {
        return LineOutcome::Continue;
    }

    let event = match serde_json::from_slice::<QueryEvent>(line) {
        Ok(event) => event,
        Err(err) => {
            let _ = tx
                .send(Err(anyhow::Error::new(err).context("malformed query line")))
                .await;
            return LineOutcome::Stop;
        }
    };

    match event {
        QueryEvent::Record { record } => {
            if tx.send(Ok(record)).await.is_err() {
                debug!("query consumer dropped; abandoning stream");
                return LineOutcome::Stop;
            }
            LineOutcome::Continue
        }
        QueryEvent::Done => LineOutcome::Stop,
        QueryEvent::Error(api_error) => {
            let _ = tx
                .send(Err(anyhow::Error::new(ApiException::from(api_error))))
                .await;
            LineOutcome::Stop
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
