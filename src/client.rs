use crate::error::{ReportError, Result};
use crate::export::{ExportFormat, ExportRequest, ReportQuery};
use crate::schema::ReportPayload;
use crate::session::{ReportExporter, ReportFetcher, DOWNLOAD_ERROR_MESSAGE, FETCH_ERROR_MESSAGE};
use futures::future::BoxFuture;
use log::debug;
use reqwest::{Client, Response};
use serde::Deserialize;

/// Body of a failed request, e.g. `{"error": "Account not found"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP implementation of the report fetch and export collaborators.
#[derive(Clone)]
pub struct ReportClient {
    client: Client,
    base_url: String,
}

impl ReportClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn reports_url(&self, account_id: &str) -> String {
        format!("{}/accounts/{}/reports", self.base_url, account_id)
    }

    pub async fn get_report(&self, account_id: &str, query: &ReportQuery) -> Result<ReportPayload> {
        let url = self.reports_url(account_id);
        debug!("GET {} {:?}", url, query);

        let res = self
            .client
            .get(&url)
            .query(&query.query_pairs())
            .send()
            .await?;

        let res = check_status(res, FETCH_ERROR_MESSAGE).await?;
        Ok(res.json().await?)
    }

    pub async fn export_file(
        &self,
        account_id: &str,
        format: ExportFormat,
        request: &ExportRequest,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/export/{}", self.reports_url(account_id), format.extension());
        debug!("GET {} {:?}", url, request);

        let res = self
            .client
            .get(&url)
            .query(&request.query_pairs())
            .send()
            .await?;

        let res = check_status(res, DOWNLOAD_ERROR_MESSAGE).await?;
        Ok(res.bytes().await?.to_vec())
    }
}

/// Passes successful responses through; otherwise turns the server's
/// `error` message, or `fallback`, into [`ReportError::Remote`].
async fn check_status(res: Response, fallback: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    debug!("Request failed with status {}: {}", status, body);
    Err(ReportError::Remote(server_message(&body, fallback)))
}

fn server_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

impl ReportFetcher for ReportClient {
    fn fetch_report<'a>(
        &'a self,
        account_id: &'a str,
        query: &'a ReportQuery,
    ) -> BoxFuture<'a, Result<ReportPayload>> {
        Box::pin(self.get_report(account_id, query))
    }
}

impl ReportExporter for ReportClient {
    fn export<'a>(
        &'a self,
        account_id: &'a str,
        format: ExportFormat,
        request: &'a ExportRequest,
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(self.export_file(account_id, format, request))
    }
}
