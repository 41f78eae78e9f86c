//! The search and export actions of the report screen, wired to their
//! remote collaborators.

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::export::{ExportFormat, ExportRequest, ExportedFile, ReportQuery, ReportRequest};
use crate::schema::ReportPayload;
use crate::{ReportProcessor, ReportTables};
use futures::future::BoxFuture;
use log::{error, info};

pub const FETCH_ERROR_MESSAGE: &str = "An error occurred while fetching the report.";
pub const DOWNLOAD_ERROR_MESSAGE: &str = "An error occurred while downloading the file.";

/// Retrieves the raw report payload for an account and period.
pub trait ReportFetcher: Send + Sync {
    fn fetch_report<'a>(
        &'a self,
        account_id: &'a str,
        query: &'a ReportQuery,
    ) -> BoxFuture<'a, Result<ReportPayload>>;
}

/// Produces a server-rendered export of the report.
pub trait ReportExporter: Send + Sync {
    fn export<'a>(
        &'a self,
        account_id: &'a str,
        format: ExportFormat,
        request: &'a ExportRequest,
    ) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Surfaces a user-facing error message.
pub trait Notifier {
    fn notify_error(&self, message: &str);
}

/// Notifier that writes to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        error!("{}", message);
    }
}

pub struct ReportSession<F, E, N = LogNotifier> {
    account_id: String,
    config: ReportConfig,
    fetcher: F,
    exporter: E,
    notifier: N,
}

impl<F, E> ReportSession<F, E, LogNotifier>
where
    F: ReportFetcher,
    E: ReportExporter,
{
    pub fn new(account_id: impl Into<String>, config: ReportConfig, fetcher: F, exporter: E) -> Self {
        Self::with_notifier(account_id, config, fetcher, exporter, LogNotifier)
    }
}

impl<F, E, N> ReportSession<F, E, N>
where
    F: ReportFetcher,
    E: ReportExporter,
    N: Notifier,
{
    pub fn with_notifier(
        account_id: impl Into<String>,
        config: ReportConfig,
        fetcher: F,
        exporter: E,
        notifier: N,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            config,
            fetcher,
            exporter,
            notifier,
        }
    }

    /// Fetches the report for the requested period and builds every table.
    /// Failures are passed to the notifier before being returned.
    pub async fn search(&self, request: &ReportRequest) -> Result<ReportTables> {
        let result = self.fetch_and_process(request).await;
        if let Err(err) = &result {
            self.fail(err, FETCH_ERROR_MESSAGE);
        }
        result
    }

    /// Downloads a server-rendered export named `reporte.<ext>`.
    pub async fn export(&self, format: ExportFormat, request: &ExportRequest) -> Result<ExportedFile> {
        info!(
            "Exporting {} report for account {}",
            format.extension(),
            self.account_id
        );

        match self.exporter.export(&self.account_id, format, request).await {
            Ok(bytes) => Ok(ExportedFile::new(format, bytes)),
            Err(err) => {
                self.fail(&err, DOWNLOAD_ERROR_MESSAGE);
                Err(err)
            }
        }
    }

    async fn fetch_and_process(&self, request: &ReportRequest) -> Result<ReportTables> {
        let query = ReportQuery::from_request(request)?;
        info!(
            "Fetching report for account {} from {} to {}",
            self.account_id, query.start_date, query.end_date
        );

        let payload = self.fetcher.fetch_report(&self.account_id, &query).await?;
        ReportProcessor::process(&payload, &self.config)
    }

    fn fail(&self, err: &ReportError, fallback: &str) {
        error!("Report action failed for account {}: {}", self.account_id, err);
        self.notifier.notify_error(&err.user_message(fallback));
    }
}
