//! HTTP client for the research server.
//!
//! Besides the generation stream, the server exposes plain request/response
//! endpoints: listing and fetching stored reports, asking a follow-up
//! question about a report, and downloading the report as PDF. Calls that act on "the current
//! report" take it from a [`SessionContext`] and fail fast when there is none.

pub mod error;

pub use error::{ClientError, ClientResult};

use crate::config::models::ClientSettings;
use crate::engine::ReportEngine;
use crate::state::session::SessionContext;
use crate::stream::transport::StreamTransport;
use rk_protocol::report_models::{
    FollowUpRequest, FollowUpResponse, ReportId, ReportSummary, ResearchReport,
};
use serde::de::DeserializeOwned;
use tracing::debug;

const REPORTS_PATH: &str = "/api/reports";

/// Client for one research server.
#[derive(Debug, Clone)]
pub struct ResearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl ResearchClient {
    /// Create a client with a default HTTP configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Create a client from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] if the HTTP client cannot be built.
    pub fn from_settings(settings: &ClientSettings) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .build()?;
        Ok(Self::with_http(http, settings.base_url.clone()))
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A stream transport sharing this client's connection pool.
    pub fn transport(&self) -> StreamTransport {
        StreamTransport::new(self.http.clone(), self.base_url.clone())
    }

    /// A generation engine that records reports into `session`.
    pub fn engine(&self, session: SessionContext) -> ReportEngine {
        ReportEngine::new(self.transport(), session)
    }

    pub fn report_url(&self, id: &ReportId) -> String {
        format!("{}{REPORTS_PATH}/{id}", self.base_url)
    }

    /// Summaries of the reports the server has stored.
    pub async fn list_reports(&self) -> ClientResult<Vec<ReportSummary>> {
        debug!("listing reports");
        let response = self
            .http
            .get(format!("{}{REPORTS_PATH}/", self.base_url))
            .send()
            .await?;
        read_json(response).await
    }

    /// Fetch a stored report.
    pub async fn get_report(&self, id: &ReportId) -> ClientResult<ResearchReport> {
        debug!(report_id = %id, "fetching report");
        let response = self.http.get(self.report_url(id)).send().await?;
        read_json(response).await
    }

    /// Ask a follow-up question about the session's active report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoActiveReport`] without making a request when
    /// the session has no report.
    pub async fn follow_up(
        &self,
        session: &SessionContext,
        question: &str,
    ) -> ClientResult<FollowUpResponse> {
        let report_id = session.require()?;
        self.follow_up_for(&report_id, question).await
    }

    /// Ask a follow-up question about a specific report.
    pub async fn follow_up_for(
        &self,
        report_id: &ReportId,
        question: &str,
    ) -> ClientResult<FollowUpResponse> {
        debug!(%report_id, "asking follow-up question");
        let body = FollowUpRequest {
            report_id: report_id.clone(),
            question: question.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/followup", self.report_url(report_id)))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    /// PDF export URL of the session's active report.
    ///
    /// No request is made; the URL is meant to be opened or downloaded.
    pub fn export_pdf_url(&self, session: &SessionContext) -> ClientResult<String> {
        let report_id = session.require()?;
        Ok(self.export_pdf_url_for(&report_id))
    }

    pub fn export_pdf_url_for(&self, report_id: &ReportId) -> String {
        format!("{}/export/pdf", self.report_url(report_id))
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}
