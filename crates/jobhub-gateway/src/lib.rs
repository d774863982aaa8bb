//! Backend gateway contract for the manual and scraped job stores, plus an HTTP client implementing it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jobhub_core::{FilterField, FilterSet, JobId, NewJob, RawJob, Source};
use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info_span, warn, Instrument};

pub const CRATE_NAME: &str = "jobhub-gateway";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Server-side list narrowing. Mirrors the `GET /jobs` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub source: Option<Source>,
    pub filters: FilterSet,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ListQuery {
    pub fn for_source(source: Source, filters: FilterSet) -> Self {
        Self {
            source: Some(source),
            filters,
            ..Default::default()
        }
    }

    /// Query parameters with empty predicates left out.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self
            .filters
            .predicates()
            .into_iter()
            .map(|(field, value)| (filter_param(field), value.to_string()))
            .collect::<Vec<_>>();
        if let Some(source) = self.source {
            pairs.push(("source", source.as_str().to_string()));
        }
        if let Some(sort_by) = self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("sort_by", sort_by.to_string()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sort_order", order.as_str().to_string()));
        }
        pairs
    }
}

fn filter_param(field: FilterField) -> &'static str {
    match field {
        FilterField::Company => "company",
        FilterField::Location => "location",
        FilterField::JobType => "job_type",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListJobsResponse {
    pub success: bool,
    #[serde(default)]
    pub jobs: Vec<RawJob>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCount {
    #[serde(default)]
    pub company: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    #[serde(default)]
    pub location: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTypeCount {
    #[serde(default)]
    pub job_type: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    #[serde(default)]
    pub source: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatsResponse {
    pub success: bool,
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub companies: Vec<CompanyCount>,
    #[serde(default)]
    pub locations: Vec<LocationCount>,
    #[serde(default)]
    pub job_types: Vec<JobTypeCount>,
    #[serde(default)]
    pub sources: Vec<SourceCount>,
    #[serde(default)]
    pub message: Option<String>,
}

impl JobStatsResponse {
    pub fn source_total(&self, source: Source) -> u64 {
        self.sources
            .iter()
            .filter(|row| row.source.as_deref().and_then(Source::parse) == Some(source))
            .map(|row| row.count)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    pub success: bool,
    #[serde(default)]
    pub job: Option<RawJob>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteJobResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperStats {
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub scraped_jobs: u64,
    #[serde(default)]
    pub manual_jobs: u64,
    #[serde(default)]
    pub most_recent_update: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperSchedule {
    #[serde(default)]
    pub regular_times: Vec<String>,
    #[serde(default)]
    pub test_interval_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperStatusResponse {
    pub success: bool,
    #[serde(default)]
    pub stats: Option<ScraperStats>,
    #[serde(default)]
    pub schedule: Option<ScraperSchedule>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScraperStatusResponse {
    pub fn most_recent_update(&self) -> Option<&str> {
        self.stats.as_ref()?.most_recent_update.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunScraperResponse {
    pub success: bool,
    #[serde(default)]
    pub jobs_processed: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response envelope shared by every gateway call.
pub trait Acknowledged {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;
}

macro_rules! impl_acknowledged {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Acknowledged for $ty {
                fn success(&self) -> bool {
                    self.success
                }

                fn message(&self) -> Option<&str> {
                    self.message.as_deref()
                }
            }
        )*
    };
}

impl_acknowledged!(
    ListJobsResponse,
    JobStatsResponse,
    CreateJobResponse,
    DeleteJobResponse,
    ScraperStatusResponse,
    RunScraperResponse,
);

/// Turn a `success: false` envelope into `GatewayError::Rejected`.
pub fn confirm<R: Acknowledged>(response: R, fallback: &str) -> Result<R, GatewayError> {
    if response.success() {
        Ok(response)
    } else {
        Err(GatewayError::Rejected {
            message: response.message().unwrap_or(fallback).to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transport,
    BackendRejection,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed after retries: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("undecodable response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend rejected request: {message}")]
    Rejected { message: String },
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            GatewayError::Rejected { .. } => ErrorClass::BackendRejection,
            _ => ErrorClass::Transport,
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.class() == ErrorClass::BackendRejection
    }

    /// Text for an inline error next to the control that failed.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Rejected { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Request/response contract against the two job stores.
///
/// Implementations report `success: false` envelopes as
/// `GatewayError::Rejected`; callers still run responses through [`confirm`].
#[async_trait]
pub trait JobGateway: Send + Sync {
    async fn list_jobs(&self, query: &ListQuery) -> Result<ListJobsResponse, GatewayError>;

    async fn job_stats(&self) -> Result<JobStatsResponse, GatewayError>;

    async fn create_job(&self, source: Source, job: &NewJob)
        -> Result<CreateJobResponse, GatewayError>;

    /// `source` is the list context the record was shown in; it decides the
    /// owning backend, not the shape of `id`.
    async fn delete_job(&self, source: Source, id: &JobId)
        -> Result<DeleteJobResponse, GatewayError>;

    async fn scraper_status(&self) -> Result<ScraperStatusResponse, GatewayError>;

    async fn run_scraper(&self) -> Result<RunScraperResponse, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub max_in_flight: usize,
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            max_in_flight: 8,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RejectionBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// JSON-over-HTTP gateway. Only GET requests are retried.
#[derive(Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    in_flight: Arc<Semaphore>,
    backoff: BackoffPolicy,
}

impl HttpGateway {
    pub fn new(base_url: &str, config: HttpClientConfig) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("parsing gateway base url {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("gateway base url {base_url} cannot carry path segments");
        }

        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().context("building reqwest client")?;

        Ok(Self {
            client,
            base_url,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            backoff: config.backoff,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL plus percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        query: &[(&'static str, String)],
        body: Option<&JsonValue>,
    ) -> Result<R, GatewayError> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| GatewayError::Unreachable("request limiter closed".into()))?;
        let retries = if method == Method::GET {
            self.backoff.max_retries
        } else {
            0
        };
        let span = info_span!("gateway_request", method = %method, path = url.path());

        let outcome: Result<R, GatewayError> = async {
            for attempt in 0..=retries {
                let mut request = self.client.request(method.clone(), url.clone());
                if !query.is_empty() {
                    request = request.query(query);
                }
                if let Some(body) = body {
                    request = request.json(body);
                }

                match request.send().await {
                    Ok(resp) => {
                        let status = resp.status();
                        if !status.is_success()
                            && classify_status(status) == RetryDisposition::Retryable
                            && attempt < retries
                        {
                            warn!(status = status.as_u16(), attempt, "retrying gateway request");
                            tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                            continue;
                        }
                        let final_url = resp.url().to_string();
                        return match resp.bytes().await {
                            Ok(bytes) => decode_body(status, &final_url, &bytes),
                            Err(err) => Err(GatewayError::Request(err)),
                        };
                    }
                    Err(err) => {
                        if classify_reqwest_error(&err) == RetryDisposition::Retryable
                            && attempt < retries
                        {
                            warn!(error = %err, attempt, "retrying gateway request");
                            tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                            continue;
                        }
                        return Err(GatewayError::Request(err));
                    }
                }
            }
            Err(GatewayError::Unreachable(format!("{method} {url}: retries exhausted")))
        }
        .instrument(span)
        .await;
        outcome
    }
}

fn decode_body<R: DeserializeOwned>(
    status: StatusCode,
    url: &str,
    bytes: &[u8],
) -> Result<R, GatewayError> {
    if status.is_success() {
        return serde_json::from_slice(bytes).map_err(|err| GatewayError::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        });
    }
    match serde_json::from_slice::<RejectionBody>(bytes) {
        Ok(RejectionBody {
            success: false,
            message: Some(message),
        }) => Err(GatewayError::Rejected { message }),
        _ => Err(GatewayError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }),
    }
}

#[async_trait]
impl JobGateway for HttpGateway {
    async fn list_jobs(&self, query: &ListQuery) -> Result<ListJobsResponse, GatewayError> {
        let url = self.endpoint(&["jobs"]);
        let resp = self.send(Method::GET, url, &query.query_pairs(), None).await?;
        confirm(resp, "Failed to retrieve jobs")
    }

    async fn job_stats(&self) -> Result<JobStatsResponse, GatewayError> {
        let url = self.endpoint(&["jobs", "stats"]);
        let resp = self.send(Method::GET, url, &[], None).await?;
        confirm(resp, "Failed to retrieve job statistics")
    }

    async fn create_job(
        &self,
        source: Source,
        job: &NewJob,
    ) -> Result<CreateJobResponse, GatewayError> {
        let url = self.endpoint(&["jobs"]);
        let mut body = serde_json::to_value(job).map_err(|err| GatewayError::Decode {
            url: url.to_string(),
            reason: format!("encoding create payload: {err}"),
        })?;
        if let Some(map) = body.as_object_mut() {
            map.insert("source".into(), JsonValue::String(source.as_str().into()));
        }
        let resp = self.send(Method::POST, url, &[], Some(&body)).await?;
        confirm(resp, "Failed to add job")
    }

    async fn delete_job(
        &self,
        source: Source,
        id: &JobId,
    ) -> Result<DeleteJobResponse, GatewayError> {
        let segment = id.as_path_segment();
        let url = self.endpoint(&["jobs", segment.as_str()]);
        let query = [("source", source.as_str().to_string())];
        let resp = self.send(Method::DELETE, url, &query, None).await?;
        confirm(resp, "Failed to delete job")
    }

    async fn scraper_status(&self) -> Result<ScraperStatusResponse, GatewayError> {
        let url = self.endpoint(&["scraper", "status"]);
        let resp = self.send(Method::GET, url, &[], None).await?;
        confirm(resp, "Failed to get scraper status")
    }

    async fn run_scraper(&self) -> Result<RunScraperResponse, GatewayError> {
        let url = self.endpoint(&["scraper", "run"]);
        let resp = self.send(Method::POST, url, &[], None).await?;
        confirm(resp, "Failed to trigger job scraper")
    }
}
