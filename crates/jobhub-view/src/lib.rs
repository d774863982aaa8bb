//! Aggregation store + view controller reconciling the manual and scraped job backends.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use jobhub_core::{
    matches, normalize, normalize_all, FilterSet, IdKind, JobId, JobRecord, NewJob, Source,
    ValidationError, UNKNOWN_COMPANY_LABEL,
};
use jobhub_gateway::{
    confirm, BackoffPolicy, CreateJobResponse, DeleteJobResponse, ErrorClass, GatewayError,
    HttpClientConfig, HttpGateway, JobGateway, JobStatsResponse, ListJobsResponse, ListQuery,
    ScraperStatusResponse, DEFAULT_API_URL,
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobhub-view";

pub const PLACEHOLDER_LABEL: &str = "n/a";
pub const NO_SCRAPE_DATA_LABEL: &str = "No data";
pub const LOCATION_OPTIONS: [&str; 4] = ["Karachi", "Lahore", "Islamabad", "Multan"];
pub const JOB_TYPE_OPTIONS: [&str; 5] = ["Full Time", "Part Time", "Contract", "Remote", "Internship"];

#[derive(Debug, Clone, Copy)]
pub struct ScrapePollPolicy {
    pub timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for ScrapePollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            backoff: BackoffPolicy {
                max_retries: 0,
                base_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(10),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub api_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub delete_confirm_window: Duration,
    pub scrape_poll: ScrapePollPolicy,
    pub initial_source: Source,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout_secs: 20,
            user_agent: "jobhub/0.1".to_string(),
            delete_confirm_window: Duration::from_secs(3),
            scrape_poll: ScrapePollPolicy::default(),
            initial_source: Source::Manual,
        }
    }
}

impl ViewConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut scrape_poll = defaults.scrape_poll;
        if let Some(secs) = env_u64("JOBHUB_SCRAPE_POLL_TIMEOUT_SECS") {
            scrape_poll.timeout = Duration::from_secs(secs);
        }
        Self {
            api_url: std::env::var("JOBHUB_API_URL").unwrap_or(defaults.api_url),
            http_timeout_secs: env_u64("JOBHUB_HTTP_TIMEOUT_SECS")
                .unwrap_or(defaults.http_timeout_secs),
            user_agent: std::env::var("JOBHUB_USER_AGENT").unwrap_or(defaults.user_agent),
            delete_confirm_window: env_u64("JOBHUB_DELETE_CONFIRM_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.delete_confirm_window),
            scrape_poll,
            initial_source: std::env::var("JOBHUB_INITIAL_TAB")
                .ok()
                .and_then(|v| Source::parse(&v))
                .unwrap_or(defaults.initial_source),
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
            ..Default::default()
        }
    }

    pub fn build_gateway(&self) -> anyhow::Result<HttpGateway> {
        HttpGateway::new(&self.api_url, self.http_client_config())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Distinct values across the unfiltered collection, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub companies: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationView {
    pub items: Vec<JobRecord>,
    pub count: usize,
    pub facets: Facets,
}

impl AggregationView {
    pub fn summary(&self) -> String {
        let plural = if self.count == 1 { "" } else { "s" };
        format!("{} job{plural} found", self.count)
    }
}

/// In-memory collection for one tab. Owned by a single controller.
#[derive(Debug, Clone)]
pub struct AggregationStore {
    source: Source,
    records: Vec<JobRecord>,
}

impl AggregationStore {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            records: Vec::new(),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &JobId) -> Option<&JobRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.get(id).is_some()
    }

    /// Replace the collection, keeping server order.
    pub fn set_all(&mut self, records: Vec<JobRecord>) {
        self.records = records;
    }

    /// Prepend a confirmed create. Records for the other source are ignored.
    pub fn apply_create(&mut self, record: JobRecord) -> bool {
        if record.source != self.source {
            return false;
        }
        self.records.retain(|r| r.id != record.id);
        self.records.insert(0, record);
        true
    }

    pub fn apply_delete(&mut self, id: &JobId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        before != self.records.len()
    }

    pub fn facets(&self) -> Facets {
        let mut facets = Facets::default();
        for record in &self.records {
            // Records without a company carry the fallback label; it is not a real option.
            if record.company != UNKNOWN_COMPANY_LABEL {
                push_unique(&mut facets.companies, record.company.clone());
            }
            if let Some(location) = record.location.as_deref() {
                push_unique(&mut facets.locations, location.to_string());
            }
        }
        facets
    }

    pub fn view(&self, filters: &FilterSet) -> AggregationView {
        let items = self
            .records
            .iter()
            .filter(|r| matches(r, filters))
            .cloned()
            .collect::<Vec<_>>();
        AggregationView {
            count: items.len(),
            items,
            facets: self.facets(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPress {
    Armed { expires_at: Instant },
    Confirmed,
}

/// Two-step delete gesture: the first press arms, a second press inside the
/// window confirms. Armed entries lapse on their own.
#[derive(Debug, Clone)]
pub struct DeleteConfirm {
    window: Duration,
    armed: HashMap<JobId, Instant>,
}

impl DeleteConfirm {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn press(&mut self, id: &JobId, now: Instant) -> ConfirmPress {
        self.armed.retain(|_, expires_at| *expires_at > now);
        if self.armed.remove(id).is_some() {
            return ConfirmPress::Confirmed;
        }
        let expires_at = now + self.window;
        self.armed.insert(id.clone(), expires_at);
        ConfirmPress::Armed { expires_at }
    }

    pub fn is_armed(&self, id: &JobId, now: Instant) -> bool {
        self.armed.get(id).is_some_and(|expires_at| *expires_at > now)
    }

    pub fn disarm(&mut self, id: &JobId) {
        self.armed.remove(id);
    }

    pub fn clear(&mut self) {
        self.armed.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendHealth {
    #[default]
    Unknown,
    Connected,
    Error,
}

impl BackendHealth {
    pub fn label(&self) -> &'static str {
        match self {
            BackendHealth::Unknown => "Checking...",
            BackendHealth::Connected => "Connected",
            BackendHealth::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatsPanel {
    #[default]
    Placeholder,
    Loaded(JobStatsResponse),
}

impl StatsPanel {
    pub fn total_label(&self) -> String {
        match self {
            StatsPanel::Loaded(stats) => stats.total_jobs.to_string(),
            StatsPanel::Placeholder => PLACEHOLDER_LABEL.to_string(),
        }
    }

    pub fn source_total_label(&self, source: Source) -> String {
        match self {
            StatsPanel::Loaded(stats) => stats.source_total(source).to_string(),
            StatsPanel::Placeholder => PLACEHOLDER_LABEL.to_string(),
        }
    }

    pub fn companies(&self) -> Vec<String> {
        match self {
            StatsPanel::Loaded(stats) => stats
                .companies
                .iter()
                .filter_map(|row| row.company.clone())
                .filter(|c| !c.is_empty())
                .collect(),
            StatsPanel::Placeholder => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScraperPanel {
    #[default]
    Placeholder,
    Loaded(ScraperStatusResponse),
}

impl ScraperPanel {
    pub fn last_update_label(&self) -> String {
        match self {
            ScraperPanel::Loaded(status) => status
                .most_recent_update()
                .map(str::to_string)
                .unwrap_or_else(|| NO_SCRAPE_DATA_LABEL.to_string()),
            ScraperPanel::Placeholder => NO_SCRAPE_DATA_LABEL.to_string(),
        }
    }

    pub fn schedule_label(&self) -> String {
        let times = match self {
            ScraperPanel::Loaded(status) => status
                .schedule
                .as_ref()
                .map(|s| s.regular_times.join(", "))
                .unwrap_or_default(),
            ScraperPanel::Placeholder => String::new(),
        };
        if times.is_empty() {
            PLACEHOLDER_LABEL.to_string()
        } else {
            times
        }
    }
}

/// Create form state. Kept intact when a submission fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub draft: Option<NewJob>,
    pub error: Option<String>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub companies: Vec<String>,
    pub locations: Vec<String>,
    pub job_types: Vec<String>,
}

/// Per-row presentation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub record: JobRecord,
    pub id_kind: IdKind,
    pub posting_date: String,
    pub delete_armed: bool,
    pub delete_pending: bool,
    pub error: Option<String>,
}

/// Issued by [`ViewController::begin_fetch`]; only the latest ticket for the
/// current tab may update the store.
#[derive(Debug)]
pub struct FetchTicket {
    seq: u64,
    epoch: u64,
    query: ListQuery,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    Failed { message: String },
    Stale,
}

#[derive(Debug)]
pub struct DeleteTicket {
    id: JobId,
    source: Source,
    epoch: u64,
}

impl DeleteTicket {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn source(&self) -> Source {
        self.source
    }
}

#[derive(Debug)]
pub enum DeleteStep {
    Armed { expires_at: Instant },
    Dispatch(DeleteTicket),
    AlreadyPending,
    AlreadyGone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Armed,
    Deleted,
    AlreadyGone,
    AlreadyPending,
    Failed { message: String },
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Inserted(JobRecord),
    OtherTab(JobRecord),
    Refreshed(FetchOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeSettle {
    Observed,
    NothingNew,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeReport {
    pub jobs_processed: u64,
    pub settle: ScrapeSettle,
    pub list: Option<FetchOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    BackendRejection,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ViewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ViewError::Validation(_) => ErrorKind::Validation,
            ViewError::Gateway(err) => match err.class() {
                ErrorClass::Transport => ErrorKind::Transport,
                ErrorClass::BackendRejection => ErrorKind::BackendRejection,
            },
        }
    }
}

/// Drives one browsing session: the active tab's store, its filters, the
/// delete gesture and the informational side panels.
pub struct ViewController {
    session_id: Uuid,
    gateway: Arc<dyn JobGateway>,
    store: AggregationStore,
    filters: FilterSet,
    state: ViewState,
    epoch: u64,
    latest_seq: u64,
    confirm: DeleteConfirm,
    pending_deletes: HashSet<JobId>,
    row_errors: HashMap<JobId, String>,
    create_form: CreateForm,
    stats: StatsPanel,
    scraper: ScraperPanel,
    scrape_poll: ScrapePollPolicy,
    manual_health: BackendHealth,
    scraped_health: BackendHealth,
}

impl ViewController {
    pub fn new(gateway: Arc<dyn JobGateway>, source: Source, confirm_window: Duration) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            gateway,
            store: AggregationStore::new(source),
            filters: FilterSet::default(),
            state: ViewState::Idle,
            epoch: 0,
            latest_seq: 0,
            confirm: DeleteConfirm::new(confirm_window),
            pending_deletes: HashSet::new(),
            row_errors: HashMap::new(),
            create_form: CreateForm::default(),
            stats: StatsPanel::Placeholder,
            scraper: ScraperPanel::Placeholder,
            scrape_poll: ScrapePollPolicy::default(),
            manual_health: BackendHealth::Unknown,
            scraped_health: BackendHealth::Unknown,
        }
    }

    pub fn from_config(gateway: Arc<dyn JobGateway>, config: &ViewConfig) -> Self {
        Self::new(gateway, config.initial_source, config.delete_confirm_window)
            .with_scrape_poll(config.scrape_poll)
    }

    pub fn with_scrape_poll(mut self, policy: ScrapePollPolicy) -> Self {
        self.scrape_poll = policy;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn active_source(&self) -> Source {
        self.store.source()
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn stats(&self) -> &StatsPanel {
        &self.stats
    }

    pub fn scraper_panel(&self) -> &ScraperPanel {
        &self.scraper
    }

    pub fn create_form(&self) -> &CreateForm {
        &self.create_form
    }

    pub fn health(&self, source: Source) -> BackendHealth {
        match source {
            Source::Manual => self.manual_health,
            Source::Scraped => self.scraped_health,
        }
    }

    fn set_health(&mut self, source: Source, health: BackendHealth) {
        match source {
            Source::Manual => self.manual_health = health,
            Source::Scraped => self.scraped_health = health,
        }
    }

    /// Error banner for the list; the last good data stays visible under it.
    pub fn banner(&self) -> Option<&str> {
        match &self.state {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn view(&self) -> AggregationView {
        self.store.view(&self.filters)
    }

    pub fn rows(&self) -> Vec<JobRow> {
        let now = Instant::now();
        self.view()
            .items
            .into_iter()
            .map(|record| JobRow {
                id_kind: record.id_kind(),
                posting_date: record.posting_date_label(),
                delete_armed: self.confirm.is_armed(&record.id, now),
                delete_pending: self.pending_deletes.contains(&record.id),
                error: self.row_errors.get(&record.id).cloned(),
                record,
            })
            .collect()
    }

    pub fn row_error(&self, id: &JobId) -> Option<&str> {
        self.row_errors.get(id).map(String::as_str)
    }

    pub fn is_delete_pending(&self, id: &JobId) -> bool {
        self.pending_deletes.contains(id)
    }

    pub fn filter_options(&self) -> FilterOptions {
        let facets = self.store.facets();

        let mut companies = Vec::new();
        for company in self.stats.companies().into_iter().chain(facets.companies) {
            push_unique(&mut companies, company);
        }
        let mut locations = Vec::new();
        for location in LOCATION_OPTIONS
            .iter()
            .map(|s| s.to_string())
            .chain(facets.locations)
        {
            push_unique(&mut locations, location);
        }

        FilterOptions {
            companies,
            locations,
            job_types: JOB_TYPE_OPTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Tear down the current tab's state and start a fresh store for `source`.
    /// In-flight tickets from the previous tab become stale.
    pub fn activate(&mut self, source: Source) {
        self.epoch += 1;
        self.store = AggregationStore::new(source);
        self.filters = FilterSet::default();
        self.confirm.clear();
        self.pending_deletes.clear();
        self.row_errors.clear();
        self.create_form = CreateForm::default();
        self.state = ViewState::Idle;
        info!(session = %self.session_id, %source, "activated tab");
    }

    pub async fn switch_tab(&mut self, source: Source) -> FetchOutcome {
        self.activate(source);
        self.refresh().await
    }

    pub fn set_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
    }

    pub async fn fetch(&mut self, filters: FilterSet) -> FetchOutcome {
        self.set_filters(filters);
        self.refresh().await
    }

    pub async fn clear_filters(&mut self) -> FetchOutcome {
        self.fetch(FilterSet::default()).await
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_seq += 1;
        self.state = ViewState::Loading;
        FetchTicket {
            seq: self.latest_seq,
            epoch: self.epoch,
            query: ListQuery::for_source(self.store.source(), self.filters.clone()),
        }
    }

    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<ListJobsResponse, GatewayError>,
    ) -> FetchOutcome {
        // A ticket also goes stale when the filters moved on after it was issued.
        if ticket.epoch != self.epoch
            || ticket.seq != self.latest_seq
            || ticket.query.filters != self.filters
        {
            debug!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "discarding superseded list response"
            );
            return FetchOutcome::Stale;
        }

        let source = self.store.source();
        match result.and_then(|resp| confirm(resp, "Failed to retrieve jobs")) {
            Ok(resp) => {
                let records = normalize_all(resp.jobs, source);
                let count = records.len();
                self.store.set_all(records);
                let store = &self.store;
                self.row_errors.retain(|id, _| store.contains(id));
                self.state = ViewState::Ready;
                self.set_health(source, BackendHealth::Connected);
                FetchOutcome::Applied { count }
            }
            Err(err) => {
                let message = err.user_message();
                warn!(%source, error = %err, "job list fetch failed; keeping last good data");
                self.state = ViewState::Error(message.clone());
                self.set_health(source, BackendHealth::Error);
                FetchOutcome::Failed { message }
            }
        }
    }

    pub async fn refresh(&mut self) -> FetchOutcome {
        let ticket = self.begin_fetch();
        let span = info_span!(
            "list_jobs",
            session = %self.session_id,
            source = %self.store.source(),
            seq = ticket.seq
        );
        let result = self.gateway.list_jobs(ticket.query()).instrument(span).await;
        self.complete_fetch(ticket, result)
    }

    /// Create is confirmed-only: nothing is inserted until the backend
    /// returns the persisted record.
    pub async fn submit_create(&mut self, job: NewJob) -> Result<CreateOutcome, ViewError> {
        if let Err(err) = job.validate() {
            self.create_form = CreateForm {
                draft: Some(job),
                error: Some(err.to_string()),
                submitting: false,
            };
            return Err(err.into());
        }

        let source = self.store.source();
        self.create_form = CreateForm {
            draft: Some(job.clone()),
            error: None,
            submitting: true,
        };
        let span = info_span!("create_job", session = %self.session_id, %source);
        let result = self
            .gateway
            .create_job(source, &job)
            .instrument(span)
            .await
            .and_then(|resp| confirm(resp, "Failed to add job"));

        match result {
            Ok(CreateJobResponse { job: Some(raw), .. }) => {
                self.create_form = CreateForm::default();
                let record = normalize(raw, source);
                if self.store.apply_create(record.clone()) {
                    info!(id = %record.id, "created job");
                    Ok(CreateOutcome::Inserted(record))
                } else {
                    debug!(
                        id = %record.id,
                        created_in = %record.source,
                        "created job belongs to the other tab"
                    );
                    Ok(CreateOutcome::OtherTab(record))
                }
            }
            Ok(CreateJobResponse { job: None, .. }) => {
                self.create_form = CreateForm::default();
                warn!("create acknowledged without a job body; refreshing list");
                Ok(CreateOutcome::Refreshed(self.refresh().await))
            }
            Err(err) => {
                warn!(error = %err, "create failed; keeping form data");
                self.create_form.submitting = false;
                self.create_form.error = Some(err.user_message());
                Err(err.into())
            }
        }
    }

    pub fn cancel_create(&mut self) {
        self.create_form = CreateForm::default();
    }

    pub fn press_delete(&mut self, id: &JobId) -> DeleteStep {
        if self.pending_deletes.contains(id) {
            return DeleteStep::AlreadyPending;
        }
        if !self.store.contains(id) {
            self.confirm.disarm(id);
            return DeleteStep::AlreadyGone;
        }
        match self.confirm.press(id, Instant::now()) {
            ConfirmPress::Armed { expires_at } => DeleteStep::Armed { expires_at },
            ConfirmPress::Confirmed => {
                self.pending_deletes.insert(id.clone());
                self.row_errors.remove(id);
                DeleteStep::Dispatch(DeleteTicket {
                    id: id.clone(),
                    source: self.store.source(),
                    epoch: self.epoch,
                })
            }
        }
    }

    /// The store only changes after the backend confirms the delete.
    pub fn complete_delete(
        &mut self,
        ticket: DeleteTicket,
        result: Result<DeleteJobResponse, GatewayError>,
    ) -> DeleteOutcome {
        if ticket.epoch != self.epoch {
            debug!(id = %ticket.id, "discarding delete result from a previous tab");
            return DeleteOutcome::Discarded;
        }
        self.pending_deletes.remove(&ticket.id);

        match result.and_then(|resp| confirm(resp, "Failed to delete job")) {
            Ok(_) => {
                self.store.apply_delete(&ticket.id);
                self.row_errors.remove(&ticket.id);
                info!(id = %ticket.id, source = %ticket.source, "deleted job");
                DeleteOutcome::Deleted
            }
            Err(err) if err.is_rejection() && !self.store.contains(&ticket.id) => {
                debug!(id = %ticket.id, "delete rejected for a record already gone locally");
                DeleteOutcome::AlreadyGone
            }
            Err(err) => {
                let message = err.user_message();
                warn!(id = %ticket.id, error = %err, "delete failed; record kept");
                self.row_errors.insert(ticket.id, message.clone());
                DeleteOutcome::Failed { message }
            }
        }
    }

    pub async fn click_delete(&mut self, id: &JobId) -> DeleteOutcome {
        let ticket = match self.press_delete(id) {
            DeleteStep::Armed { .. } => return DeleteOutcome::Armed,
            DeleteStep::AlreadyPending => return DeleteOutcome::AlreadyPending,
            DeleteStep::AlreadyGone => return DeleteOutcome::AlreadyGone,
            DeleteStep::Dispatch(ticket) => ticket,
        };
        let span = info_span!(
            "delete_job",
            session = %self.session_id,
            id = %ticket.id,
            source = %ticket.source
        );
        let result = self
            .gateway
            .delete_job(ticket.source, &ticket.id)
            .instrument(span)
            .await;
        let outcome = self.complete_delete(ticket, result);
        if outcome == DeleteOutcome::Deleted {
            self.refresh_stats().await;
        }
        outcome
    }

    /// Side query; failure falls back to placeholders and never touches the list.
    pub async fn refresh_stats(&mut self) -> bool {
        let span = info_span!("job_stats", session = %self.session_id);
        match self
            .gateway
            .job_stats()
            .instrument(span)
            .await
            .and_then(|resp| confirm(resp, "Failed to retrieve job statistics"))
        {
            Ok(stats) => {
                self.stats = StatsPanel::Loaded(stats);
                true
            }
            Err(err) => {
                warn!(error = %err, "job stats unavailable; showing placeholders");
                self.stats = StatsPanel::Placeholder;
                false
            }
        }
    }

    pub async fn refresh_scraper_status(&mut self) -> bool {
        match self.fetch_scraper_status().await {
            Ok(status) => {
                self.record_scraper_status(status);
                true
            }
            Err(err) => {
                warn!(error = %err, "scraper status unavailable; showing placeholders");
                self.scraper = ScraperPanel::Placeholder;
                self.set_health(Source::Scraped, BackendHealth::Error);
                false
            }
        }
    }

    async fn fetch_scraper_status(&self) -> Result<ScraperStatusResponse, GatewayError> {
        let span = info_span!("scraper_status", session = %self.session_id);
        self.gateway
            .scraper_status()
            .instrument(span)
            .await
            .and_then(|resp| confirm(resp, "Failed to get scraper status"))
    }

    fn record_scraper_status(&mut self, status: ScraperStatusResponse) {
        self.scraper = ScraperPanel::Loaded(status);
        self.set_health(Source::Scraped, BackendHealth::Connected);
    }

    /// Run the scraper, then poll its status with backoff until the last
    /// update timestamp moves or the poll timeout elapses.
    pub async fn trigger_scraper(&mut self) -> Result<ScrapeReport, ViewError> {
        let baseline = match self.fetch_scraper_status().await {
            Ok(status) => {
                let baseline = status.most_recent_update().map(str::to_string);
                self.record_scraper_status(status);
                baseline
            }
            Err(err) => {
                debug!(error = %err, "no scraper status baseline");
                None
            }
        };

        let span = info_span!("run_scraper", session = %self.session_id);
        let run = self
            .gateway
            .run_scraper()
            .instrument(span)
            .await
            .and_then(|resp| confirm(resp, "Failed to trigger job scraper"))?;
        let jobs_processed = run.jobs_processed.unwrap_or(0);
        info!(jobs_processed, "scraper run acknowledged");

        let settle = if jobs_processed == 0 {
            ScrapeSettle::NothingNew
        } else {
            self.await_scrape_settle(baseline.as_deref()).await
        };

        let list = if self.store.source() == Source::Scraped {
            Some(self.refresh().await)
        } else {
            None
        };
        self.refresh_stats().await;
        if settle != ScrapeSettle::Observed {
            self.refresh_scraper_status().await;
        }

        Ok(ScrapeReport {
            jobs_processed,
            settle,
            list,
        })
    }

    async fn await_scrape_settle(&mut self, baseline: Option<&str>) -> ScrapeSettle {
        let policy = self.scrape_poll;
        let started = Instant::now();
        let mut attempt = 0usize;
        loop {
            let delay = policy.backoff.delay_for_attempt(attempt);
            if started.elapsed() + delay > policy.timeout {
                warn!(attempts = attempt, "scraper status did not advance before timeout");
                return ScrapeSettle::TimedOut;
            }
            tokio::time::sleep(delay).await;

            match self.fetch_scraper_status().await {
                Ok(status) => {
                    let latest = status.most_recent_update();
                    let advanced = latest.is_some() && latest != baseline;
                    self.record_scraper_status(status);
                    if advanced {
                        return ScrapeSettle::Observed;
                    }
                }
                Err(err) => debug!(error = %err, attempt, "scraper status poll failed"),
            }
            attempt += 1;
        }
    }
}

fn push_unique(out: &mut Vec<String>, value: String) {
    if !value.is_empty() && !out.contains(&value) {
        out.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_core::RawJob;
    use serde_json::json;

    fn job(id: &str, company: &str, location: Option<&str>, source: Source) -> JobRecord {
        normalize(
            RawJob {
                id: Some(json!(id)),
                title: Some("Actuary".into()),
                company: Some(company.into()),
                location: location.map(str::to_string),
                source: Some(source.as_str().into()),
                ..Default::default()
            },
            source,
        )
    }

    fn seeded() -> AggregationStore {
        let mut store = AggregationStore::new(Source::Manual);
        store.set_all(vec![
            job("a", "Acme", Some("Lahore"), Source::Manual),
            job("b", "Beta", Some("Karachi"), Source::Manual),
        ]);
        store
    }

    #[test]
    fn company_filter_narrows_to_matching_record() {
        let view = seeded().view(&FilterSet::default().with_company("ac"));
        assert_eq!(view.count, 1);
        assert_eq!(view.items[0].id, JobId::parse("a"));
        assert_eq!(view.summary(), "1 job found");
    }

    #[test]
    fn facets_cover_the_unfiltered_collection() {
        let view = seeded().view(&FilterSet::default().with_company("ac"));
        assert_eq!(
            view.facets.companies.iter().cloned().collect::<Vec<_>>(),
            vec!["Acme".to_string(), "Beta".to_string()]
        );
        assert_eq!(view.facets.locations.len(), 2);
    }

    #[test]
    fn facets_keep_first_seen_order_and_skip_fallback_company() {
        let mut store = AggregationStore::new(Source::Manual);
        store.set_all(vec![
            job("z", "Zeta", Some("Multan"), Source::Manual),
            job("a", "Acme", Some("Lahore"), Source::Manual),
            job("n", "", Some(""), Source::Manual),
            job("z2", "Zeta", Some("Multan"), Source::Manual),
        ]);
        let facets = store.facets();
        assert_eq!(facets.companies, vec!["Zeta", "Acme"]);
        assert_eq!(facets.locations, vec!["Multan", "Lahore"]);
        assert_eq!(store.records()[2].company, UNKNOWN_COMPANY_LABEL);
    }

    #[test]
    fn set_all_preserves_server_order() {
        let store = seeded();
        let ids = store.records().iter().map(|r| r.id.to_string()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn create_for_other_source_is_ignored() {
        let mut store = seeded();
        let before = store.view(&FilterSet::default()).count;
        assert!(!store.apply_create(job("c", "Gamma", None, Source::Scraped)));
        assert_eq!(store.view(&FilterSet::default()).count, before);

        assert!(store.apply_create(job("d", "Delta", None, Source::Manual)));
        assert_eq!(store.records()[0].id, JobId::parse("d"));
        assert_eq!(store.len(), before + 1);
    }

    #[test]
    fn repeated_create_of_same_id_does_not_duplicate() {
        let mut store = seeded();
        assert!(store.apply_create(job("a", "Acme", Some("Multan"), Source::Manual)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].location.as_deref(), Some("Multan"));
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = seeded();
        assert!(store.apply_delete(&JobId::parse("a")));
        let count = store.view(&FilterSet::default()).count;
        assert!(!store.apply_delete(&JobId::parse("a")));
        assert_eq!(store.view(&FilterSet::default()).count, count);
        assert!(!store.apply_delete(&JobId::parse("zzz")));
    }

    #[test]
    fn confirm_window_arms_confirms_and_lapses() {
        let mut confirm = DeleteConfirm::new(Duration::from_secs(3));
        let id = JobId::parse("a");
        let t0 = Instant::now();

        assert!(matches!(confirm.press(&id, t0), ConfirmPress::Armed { .. }));
        assert!(confirm.is_armed(&id, t0 + Duration::from_secs(2)));
        assert_eq!(confirm.press(&id, t0 + Duration::from_secs(2)), ConfirmPress::Confirmed);
        assert!(!confirm.is_armed(&id, t0 + Duration::from_secs(2)));

        assert!(matches!(confirm.press(&id, t0), ConfirmPress::Armed { .. }));
        let late = t0 + Duration::from_secs(4);
        assert!(!confirm.is_armed(&id, late));
        assert!(matches!(confirm.press(&id, late), ConfirmPress::Armed { .. }));
    }

    #[test]
    fn confirm_windows_are_per_record() {
        let mut confirm = DeleteConfirm::new(Duration::from_secs(3));
        let t0 = Instant::now();
        confirm.press(&JobId::parse("a"), t0);
        assert!(matches!(
            confirm.press(&JobId::parse("b"), t0),
            ConfirmPress::Armed { .. }
        ));
        assert_eq!(confirm.press(&JobId::parse("a"), t0), ConfirmPress::Confirmed);
    }

    #[test]
    fn placeholders_render_when_panels_are_unloaded() {
        assert_eq!(StatsPanel::Placeholder.total_label(), PLACEHOLDER_LABEL);
        assert_eq!(StatsPanel::Placeholder.source_total_label(Source::Scraped), PLACEHOLDER_LABEL);
        assert_eq!(ScraperPanel::Placeholder.last_update_label(), NO_SCRAPE_DATA_LABEL);
        assert_eq!(ScraperPanel::Placeholder.schedule_label(), PLACEHOLDER_LABEL);
    }

    #[test]
    fn backend_health_labels() {
        assert_eq!(BackendHealth::default().label(), "Checking...");
        assert_eq!(BackendHealth::Error.label(), "Error");
    }
}
