//! Canonical job record model, record normalization and client-side filtering for jobhub.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub const CRATE_NAME: &str = "jobhub-core";

pub const UNKNOWN_DATE_LABEL: &str = "Unknown date";
pub const UNTITLED_LABEL: &str = "Untitled position";
pub const UNKNOWN_COMPANY_LABEL: &str = "Unknown company";
pub const DEFAULT_JOB_TYPE: &str = "Full-time";

const POSTING_DATE_FORMAT: &str = "%Y-%m-%d";
const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

/// Which backend a record was created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Manual,
    Scraped,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Manual, Source::Scraped];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Manual => "manual",
            Source::Scraped => "scraped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(Source::Manual),
            "scraped" => Some(Source::Scraped),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural guess at which store issued an identifier. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    DocumentStore,
    RelationalStore,
}

impl IdKind {
    pub fn badge(&self) -> &'static str {
        match self {
            IdKind::DocumentStore => "doc",
            IdKind::RelationalStore => "sql",
        }
    }
}

/// True for exactly 24 lowercase hexadecimal characters.
pub fn is_document_id(value: &str) -> bool {
    value.len() == 24
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Classify any id value seen on the wire. Total over all JSON values.
pub fn derive_id_kind(raw: &JsonValue) -> IdKind {
    match raw {
        JsonValue::String(s) if is_document_id(s) => IdKind::DocumentStore,
        _ => IdKind::RelationalStore,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationalId {
    Int(i64),
    Text(String),
}

/// Record identifier, classified once when the record is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobId {
    Document(String),
    Relational(RelationalId),
}

impl JobId {
    /// Parse user- or wire-supplied id text. Canonical integers become `Int`.
    pub fn parse(text: &str) -> Self {
        if is_document_id(text) {
            return JobId::Document(text.to_string());
        }
        match text.parse::<i64>() {
            Ok(n) if n.to_string() == text => JobId::Relational(RelationalId::Int(n)),
            _ => JobId::Relational(RelationalId::Text(text.to_string())),
        }
    }

    pub fn from_raw(raw: &JsonValue) -> Self {
        match raw {
            JsonValue::String(s) => Self::parse(s),
            JsonValue::Number(n) => match n.as_i64() {
                Some(n) => JobId::Relational(RelationalId::Int(n)),
                None => JobId::Relational(RelationalId::Text(n.to_string())),
            },
            JsonValue::Null => JobId::Relational(RelationalId::Text(String::new())),
            other => JobId::Relational(RelationalId::Text(other.to_string())),
        }
    }

    pub fn kind(&self) -> IdKind {
        match self {
            JobId::Document(_) => IdKind::DocumentStore,
            JobId::Relational(_) => IdKind::RelationalStore,
        }
    }

    /// Unencoded text for a single URL path segment; the HTTP layer percent-encodes it.
    pub fn as_path_segment(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobId::Document(s) | JobId::Relational(RelationalId::Text(s)) => f.write_str(s),
            JobId::Relational(RelationalId::Int(n)) => write!(f, "{n}"),
        }
    }
}

impl Serialize for JobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JobId::Relational(RelationalId::Int(n)) => serializer.serialize_i64(*n),
            JobId::Document(s) | JobId::Relational(RelationalId::Text(s)) => {
                serializer.serialize_str(s)
            }
        }
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;
        Ok(JobId::from_raw(&raw))
    }
}

/// Date-valued field as received. Text that does not parse is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Unparsed(String),
}

impl DateValue {
    /// Backend wire format (`YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`).
    pub fn to_wire(&self) -> String {
        match self {
            DateValue::Date(d) => d.format(POSTING_DATE_FORMAT).to_string(),
            DateValue::Timestamp(ts) => ts.format(WIRE_TIMESTAMP_FORMAT).to_string(),
            DateValue::Unparsed(raw) => raw.clone(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            DateValue::Date(d) => d.format(DISPLAY_DATE_FORMAT).to_string(),
            DateValue::Timestamp(ts) => ts.date().format(DISPLAY_DATE_FORMAT).to_string(),
            DateValue::Unparsed(raw) if raw.trim().is_empty() => UNKNOWN_DATE_LABEL.to_string(),
            DateValue::Unparsed(raw) => raw.clone(),
        }
    }
}

impl Serialize for DateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(parse_date_value(&text).unwrap_or(DateValue::Unparsed(text)))
    }
}

/// `None` for blank input; unparseable text becomes `DateValue::Unparsed`.
pub fn parse_date_value(text: &str) -> Option<DateValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, POSTING_DATE_FORMAT) {
        return Some(DateValue::Date(d));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, WIRE_TIMESTAMP_FORMAT) {
        return Some(DateValue::Timestamp(ts));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(DateValue::Timestamp(ts.naive_utc()));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(DateValue::Timestamp(ts.naive_utc()));
    }
    Some(DateValue::Unparsed(text.to_string()))
}

pub fn display_date(value: Option<&DateValue>) -> String {
    value
        .map(DateValue::label)
        .unwrap_or_else(|| UNKNOWN_DATE_LABEL.to_string())
}

/// Job record as either backend serves it. Every field is optional and
/// loosely typed so that deserializing a record object never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<JsonValue>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub salary: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub experience_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub posting_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        Some(JsonValue::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Canonical post-normalization job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting_date: Option<DateValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateValue>,
    pub source: Source,
}

impl JobRecord {
    pub fn id_kind(&self) -> IdKind {
        self.id.kind()
    }

    pub fn field(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::Company => Some(self.company.as_str()),
            FilterField::Location => self.location.as_deref(),
            FilterField::JobType => self.job_type.as_deref(),
        }
    }

    pub fn posting_date_label(&self) -> String {
        display_date(self.posting_date.as_ref())
    }
}

/// Convert a raw record into canonical form. `origin` is the source context
/// the record was listed or created under; it only applies when the record
/// does not carry a recognizable `source` of its own.
pub fn normalize(raw: RawJob, origin: Source) -> JobRecord {
    let raw_id = raw
        .id
        .or(raw.document_id)
        .map(unwrap_extended_oid)
        .unwrap_or(JsonValue::Null);

    JobRecord {
        id: JobId::from_raw(&raw_id),
        title: required_text(raw.title, UNTITLED_LABEL),
        company: required_text(raw.company, UNKNOWN_COMPANY_LABEL),
        location: raw.location,
        salary: raw.salary,
        job_type: raw.job_type,
        description: raw.description,
        url: raw.url,
        experience_level: raw.experience_level,
        posting_date: raw.posting_date.as_deref().and_then(parse_date_value),
        created_at: raw.created_at.as_deref().and_then(parse_date_value),
        updated_at: raw.updated_at.as_deref().and_then(parse_date_value),
        source: raw.source.as_deref().and_then(Source::parse).unwrap_or(origin),
    }
}

pub fn normalize_all(raws: Vec<RawJob>, origin: Source) -> Vec<JobRecord> {
    raws.into_iter().map(|raw| normalize(raw, origin)).collect()
}

// Document-store ids may arrive in extended JSON form: {"$oid": "..."}.
fn unwrap_extended_oid(value: JsonValue) -> JsonValue {
    if let Some(oid) = value.get("$oid").and_then(JsonValue::as_str) {
        return JsonValue::String(oid.to_string());
    }
    value
}

fn required_text(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Company,
    Location,
    JobType,
}

/// Optional case-insensitive substring predicates, AND-ed across fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
}

impl FilterSet {
    pub fn with_company(mut self, value: impl Into<String>) -> Self {
        self.company = Some(value.into());
        self
    }

    pub fn with_location(mut self, value: impl Into<String>) -> Self {
        self.location = Some(value.into());
        self
    }

    pub fn with_job_type(mut self, value: impl Into<String>) -> Self {
        self.job_type = Some(value.into());
        self
    }

    /// Present, non-empty predicates in field order.
    pub fn predicates(&self) -> Vec<(FilterField, &str)> {
        [
            (FilterField::Company, self.company.as_deref()),
            (FilterField::Location, self.location.as_deref()),
            (FilterField::JobType, self.job_type.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(v) if !v.is_empty() => Some((field, v)),
            _ => None,
        })
        .collect()
    }

    pub fn active_count(&self) -> usize {
        self.predicates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn clear(&mut self) {
        *self = FilterSet::default();
    }
}

pub fn matches(record: &JobRecord, filters: &FilterSet) -> bool {
    filters
        .predicates()
        .into_iter()
        .all(|(field, needle)| match record.field(field) {
            Some(haystack) => contains_ignore_case(haystack, needle),
            None => false,
        })
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid posting date {0:?}; use YYYY-MM-DD")]
    InvalidPostingDate(String),
}

/// Create payload. Sent without an id; the backend assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

impl NewJob {
    /// Form defaults: today's posting date and a full-time job type.
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: None,
            description: None,
            posting_date: Some(Utc::now().date_naive().format(POSTING_DATE_FORMAT).to_string()),
            url: None,
            salary: None,
            job_type: Some(DEFAULT_JOB_TYPE.to_string()),
            experience_level: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.company.trim().is_empty() {
            return Err(ValidationError::MissingField("company"));
        }
        if let Some(date) = self.posting_date.as_deref().filter(|d| !d.is_empty()) {
            NaiveDate::parse_from_str(date, POSTING_DATE_FORMAT)
                .map_err(|_| ValidationError::InvalidPostingDate(date.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, company: &str, location: Option<&str>) -> JobRecord {
        normalize(
            RawJob {
                id: Some(json!(id)),
                title: Some("Analyst".into()),
                company: Some(company.into()),
                location: location.map(str::to_string),
                ..Default::default()
            },
            Source::Manual,
        )
    }

    #[test]
    fn id_kind_classification_is_structural() {
        assert_eq!(derive_id_kind(&json!("507f1f77bcf86cd799439011")), IdKind::DocumentStore);
        assert_eq!(derive_id_kind(&json!("42")), IdKind::RelationalStore);
        assert_eq!(derive_id_kind(&json!(42)), IdKind::RelationalStore);
        assert_eq!(derive_id_kind(&json!("507F1F77BCF86CD799439011")), IdKind::RelationalStore);
        assert_eq!(derive_id_kind(&json!("507f1f77bcf86cd79943901")), IdKind::RelationalStore);
        assert_eq!(derive_id_kind(&JsonValue::Null), IdKind::RelationalStore);
        assert_eq!(derive_id_kind(&json!({"nested": true})), IdKind::RelationalStore);

        let id = json!("507f1f77bcf86cd799439011");
        assert_eq!(derive_id_kind(&id), derive_id_kind(&id));
        assert_eq!(JobId::from_raw(&id).kind(), derive_id_kind(&id));
    }

    #[test]
    fn numeric_ids_canonicalize_across_wire_shapes() {
        assert_eq!(JobId::from_raw(&json!(42)), JobId::from_raw(&json!("42")));
        assert_eq!(JobId::parse("42"), JobId::Relational(RelationalId::Int(42)));
        assert_eq!(
            JobId::parse("007"),
            JobId::Relational(RelationalId::Text("007".into()))
        );
        assert_eq!(JobId::from_raw(&json!(42)).to_string(), "42");
        assert_eq!(serde_json::to_value(JobId::parse("42")).unwrap(), json!(42));
    }

    #[test]
    fn normalize_accepts_document_store_shape() {
        let raw: RawJob = serde_json::from_value(json!({
            "_id": {"$oid": "65a1b2c3d4e5f60718293a4b"},
            "title": "Actuarial Analyst",
            "company": "Acme",
            "posting_date": "2024-03-04",
            "created_at": "2024-03-05 10:11:12",
            "source": "manual"
        }))
        .unwrap();
        let job = normalize(raw, Source::Scraped);

        assert_eq!(job.id, JobId::Document("65a1b2c3d4e5f60718293a4b".into()));
        assert_eq!(job.id_kind(), IdKind::DocumentStore);
        assert_eq!(job.source, Source::Manual);
        assert_eq!(job.posting_date_label(), "Mar 4, 2024");
        assert!(matches!(job.created_at, Some(DateValue::Timestamp(_))));
        assert_eq!(job.location, None);
    }

    #[test]
    fn normalize_is_total_over_sparse_and_odd_records() {
        let raw: RawJob = serde_json::from_value(json!({
            "id": 7,
            "title": "",
            "company": null,
            "salary": 50000,
            "posting_date": "not a date",
            "source": "crawler"
        }))
        .unwrap();
        let job = normalize(raw, Source::Scraped);

        assert_eq!(job.id, JobId::Relational(RelationalId::Int(7)));
        assert_eq!(job.title, UNTITLED_LABEL);
        assert_eq!(job.company, UNKNOWN_COMPANY_LABEL);
        assert_eq!(job.salary.as_deref(), Some("50000"));
        assert_eq!(job.source, Source::Scraped);
        assert_eq!(job.posting_date_label(), "not a date");
        assert_eq!(display_date(job.updated_at.as_ref()), UNKNOWN_DATE_LABEL);

        let empty = normalize(RawJob::default(), Source::Manual);
        assert_eq!(empty.id, JobId::Relational(RelationalId::Text(String::new())));
        assert_eq!(empty.source, Source::Manual);
    }

    #[test]
    fn source_is_never_inferred_from_id_kind() {
        let raw: RawJob = serde_json::from_value(json!({
            "id": "507f1f77bcf86cd799439011",
            "title": "Pricing Actuary",
            "company": "Beta"
        }))
        .unwrap();
        let job = normalize(raw, Source::Scraped);
        assert_eq!(job.id_kind(), IdKind::DocumentStore);
        assert_eq!(job.source, Source::Scraped);
    }

    #[test]
    fn absent_location_is_distinct_from_empty() {
        let absent: RawJob = serde_json::from_value(json!({"id": 1, "title": "a", "company": "b"})).unwrap();
        let empty: RawJob =
            serde_json::from_value(json!({"id": 1, "title": "a", "company": "b", "location": ""})).unwrap();
        assert_eq!(normalize(absent, Source::Scraped).location, None);
        assert_eq!(normalize(empty, Source::Scraped).location, Some(String::new()));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let job = record("a", "Acme", None);
        assert!(matches(&job, &FilterSet::default()));
        let blank = FilterSet::default()
            .with_company("")
            .with_location("")
            .with_job_type("");
        assert!(matches(&job, &blank));
        assert!(blank.is_empty());
    }

    #[test]
    fn absent_field_fails_a_present_predicate() {
        let job = record("a", "Acme", None);
        assert!(!matches(&job, &FilterSet::default().with_location("lahore")));
        assert!(!matches(&job, &FilterSet::default().with_job_type("full")));
    }

    #[test]
    fn filters_are_case_insensitive_and_conjoined() {
        let job = record("a", "Acme Insurance", Some("Lahore"));
        assert!(matches(&job, &FilterSet::default().with_company("ac")));
        assert!(matches(&job, &FilterSet::default().with_company("INSUR").with_location("lah")));
        assert!(!matches(&job, &FilterSet::default().with_company("acme").with_location("karachi")));
    }

    #[test]
    fn active_filter_count_and_clear() {
        let mut filters = FilterSet::default().with_company("acme").with_location("");
        assert_eq!(filters.active_count(), 1);
        filters.clear();
        assert_eq!(filters, FilterSet::default());
    }

    #[test]
    fn new_job_validation() {
        assert!(NewJob::new("Actuary", "Acme").validate().is_ok());
        assert_eq!(
            NewJob::new("  ", "Acme").validate(),
            Err(ValidationError::MissingField("title"))
        );
        assert_eq!(
            NewJob::new("Actuary", "").validate(),
            Err(ValidationError::MissingField("company"))
        );
        let mut bad_date = NewJob::new("Actuary", "Acme");
        bad_date.posting_date = Some("04/03/2024".into());
        assert_eq!(
            bad_date.validate(),
            Err(ValidationError::InvalidPostingDate("04/03/2024".into()))
        );
    }

    #[test]
    fn record_serializes_in_wire_shape() {
        let raw: RawJob = serde_json::from_value(json!({
            "id": 3,
            "title": "Actuary",
            "company": "Acme",
            "posting_date": "2024-01-02"
        }))
        .unwrap();
        let value = serde_json::to_value(normalize(raw, Source::Scraped)).unwrap();
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["posting_date"], json!("2024-01-02"));
        assert_eq!(value["source"], json!("scraped"));
        assert!(value.get("location").is_none());
    }
}
