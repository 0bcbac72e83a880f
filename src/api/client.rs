use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};
use ureq::Agent;

use crate::account::{wire, EntityKind, LedgerRecord, PaymentCategory, RecordId};
use crate::api::ListQuery;
use crate::config::{ApiSettings, Role};
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Moves one request to the backend. Non-2xx statuses are returned as data.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

pub struct HttpTransport {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(settings: &ApiSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    fn prepare<B>(
        &self,
        mut builder: ureq::RequestBuilder<B>,
        request: &ApiRequest,
    ) -> ureq::RequestBuilder<B> {
        for (key, value) in &request.query {
            builder = builder.query(*key, value);
        }
        builder = builder.header("Accept", "application/json");
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);

        let result = match request.method {
            Method::Get => self.prepare(self.agent.get(url.as_str()), request).call(),
            Method::Delete => self.prepare(self.agent.delete(url.as_str()), request).call(),
            Method::Post => {
                let builder = self
                    .prepare(self.agent.post(url.as_str()), request)
                    .header("Content-Type", "application/json");
                match &request.body {
                    Some(body) => builder.send(body.as_str()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| LedgerError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| LedgerError::Transport {
                url,
                reason: e.to_string(),
            })?;

        Ok(ApiResponse { status, body })
    }
}

/// Aggregates computed server-side over the entire filtered set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub billed: f64,
    pub paid: f64,
    pub pending: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<LedgerRecord>,
    pub total_count: usize,
    pub totals: Totals,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.items.iter().map(|r| r.id.clone()).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTotals {
    #[serde(default, deserialize_with = "wire::opt_amount")]
    billed_amount: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_amount")]
    total_billed: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_amount")]
    paid_amount: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_amount")]
    total_paid: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_amount")]
    pending_amount: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_amount")]
    total_pending: Option<f64>,
}

impl From<WireTotals> for Totals {
    fn from(raw: WireTotals) -> Self {
        let billed = raw.billed_amount.or(raw.total_billed).unwrap_or(0.0);
        let paid = raw.paid_amount.or(raw.total_paid).unwrap_or(0.0);
        Totals {
            billed,
            paid,
            pending: raw
                .pending_amount
                .or(raw.total_pending)
                .unwrap_or(billed - paid),
        }
    }
}

const ITEM_KEYS: [&str; 3] = ["items", "accounts", "data"];
const COUNT_KEYS: [&str; 3] = ["totalCount", "total", "count"];
const RECORD_KEYS: [&str; 3] = ["data", "account", "record"];

fn decode_error(e: serde_json::Error) -> LedgerError {
    LedgerError::Decode(e.to_string())
}

/// Remove the first non-null value stored under any of `keys`.
fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|key| map.remove(*key))
        .find(|value| !value.is_null())
}

/// A page arrives either as a bare array or as an object holding the items
/// under one of a few names. Objects without any item key are not pages.
fn decode_page(body: &str) -> Result<Page> {
    let value: Value = serde_json::from_str(body).map_err(decode_error)?;
    let mut map = match value {
        Value::Array(raw) => {
            let items: Vec<LedgerRecord> =
                serde_json::from_value(Value::Array(raw)).map_err(decode_error)?;
            return Ok(Page {
                total_count: items.len(),
                totals: Totals::default(),
                items,
            });
        }
        Value::Object(map) => map,
        other => {
            return Err(LedgerError::Decode(format!(
                "expected a list of accounts, got {other}"
            )))
        }
    };

    if !ITEM_KEYS.iter().any(|key| map.contains_key(*key)) {
        let detail = object_message(&map)
            .unwrap_or_else(|| format!("no {} field in response", ITEM_KEYS.join("/")));
        return Err(LedgerError::Decode(detail));
    }

    let items: Vec<LedgerRecord> = match take_first(&mut map, &ITEM_KEYS) {
        Some(raw) => serde_json::from_value(raw).map_err(decode_error)?,
        None => Vec::new(),
    };
    let total_count = match take_first(&mut map, &COUNT_KEYS) {
        Some(raw) => serde_json::from_value::<usize>(raw).map_err(decode_error)?,
        None => items.len(),
    };
    let totals = match take_first(&mut map, &["totals"]) {
        Some(raw) => serde_json::from_value::<WireTotals>(raw)
            .map_err(decode_error)?
            .into(),
        None => Totals::default(),
    };

    Ok(Page {
        items,
        total_count,
        totals,
    })
}

/// A single record, possibly wrapped as `{"data": {...}}` or similar.
fn decode_record(body: &str) -> Result<LedgerRecord> {
    let value = match serde_json::from_str::<Value>(body).map_err(decode_error)? {
        Value::Object(mut map) => match take_first(&mut map, &RECORD_KEYS) {
            Some(inner) if inner.is_object() => inner,
            _ => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(value).map_err(decode_error)
}

fn object_message(map: &Map<String, Value>) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub billed_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PaymentCategory>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

fn check_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount)
    }
}

/// Percent-encode an opaque id for use as a single path segment.
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Pull a human-readable message out of an error body.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = object_message(&map) {
            return msg;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(200).collect();
    }
    ureq::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("request failed")
        .to_string()
}

pub struct LedgerClient<T: Transport> {
    transport: T,
}

impl LedgerClient<HttpTransport> {
    pub fn from_settings(settings: &ApiSettings) -> Self {
        Self::new(HttpTransport::new(settings))
    }
}

impl<T: Transport> LedgerClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One page of records plus totals over the whole filtered set.
    pub fn list(&self, kind: EntityKind, query: &ListQuery) -> Result<Page> {
        let query = query.validate()?;
        let request = ApiRequest {
            method: Method::Get,
            path: kind.collection_path().to_string(),
            query: query.to_pairs(),
            body: None,
        };
        let body = self.execute(&request)?;
        if body.trim().is_empty() {
            return Ok(Page::default());
        }
        let page = decode_page(&body)?;
        debug!(
            kind = %kind,
            items = page.items.len(),
            total = page.total_count,
            "page received"
        );
        Ok(page)
    }

    pub fn get(&self, kind: EntityKind, id: &RecordId) -> Result<LedgerRecord> {
        let request = ApiRequest {
            method: Method::Get,
            path: record_path(kind, id, None),
            query: Vec::new(),
            body: None,
        };
        self.execute_record(&request)
    }

    pub fn create(&self, kind: EntityKind, account: &NewAccount) -> Result<LedgerRecord> {
        if account.name.trim().is_empty() {
            return Err(LedgerError::invalid_query("name", "must not be empty"));
        }
        if !account.billed_amount.is_finite() || account.billed_amount < 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        let request = ApiRequest {
            method: Method::Post,
            path: kind.record_path().to_string(),
            query: Vec::new(),
            body: Some(serde_json::to_string(account)?),
        };
        let record = self.execute_record(&request)?;
        info!(kind = %kind, id = %record.id, "account created");
        Ok(record)
    }

    /// Appends a payment entry; history is never rewritten.
    pub fn add_payment(
        &self,
        kind: EntityKind,
        id: &RecordId,
        payment: &NewPayment,
    ) -> Result<LedgerRecord> {
        check_amount(payment.amount)?;
        let request = ApiRequest {
            method: Method::Post,
            path: record_path(kind, id, Some("payments")),
            query: Vec::new(),
            body: Some(serde_json::to_string(payment)?),
        };
        let record = self.execute_record(&request)?;
        info!(kind = %kind, id = %id, amount = payment.amount, "payment recorded");
        Ok(record)
    }

    pub fn add_bill(&self, kind: EntityKind, id: &RecordId, bill: &NewBill) -> Result<LedgerRecord> {
        check_amount(bill.amount)?;
        let request = ApiRequest {
            method: Method::Post,
            path: record_path(kind, id, Some("bills")),
            query: Vec::new(),
            body: Some(serde_json::to_string(bill)?),
        };
        let record = self.execute_record(&request)?;
        info!(kind = %kind, id = %id, amount = bill.amount, "bill recorded");
        Ok(record)
    }

    pub fn delete(&self, kind: EntityKind, id: &RecordId, role: Role) -> Result<()> {
        if role != Role::Admin {
            return Err(LedgerError::Forbidden(role.to_string()));
        }
        let request = ApiRequest {
            method: Method::Delete,
            path: record_path(kind, id, None),
            query: Vec::new(),
            body: None,
        };
        self.execute(&request)?;
        info!(kind = %kind, id = %id, "account deleted");
        Ok(())
    }

    fn execute(&self, request: &ApiRequest) -> Result<String> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.transport.send(request)?;
        if !(200..300).contains(&response.status) {
            return Err(LedgerError::Api {
                status: response.status,
                message: error_message(response.status, &response.body),
            });
        }
        Ok(response.body)
    }

    fn execute_record(&self, request: &ApiRequest) -> Result<LedgerRecord> {
        let body = self.execute(request)?;
        decode_record(&body)
    }
}

fn record_path(kind: EntityKind, id: &RecordId, suffix: Option<&str>) -> String {
    let base = format!("{}/{}", kind.record_path(), encode_segment(id.as_str()));
    match suffix {
        Some(suffix) => format!("{base}/{suffix}"),
        None => base,
    }
}
