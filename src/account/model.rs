use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Paid amounts within this distance are treated as equal.
pub const AMOUNT_EPSILON: f64 = 0.005;

/// The account families the backend exposes with the same ledger shape.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Customer,
    Supplier,
    Transport,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Customer,
        EntityKind::Supplier,
        EntityKind::Transport,
    ];

    /// Collection endpoint used for paginated listing
    pub fn collection_path(self) -> &'static str {
        match self {
            EntityKind::Customer => "/api/customer/accounts",
            EntityKind::Supplier => "/api/supplier/accounts",
            EntityKind::Transport => "/api/transportpayments/all",
        }
    }

    /// Base path for single-record calls (`{base}/{id}`)
    pub fn record_path(self) -> &'static str {
        match self {
            EntityKind::Customer => "/api/customer/accounts",
            EntityKind::Supplier => "/api/supplier/accounts",
            EntityKind::Transport => "/api/transportpayments",
        }
    }

    /// Key the browser front end used in local storage for checked rows
    pub fn legacy_storage_key(self) -> &'static str {
        match self {
            EntityKind::Customer => "selectedCustomerAccountIds",
            EntityKind::Supplier => "selectedSupplierAccountIds",
            EntityKind::Transport => "selectedTransportPaymentIds",
        }
    }

    pub fn from_legacy_storage_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.legacy_storage_key() == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Supplier => "supplier",
            EntityKind::Transport => "transport",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Opaque backend identifier. The API sends either strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RecordId(s),
            Raw::Signed(n) => RecordId(n.to_string()),
            Raw::Unsigned(n) => RecordId(n.to_string()),
        })
    }
}

/// Explicit bucket a payment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaymentCategory {
    Bill,
    Cash,
}

impl fmt::Display for PaymentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentCategory::Bill => write!(f, "bill"),
            PaymentCategory::Cash => write!(f, "cash"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(deserialize_with = "wire::amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "wire::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    /// Set at creation time by clients that know the bucket; older
    /// entries only carry the remark prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<PaymentCategory>,
}

/// One customer, supplier or transport account as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireRecord")]
pub struct LedgerRecord {
    pub id: RecordId,
    pub name: String,
    pub billed_amount: f64,
    /// Insertion order is recording order, not payment date.
    pub payments: Vec<Payment>,
    /// Server-computed paid figure; wins over the local sum when present.
    #[serde(rename = "paidAmount", skip_serializing_if = "Option::is_none")]
    pub paid_override: Option<f64>,
}

/// Every spelling the backends use gets its own slot, so a body carrying
/// both `id` and `_id` still decodes.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default, rename = "_id")]
    object_id: Option<RecordId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    account_name: Option<String>,
    #[serde(default, deserialize_with = "wire::amount")]
    billed_amount: f64,
    #[serde(default, deserialize_with = "wire::opt_list")]
    payments: Vec<Payment>,
    #[serde(default, deserialize_with = "wire::opt_amount")]
    paid_amount: Option<f64>,
}

impl TryFrom<WireRecord> for LedgerRecord {
    type Error = String;

    fn try_from(raw: WireRecord) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .or(raw.object_id)
            .ok_or_else(|| "record has neither 'id' nor '_id'".to_string())?;
        Ok(LedgerRecord {
            id,
            name: raw.name.or(raw.account_name).unwrap_or_default(),
            billed_amount: raw.billed_amount,
            payments: raw.payments,
            paid_override: raw.paid_amount,
        })
    }
}

impl LedgerRecord {
    pub fn payments_total(&self) -> f64 {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn paid_amount(&self) -> f64 {
        self.paid_override.unwrap_or_else(|| self.payments_total())
    }

    /// May be negative when the backend reports overpayment.
    pub fn pending_amount(&self) -> f64 {
        self.billed_amount - self.paid_amount()
    }

    /// `(server, local)` when the override and the payment sum disagree.
    pub fn paid_disagreement(&self) -> Option<(f64, f64)> {
        let server = self.paid_override?;
        let local = self.payments_total();
        ((server - local).abs() > AMOUNT_EPSILON).then_some((server, local))
    }
}

/// Lenient decoders for the JSON the backend emits.
pub(crate) mod wire {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    fn parse_amount<E: de::Error>(raw: RawAmount) -> Result<f64, E> {
        match raw {
            RawAmount::Number(n) => Ok(n),
            RawAmount::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                trimmed
                    .replace(',', "")
                    .parse::<f64>()
                    .map_err(|_| E::custom(format!("invalid amount '{s}'")))
            }
        }
    }

    pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw: Option<RawAmount> = Option::deserialize(deserializer)?;
        raw.map_or(Ok(0.0), parse_amount)
    }

    pub fn opt_amount<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        let raw: Option<RawAmount> = Option::deserialize(deserializer)?;
        raw.map(parse_amount).transpose()
    }

    /// `null` and a missing list both mean no entries.
    pub fn opt_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Accepts `YYYY-MM-DD` and ISO timestamps; keeps only the date part.
    pub fn opt_date<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else { return Ok(None) };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let head = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(head, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid date '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> LedgerRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        let a = record(json!({"id": "abc", "billedAmount": 0}));
        let b = record(json!({"id": 42, "billedAmount": 0}));
        let c = record(json!({"_id": "65f0", "billedAmount": 0}));
        assert_eq!(a.id.as_str(), "abc");
        assert_eq!(b.id.as_str(), "42");
        assert_eq!(c.id.as_str(), "65f0");
    }

    #[test]
    fn both_id_spellings_in_one_record() {
        let r = record(json!({
            "_id": "65f0",
            "id": "65f0",
            "name": "Acme",
            "accountName": "Acme Traders",
            "billedAmount": 10,
            "payments": null
        }));
        assert_eq!(r.id.as_str(), "65f0");
        assert_eq!(r.name, "Acme");
        assert!(r.payments.is_empty());

        let r = record(json!({"_id": "65f1", "accountName": "Only Legacy"}));
        assert_eq!(r.id.as_str(), "65f1");
        assert_eq!(r.name, "Only Legacy");
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = serde_json::from_value::<LedgerRecord>(json!({"name": "x"})).unwrap_err();
        assert!(err.to_string().contains("neither 'id' nor '_id'"));
    }

    #[test]
    fn paid_falls_back_to_payment_sum() {
        let r = record(json!({
            "id": 1,
            "billedAmount": 500,
            "payments": [
                {"amount": 100, "date": "2024-03-01", "method": "upi", "remark": "bill: x"},
                {"amount": "50.5", "date": "2024-03-02T09:30:00.000Z"}
            ]
        }));
        assert_eq!(r.payments_total(), 150.5);
        assert_eq!(r.paid_amount(), 150.5);
        assert_eq!(r.pending_amount(), 349.5);
        assert_eq!(
            r.payments[1].date,
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
        assert!(r.paid_disagreement().is_none());
    }

    #[test]
    fn server_paid_amount_wins() {
        let r = record(json!({
            "id": 1,
            "billedAmount": 100,
            "paidAmount": 80,
            "payments": [{"amount": 60}]
        }));
        assert_eq!(r.paid_amount(), 80.0);
        assert_eq!(r.pending_amount(), 20.0);
        assert_eq!(r.paid_disagreement(), Some((80.0, 60.0)));
    }

    #[test]
    fn pending_is_not_clamped() {
        let r = record(json!({"id": 1, "billedAmount": 10, "payments": [{"amount": 25}]}));
        assert_eq!(r.pending_amount(), -15.0);
    }

    #[test]
    fn null_and_missing_amounts_are_zero() {
        let r = record(json!({"id": 1, "billedAmount": null}));
        assert_eq!(r.billed_amount, 0.0);
        assert!(r.payments.is_empty());
        assert!(r.paid_override.is_none());
    }

    #[test]
    fn bad_amount_text_is_rejected() {
        let err = serde_json::from_value::<LedgerRecord>(json!({"id": 1, "billedAmount": "ten"}));
        assert!(err.is_err());
    }

    #[test]
    fn legacy_keys_map_back_to_kinds() {
        for kind in EntityKind::ALL {
            assert_eq!(
                EntityKind::from_legacy_storage_key(kind.legacy_storage_key()),
                Some(kind)
            );
        }
        assert_eq!(EntityKind::from_legacy_storage_key("theme"), None);
    }
}
