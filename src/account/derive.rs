use std::collections::BTreeSet;
use tracing::warn;

use super::model::{LedgerRecord, Payment, PaymentCategory, RecordId};
use crate::api::{SortDirection, SortField, SortSpec};

/// Decides which bucket a payment counts toward.
///
/// An explicit `category` always wins. Entries recorded before categories
/// existed are bucketed by a case-sensitive remark prefix; anything else is
/// left out of every bucket.
#[derive(Debug, Clone)]
pub struct Classifier {
    prefixes: Vec<(String, PaymentCategory)>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            prefixes: vec![
                ("bill:".to_string(), PaymentCategory::Bill),
                ("cash:".to_string(), PaymentCategory::Cash),
            ],
        }
    }
}

impl Classifier {
    pub fn with_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = (S, PaymentCategory)>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(|(p, c)| (p.into(), c)).collect(),
        }
    }

    pub fn classify(&self, payment: &Payment) -> Option<PaymentCategory> {
        if payment.category.is_some() {
            return payment.category;
        }
        let remark = payment.remark.as_deref()?;
        self.prefixes
            .iter()
            .find(|(prefix, _)| remark.starts_with(prefix.as_str()))
            .map(|(_, category)| *category)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub id: RecordId,
    pub name: String,
    pub billed: f64,
    pub paid: f64,
    pub pending: f64,
    pub bill_part: f64,
    pub cash_part: f64,
    pub payments_total: f64,
    /// Payments that matched no bucket
    pub unclassified: usize,
    pub last_payment: Option<chrono::NaiveDate>,
}

pub fn derive_record(record: &LedgerRecord, classifier: &Classifier) -> DerivedRecord {
    let mut bill_part = 0.0;
    let mut cash_part = 0.0;
    let mut payments_total = 0.0;
    let mut unclassified = 0;
    let mut last_payment = None;

    for payment in &record.payments {
        payments_total += payment.amount;
        match classifier.classify(payment) {
            Some(PaymentCategory::Bill) => bill_part += payment.amount,
            Some(PaymentCategory::Cash) => cash_part += payment.amount,
            None => unclassified += 1,
        }
        if payment.date > last_payment {
            last_payment = payment.date;
        }
    }

    if let Some((server, local)) = record.paid_disagreement() {
        warn!(
            id = %record.id,
            server_paid = server,
            payments_sum = local,
            "server paid amount disagrees with payment history"
        );
    }

    let paid = record.paid_amount();
    DerivedRecord {
        id: record.id.clone(),
        name: record.name.clone(),
        billed: record.billed_amount,
        paid,
        pending: record.billed_amount - paid,
        bill_part,
        cash_part,
        payments_total,
        unclassified,
        last_payment,
    }
}

pub fn derive_page(records: &[LedgerRecord], classifier: &Classifier) -> Vec<DerivedRecord> {
    records
        .iter()
        .map(|record| derive_record(record, classifier))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageSums {
    pub count: usize,
    pub billed: f64,
    pub paid: f64,
    pub pending: f64,
    pub bill_part: f64,
    pub cash_part: f64,
}

impl PageSums {
    fn add(mut self, record: &DerivedRecord) -> Self {
        self.count += 1;
        self.billed += record.billed;
        self.paid += record.paid;
        self.pending += record.pending;
        self.bill_part += record.bill_part;
        self.cash_part += record.cash_part;
        self
    }
}

pub fn sum_page(records: &[DerivedRecord]) -> PageSums {
    records.iter().fold(PageSums::default(), PageSums::add)
}

pub fn sum_selected(records: &[DerivedRecord], selected: &BTreeSet<RecordId>) -> PageSums {
    records
        .iter()
        .filter(|record| selected.contains(&record.id))
        .fold(PageSums::default(), PageSums::add)
}

/// Re-sort a page on locally derived figures. Stable.
pub fn sort_derived(records: &mut [DerivedRecord], spec: SortSpec) {
    records.sort_by(|a, b| {
        let ordering = match spec.field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Billed => a.billed.total_cmp(&b.billed),
            SortField::Paid => a.paid.total_cmp(&b.paid),
            SortField::Pending => a.pending.total_cmp(&b.pending),
            SortField::Date => a.last_payment.cmp(&b.last_payment),
        };
        match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}
