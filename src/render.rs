use std::collections::BTreeSet;
use tabled::{settings::Style, Table, Tabled};

use crate::account::{Classifier, DerivedRecord, LedgerRecord, PageSums, RecordId};
use crate::api::{total_pages, Page};

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "SEL")]
    selected: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "BILLED")]
    billed: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "PENDING")]
    pending: String,
    #[tabled(rename = "BILL PART")]
    bill_part: String,
    #[tabled(rename = "CASH PART")]
    cash_part: String,
}

#[derive(Tabled)]
struct PaymentRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "METHOD")]
    method: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "REMARK")]
    remark: String,
}

#[derive(Tabled)]
struct SumRow {
    #[tabled(rename = "")]
    label: &'static str,
    #[tabled(rename = "ROWS")]
    count: String,
    #[tabled(rename = "BILLED")]
    billed: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "PENDING")]
    pending: String,
}

pub fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// Two decimals with thousands separators, sign before the symbol.
pub fn format_money(value: f64, currency_symbol: &str) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = format_grouped_int((abs / 100) as i64);
    format!("{sign}{currency_symbol}{whole}.{:02}", abs % 100)
}

pub fn accounts_table(
    records: &[DerivedRecord],
    selected: &BTreeSet<RecordId>,
    offset: usize,
    currency_symbol: &str,
) -> String {
    let rows: Vec<AccountRow> = records
        .iter()
        .enumerate()
        .map(|(idx, r)| AccountRow {
            index: offset + idx + 1,
            selected: if selected.contains(&r.id) { "x" } else { "" },
            id: r.id.to_string(),
            name: r.name.clone(),
            billed: format_money(r.billed, currency_symbol),
            paid: format_money(r.paid, currency_symbol),
            pending: format_money(r.pending, currency_symbol),
            bill_part: format_money(r.bill_part, currency_symbol),
            cash_part: format_money(r.cash_part, currency_symbol),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn payments_table(
    record: &LedgerRecord,
    classifier: &Classifier,
    currency_symbol: &str,
) -> String {
    let rows: Vec<PaymentRow> = record
        .payments
        .iter()
        .enumerate()
        .map(|(idx, p)| PaymentRow {
            index: idx + 1,
            date: p.date.map(|d| d.to_string()).unwrap_or_default(),
            amount: format_money(p.amount, currency_symbol),
            method: p.method.clone().unwrap_or_default(),
            category: classifier
                .classify(p)
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            remark: p.remark.clone().unwrap_or_default(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

fn sum_row(label: &'static str, count: usize, billed: f64, paid: f64, pending: f64, sym: &str) -> SumRow {
    SumRow {
        label,
        count: count.to_string(),
        billed: format_money(billed, sym),
        paid: format_money(paid, sym),
        pending: format_money(pending, sym),
    }
}

/// Page, selection and whole-filter totals side by side.
pub fn totals_table(page: &Page, page_sums: &PageSums, selected: &PageSums, sym: &str) -> String {
    let rows = vec![
        sum_row(
            "THIS PAGE",
            page_sums.count,
            page_sums.billed,
            page_sums.paid,
            page_sums.pending,
            sym,
        ),
        sum_row(
            "SELECTED",
            selected.count,
            selected.billed,
            selected.paid,
            selected.pending,
            sym,
        ),
        sum_row(
            "ALL MATCHES",
            page.total_count,
            page.totals.billed,
            page.totals.paid,
            page.totals.pending,
            sym,
        ),
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn page_line(page_number: u32, page_size: usize, total_count: usize) -> String {
    let pages = total_pages(total_count, page_size).max(1);
    format!("Page {page_number} of {pages} ({total_count} records)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{derive_page, sum_page, sum_selected};
    use crate::api::Totals;
    use serde_json::json;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_grouped_int(0), "0");
        assert_eq!(format_grouped_int(999), "999");
        assert_eq!(format_grouped_int(1000), "1,000");
        assert_eq!(format_grouped_int(-1234567), "-1,234,567");
    }

    #[test]
    fn money_keeps_cents_and_sign() {
        assert_eq!(format_money(1234.5, "$"), "$1,234.50");
        assert_eq!(format_money(-15.0, "$"), "-$15.00");
        assert_eq!(format_money(0.0, "₹"), "₹0.00");
    }

    #[test]
    fn account_table_marks_selection() {
        let record: LedgerRecord = serde_json::from_value(json!({
            "id": "c1",
            "name": "Acme",
            "billedAmount": 1500,
            "payments": [{"amount": 100, "remark": "bill: x"}]
        }))
        .unwrap();
        let derived = derive_page(&[record], &Classifier::default());
        let selected: BTreeSet<RecordId> = [RecordId::from("c1")].into_iter().collect();
        let table = accounts_table(&derived, &selected, 15, "$");
        assert!(table.contains("Acme"));
        assert!(table.contains("$1,400.00"));
        assert!(table.contains("16"));
        assert!(table.contains("BILL PART"));
    }

    #[test]
    fn totals_table_lists_three_scopes() {
        let page = Page {
            items: Vec::new(),
            total_count: 40,
            totals: Totals {
                billed: 10_000.0,
                paid: 2_500.0,
                pending: 7_500.0,
            },
        };
        let derived = Vec::new();
        let table = totals_table(
            &page,
            &sum_page(&derived),
            &sum_selected(&derived, &BTreeSet::new()),
            "$",
        );
        assert!(table.contains("THIS PAGE"));
        assert!(table.contains("SELECTED"));
        assert!(table.contains("$7,500.00"));
        assert!(table.contains("$0.00"));
    }

    #[test]
    fn page_line_never_reports_zero_pages() {
        assert_eq!(page_line(1, 15, 0), "Page 1 of 1 (0 records)");
        assert_eq!(page_line(2, 15, 31), "Page 2 of 3 (31 records)");
    }
}
