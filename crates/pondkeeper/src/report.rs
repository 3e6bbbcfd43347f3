//! Sales summaries and CSV export of orders.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::{Error, Result};
use crate::model::{PaymentMethod, PaymentStatus, TransactionRecord};

/// Totals over a set of orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Number of orders.
    pub count: usize,
    /// Orders marked paid.
    pub paid_count: usize,
    /// Sum of paid orders.
    pub paid_total: u64,
    /// Orders still pending.
    pub pending_count: usize,
    /// Sum of pending orders.
    pub pending_total: u64,
    /// Paid total per payment method. Paid orders without a method are not
    /// listed here.
    pub by_method: BTreeMap<PaymentMethod, u64>,
}

impl Summary {
    /// Summarize `records`. Sums saturate instead of overflowing.
    #[must_use]
    pub fn from_transactions(records: &[TransactionRecord]) -> Self {
        let mut summary = Self {
            count: records.len(),
            ..Self::default()
        };

        for record in records {
            match record.status {
                PaymentStatus::Paid => {
                    summary.paid_count += 1;
                    summary.paid_total = summary.paid_total.saturating_add(record.total_amount);
                    if let Some(method) = record.payment_method {
                        let slot = summary.by_method.entry(method).or_default();
                        *slot = slot.saturating_add(record.total_amount);
                    }
                }
                PaymentStatus::Pending => {
                    summary.pending_count += 1;
                    summary.pending_total =
                        summary.pending_total.saturating_add(record.total_amount);
                }
            }
        }
        summary
    }
}

/// Orders placed on `date` (UTC).
#[must_use]
pub fn on_date(records: &[TransactionRecord], date: NaiveDate) -> Vec<TransactionRecord> {
    records
        .iter()
        .filter(|r| r.timestamp.date_naive() == date)
        .cloned()
        .collect()
}

/// Format an amount as rupiah with dot thousands separators, e.g. `Rp 25.000`.
#[must_use]
pub fn format_rupiah(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    out.push_str("Rp ");
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

const CSV_HEADER: [&str; 9] = [
    "Date", "Kind", "Table", "Customer", "Items", "Total", "Status", "Method", "Operator",
];

/// Render orders as CSV for spreadsheets.
///
/// The output starts with a UTF-8 byte order mark, quotes every field and
/// separates rows with `\n`, without a trailing newline.
///
/// # Errors
///
/// Returns a CSV error if a row cannot be written.
pub fn to_csv(records: &[TransactionRecord]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for record in records {
        writer.write_record([
            record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            record.kind.as_str().to_string(),
            record
                .table_number
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            record.customer_name.clone(),
            record.item_count().to_string(),
            record.total_amount.to_string(),
            record.status.as_str().to_string(),
            record
                .payment_method
                .map_or_else(|| "-".to_string(), |m| m.as_str().to_string()),
            record
                .operator_role
                .map_or_else(|| "-".to_string(), |r| r.as_str().to_string()),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::internal(format!("flushing CSV: {e}")))?;
    let mut body = String::from_utf8(bytes)
        .map_err(|e| Error::internal(format!("CSV is not UTF-8: {e}")))?;
    if body.ends_with('\n') {
        body.pop();
    }
    Ok(format!("\u{feff}{body}"))
}
