//! Notification fan-out: one formatted message per subscriber per batch.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    domain::{ChatId, Record},
    formatting::{escape_html, pack_blocks},
    messaging::port::MessagingPort,
};

const BATCH_HEADER: &str = "🔔 <b>New records in the sheet:</b>\n\n";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Render one record block: date, name, email, phone in that order.
pub fn format_record(record: &Record) -> String {
    format!(
        "<b>Date:</b> {}\n<b>Name:</b> {}\n<b>Email:</b> {}\n<b>Phone:</b> {}\n\n",
        escape_html(&record.submitted_at),
        escape_html(&record.name),
        escape_html(&record.email),
        escape_html(&record.phone),
    )
}

/// Render one record block of at most `max_len` bytes.
///
/// Raw values are shortened (longest first) before escaping, so entities and
/// tags in the block stay intact.
pub fn format_record_within(record: &Record, max_len: usize) -> String {
    let full = format_record(record);
    if full.len() <= max_len {
        return full;
    }

    let overhead = format_record(&Record::new("", "", "", "")).len();
    let fields = record.to_cells();
    let budgets = share_budget(&fields, max_len.saturating_sub(overhead));
    let [date, name, email, phone]: [String; 4] =
        std::array::from_fn(|i| clip_raw(&fields[i], budgets[i]));
    format_record(&Record::new(date, name, email, phone))
}

/// Split `avail` escaped bytes over the fields; short fields keep their full
/// length and the rest is shared evenly.
fn share_budget(fields: &[String; 4], avail: usize) -> [usize; 4] {
    let lens: [usize; 4] = std::array::from_fn(|i| escaped_len(&fields[i]));
    let mut order = [0, 1, 2, 3];
    order.sort_by_key(|&i| lens[i]);

    let mut budgets = [0; 4];
    let mut remaining = avail;
    for (k, &i) in order.iter().enumerate() {
        let share = remaining / (order.len() - k);
        budgets[i] = lens[i].min(share);
        remaining -= budgets[i];
    }
    budgets
}

const ELLIPSIS: char = '…';

fn escaped_char_len(c: char) -> usize {
    match c {
        '&' => "&amp;".len(),
        '<' => "&lt;".len(),
        '>' => "&gt;".len(),
        '"' => "&quot;".len(),
        _ => c.len_utf8(),
    }
}

fn escaped_len(s: &str) -> usize {
    s.chars().map(escaped_char_len).sum()
}

/// Longest prefix of `value` whose escaped form plus an ellipsis fits `budget`.
fn clip_raw(value: &str, budget: usize) -> String {
    if escaped_len(value) <= budget {
        return value.to_string();
    }
    let Some(room) = budget.checked_sub(ELLIPSIS.len_utf8()) else {
        return String::new();
    };

    let mut used = 0;
    let mut out = String::new();
    for c in value.chars() {
        let n = escaped_char_len(c);
        if used + n > room {
            break;
        }
        used += n;
        out.push(c);
    }
    out.push(ELLIPSIS);
    out
}

/// Render `records` under `header`, split into parts of at most `limit` bytes.
pub fn format_records(header: &str, records: &[Record], limit: usize) -> Vec<String> {
    let room = limit.saturating_sub(header.len());
    let blocks: Vec<String> = records
        .iter()
        .map(|r| format_record_within(r, room))
        .collect();
    pack_blocks(header, &blocks, limit)
}

/// Render a batch as one message, split into parts only if it exceeds `limit`.
pub fn format_batch(records: &[Record], limit: usize) -> Vec<String> {
    format_records(BATCH_HEADER, records, limit)
}

/// Delivers batches to subscribers, best-effort and at most once.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn MessagingPort>,
    safe_limit: usize,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn MessagingPort>, safe_limit: usize) -> Self {
        let max = messenger.capabilities().max_message_len;
        Self {
            messenger,
            safe_limit: safe_limit.min(max).max(1),
        }
    }

    /// Send the batch to every chat in `subscribers`.
    ///
    /// A failure for one chat is logged and counted; it never stops delivery
    /// to the remaining chats.
    pub async fn fan_out(&self, subscribers: &[ChatId], records: &[Record]) -> FanOutReport {
        let mut report = FanOutReport::default();
        if records.is_empty() || subscribers.is_empty() {
            return report;
        }

        let parts = format_batch(records, self.safe_limit);
        for &chat_id in subscribers {
            match self.deliver(chat_id, &parts).await {
                Ok(()) => {
                    debug!(%chat_id, rows = records.len(), "notification delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(%chat_id, error = %e, "notification delivery failed, skipping subscriber");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn deliver(&self, chat_id: ChatId, parts: &[String]) -> crate::Result<()> {
        for part in parts {
            self.messenger.send_html(chat_id, part).await?;
        }
        Ok(())
    }
}
