/// Telegram chat id (numeric). Also the subscriber identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Number of cells a record occupies in the sheet: `[timestamp, name, email, phone]`.
pub const RECORD_COLUMNS: usize = 4;

/// One data row of the sheet.
///
/// Records are append-only; their identity is their position among data rows
/// (header excluded).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Record {
    pub submitted_at: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Record {
    pub fn new(
        submitted_at: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            submitted_at: submitted_at.into(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    /// Build a record from raw cells. Short rows are padded with empty strings,
    /// extra cells are ignored.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let cell = |i: usize| {
            cells
                .get(i)
                .map(|c| c.as_ref().to_string())
                .unwrap_or_default()
        };
        Self {
            submitted_at: cell(0),
            name: cell(1),
            email: cell(2),
            phone: cell(3),
        }
    }

    pub fn to_cells(&self) -> [String; RECORD_COLUMNS] {
        [
            self.submitted_at.clone(),
            self.name.clone(),
            self.email.clone(),
            self.phone.clone(),
        ]
    }

    /// Case-insensitive substring match over name, email and phone.
    pub fn matches(&self, query_lower: &str) -> bool {
        [&self.name, &self.email, &self.phone]
            .iter()
            .any(|f| f.to_lowercase().contains(query_lower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rows_are_padded() {
        let r = Record::from_cells(&["2026-01-01", "Ann"]);
        assert_eq!(r.name, "Ann");
        assert_eq!(r.email, "");
        assert_eq!(r.phone, "");
    }

    #[test]
    fn extra_cells_are_ignored() {
        let r = Record::from_cells(&["t", "n", "e", "p", "junk"]);
        assert_eq!(r.to_cells(), ["t", "n", "e", "p"].map(String::from));
    }

    #[test]
    fn matching_ignores_case_and_timestamp() {
        let r = Record::new("2026-01-01 10:00:00", "Ann Lee", "ann@example.com", "+1 555");
        assert!(r.matches("lee"));
        assert!(r.matches("example"));
        assert!(r.matches("555"));
        assert!(!r.matches("2026"));
    }
}
