//! Transport-agnostic command handling: add / search / recent / subscribe /
//! unsubscribe / help / cancel / status, plus the two linear input forms.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock},
};

use chrono::Local;
use regex::Regex;
use tracing::{error, info};

use crate::{
    config::Config,
    domain::{ChatId, Record},
    formatting::escape_html,
    messaging::types::Menu,
    notify::{format_record, format_records},
    poller::ChangePoller,
    registry::{SubscribeOutcome, SubscriberRegistry, UnsubscribeOutcome},
    store::StoreHandle,
    Error,
};

pub const BTN_ADD: &str = "Add record";
pub const BTN_SEARCH: &str = "Search records";
pub const BTN_RECENT: &str = "Recent records";
pub const BTN_SUBSCRIBE: &str = "Subscribe";
pub const BTN_UNSUBSCRIBE: &str = "Unsubscribe";
pub const BTN_HELP: &str = "Help";

pub fn main_menu() -> Menu {
    Menu::new(vec![
        vec![BTN_ADD.to_string(), BTN_SEARCH.to_string()],
        vec![BTN_RECENT.to_string(), BTN_SUBSCRIBE.to_string()],
        vec![BTN_UNSUBSCRIBE.to_string(), BTN_HELP.to_string()],
    ])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Add,
    Search,
    Recent,
    Subscribe,
    Unsubscribe,
    Help,
    Cancel,
    Status,
}

impl Action {
    /// Recognize `/command[@bot] ...` or an exact menu button label.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('/') {
            let cmd = rest
                .split(char::is_whitespace)
                .next()
                .unwrap_or("")
                .split('@')
                .next()
                .unwrap_or("")
                .to_lowercase();
            return match cmd.as_str() {
                "start" => Some(Action::Start),
                "add" => Some(Action::Add),
                "search" => Some(Action::Search),
                "recent" => Some(Action::Recent),
                "subscribe" => Some(Action::Subscribe),
                "unsubscribe" => Some(Action::Unsubscribe),
                "help" => Some(Action::Help),
                "cancel" => Some(Action::Cancel),
                "status" => Some(Action::Status),
                _ => None,
            };
        }

        match text {
            BTN_ADD => Some(Action::Add),
            BTN_SEARCH => Some(Action::Search),
            BTN_RECENT => Some(Action::Recent),
            BTN_SUBSCRIBE => Some(Action::Subscribe),
            BTN_UNSUBSCRIBE => Some(Action::Unsubscribe),
            BTN_HELP => Some(Action::Help),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    ChoosingAction,
    AddingRecord,
    SearchingRecords,
}

/// What to send back to the chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// HTML message parts, sent in order.
    pub parts: Vec<String>,
    /// Attach the main menu keyboard to the last part.
    pub menu: bool,
}

impl Reply {
    fn text(html: impl Into<String>) -> Self {
        Self {
            parts: vec![html.into()],
            menu: false,
        }
    }

    fn with_menu(html: impl Into<String>) -> Self {
        Self {
            parts: vec![html.into()],
            menu: true,
        }
    }

    pub fn html(&self) -> String {
        self.parts.concat()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandSettings {
    pub recent_count: usize,
    pub search_limit: usize,
    pub safe_limit: usize,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            recent_count: 5,
            search_limit: 10,
            safe_limit: 4000,
        }
    }
}

impl CommandSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            recent_count: cfg.recent_count,
            search_limit: cfg.search_limit,
            safe_limit: cfg.telegram_safe_limit,
        }
    }
}

pub struct RelayService {
    store: Arc<StoreHandle>,
    registry: Arc<SubscriberRegistry>,
    poller: ChangePoller,
    settings: CommandSettings,
    conversations: Mutex<HashMap<ChatId, ConversationState>>,
}

const HELP_TEXT: &str = "<b>📋 Commands:</b>\n\
/start - Show the menu\n\
/add - Add a new record to the sheet\n\
/search - Find existing records\n\
/recent - Show the latest records\n\
/subscribe - Get notified about new records\n\
/unsubscribe - Stop notifications\n\
/status - Show poller status\n\
/cancel - Abort the current input\n\
/help - Show this message";

const ADD_PROMPT: &str = "✍️ Send the new record as one line:\n\
<code>Name, email, phone</code>\n\n\
/cancel to abort.";

const SEARCH_PROMPT: &str = "🔎 Send a name, email or phone fragment to search for.\n\n\
/cancel to abort.";

impl RelayService {
    pub fn new(
        store: Arc<StoreHandle>,
        registry: Arc<SubscriberRegistry>,
        poller: ChangePoller,
        settings: CommandSettings,
    ) -> Self {
        Self {
            store,
            registry,
            poller,
            settings,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    fn conversations(&self) -> MutexGuard<'_, HashMap<ChatId, ConversationState>> {
        self.conversations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    pub fn state_of(&self, chat_id: ChatId) -> ConversationState {
        self.conversations()
            .get(&chat_id)
            .copied()
            .unwrap_or_default()
    }

    fn set_state(&self, chat_id: ChatId, state: ConversationState) {
        let mut map = self.conversations();
        if state == ConversationState::ChoosingAction {
            map.remove(&chat_id);
        } else {
            map.insert(chat_id, state);
        }
    }

    /// Route one inbound text. Commands and menu labels always win over a
    /// pending input form.
    pub async fn handle(&self, chat_id: ChatId, text: &str) -> Reply {
        if let Some(action) = Action::parse(text) {
            return self.dispatch(chat_id, action).await;
        }

        match self.state_of(chat_id) {
            ConversationState::AddingRecord => self.save_record(chat_id, text).await,
            ConversationState::SearchingRecords => self.perform_search(chat_id, text).await,
            ConversationState::ChoosingAction => {
                Reply::with_menu("Please choose an action from the menu, or send /help.")
            }
        }
    }

    /// Reply for photos, stickers and other non-text messages.
    pub fn unsupported_input(&self) -> Reply {
        Reply::with_menu("Please send text or use the menu buttons.")
    }

    pub async fn dispatch(&self, chat_id: ChatId, action: Action) -> Reply {
        match action {
            Action::Start => {
                self.set_state(chat_id, ConversationState::ChoosingAction);
                Reply::with_menu(
                    "👋 Hi! I keep a Google Sheet of contacts and can notify you about new rows.\n\
Choose an action:",
                )
            }
            Action::Help => {
                self.set_state(chat_id, ConversationState::ChoosingAction);
                Reply::with_menu(HELP_TEXT)
            }
            Action::Cancel => {
                self.set_state(chat_id, ConversationState::ChoosingAction);
                Reply::with_menu("❌ Cancelled.")
            }
            Action::Add => {
                self.set_state(chat_id, ConversationState::AddingRecord);
                Reply::text(ADD_PROMPT)
            }
            Action::Search => {
                self.set_state(chat_id, ConversationState::SearchingRecords);
                Reply::text(SEARCH_PROMPT)
            }
            Action::Recent => {
                self.set_state(chat_id, ConversationState::ChoosingAction);
                self.show_recent().await
            }
            Action::Subscribe => {
                self.set_state(chat_id, ConversationState::ChoosingAction);
                match self.registry.add(chat_id) {
                    SubscribeOutcome::Subscribed => {
                        info!(%chat_id, "subscribed");
                        Reply::with_menu("✅ You are now subscribed to new record notifications!")
                    }
                    SubscribeOutcome::AlreadySubscribed => {
                        Reply::with_menu("You are already subscribed.")
                    }
                }
            }
            Action::Unsubscribe => {
                self.set_state(chat_id, ConversationState::ChoosingAction);
                match self.registry.remove(chat_id) {
                    UnsubscribeOutcome::Unsubscribed => {
                        info!(%chat_id, "unsubscribed");
                        Reply::with_menu("✅ You have unsubscribed from notifications.")
                    }
                    UnsubscribeOutcome::NotSubscribed => {
                        Reply::with_menu("You were not subscribed.")
                    }
                }
            }
            Action::Status => Reply::with_menu(self.status_html(chat_id)),
        }
    }

    async fn save_record(&self, chat_id: ChatId, text: &str) -> Reply {
        let (name, email, phone) = match parse_record_input(text) {
            Ok(fields) => fields,
            Err(problem) => return Reply::text(format!("⚠️ {problem}\n\n{ADD_PROMPT}")),
        };

        let record = Record::new(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            name,
            email,
            phone,
        );

        self.set_state(chat_id, ConversationState::ChoosingAction);
        match self.store.append(&record).await {
            Ok(()) => {
                info!(%chat_id, "record appended");
                Reply::with_menu(format!(
                    "✅ Record saved:\n\n{}",
                    format_record(&record)
                ))
            }
            Err(e) => store_failure("append", &e),
        }
    }

    async fn perform_search(&self, chat_id: ChatId, text: &str) -> Reply {
        let query = text.trim();
        if query.is_empty() {
            return Reply::text(SEARCH_PROMPT);
        }

        self.set_state(chat_id, ConversationState::ChoosingAction);
        match self.store.search(query, self.settings.search_limit).await {
            Ok(hits) if hits.is_empty() => Reply::with_menu(format!(
                "Nothing found for <b>{}</b>.",
                escape_html(query)
            )),
            Ok(hits) => self.records_reply(
                &format!(
                    "🔎 Found {} record(s) for <b>{}</b>:\n\n",
                    hits.len(),
                    escape_html(query)
                ),
                &hits,
            ),
            Err(e) => store_failure("search", &e),
        }
    }

    async fn show_recent(&self) -> Reply {
        match self.store.recent(self.settings.recent_count).await {
            Ok(rows) if rows.is_empty() => Reply::with_menu("The sheet has no records yet."),
            Ok(rows) => {
                self.records_reply(&format!("📋 Last {} record(s):\n\n", rows.len()), &rows)
            }
            Err(e) => store_failure("read", &e),
        }
    }

    fn records_reply(&self, header: &str, records: &[Record]) -> Reply {
        Reply {
            parts: format_records(header, records, self.settings.safe_limit),
            menu: true,
        }
    }

    fn status_html(&self, chat_id: ChatId) -> String {
        let st = self.poller.status();
        let rows = st
            .last_known_rows
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mut lines = vec![
            "📊 <b>Relay status</b>\n".to_string(),
            format!("Poller: {}", st.phase.label()),
            format!("Rows seen: {rows}"),
            format!("Subscribers: {}", self.registry.len()),
            format!(
                "You: {}",
                if self.registry.contains(chat_id) {
                    "subscribed"
                } else {
                    "not subscribed"
                }
            ),
            format!("Cycles: {} | batches sent: {}", st.cycles, st.batches_sent),
            format!(
                "Read failures: {} | refresh failures: {}",
                st.read_failures, st.refresh_failures
            ),
        ];
        if let Some(err) = st.last_error {
            lines.push(format!("Last error: <code>{}</code>", escape_html(&err)));
        }
        lines.join("\n")
    }
}

fn store_failure(op: &str, e: &Error) -> Reply {
    error!(op, error = %e, "store call failed on command path");
    if e.is_store_unavailable() {
        Reply::with_menu("⚠️ The spreadsheet is unavailable right now. Please try again later.")
    } else {
        Reply::with_menu(format!(
            "⚠️ Something went wrong: <code>{}</code>",
            escape_html(&e.to_string())
        ))
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"))
}

/// Parse `name, email, phone` from one line of user input.
fn parse_record_input(text: &str) -> std::result::Result<(String, String, String), &'static str> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [name, email, phone] = parts.as_slice() else {
        return Err("Expected exactly three comma-separated values.");
    };
    if name.is_empty() || email.is_empty() || phone.is_empty() {
        return Err("Name, email and phone must all be filled in.");
    }
    if !email_re().is_match(email) {
        return Err("That email address does not look valid.");
    }
    Ok((name.to_string(), email.to_string(), phone.to_string()))
}
