use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sr_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use sr_core::{
    clock::TokioClock,
    config::Config,
    domain::ChatId,
    messaging::port::MessagingPort,
    notify::Notifier,
    poller::{ChangePoller, PollSettings},
    registry::SubscriberRegistry,
    service::{CommandSettings, RelayService},
    store::StoreHandle,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RelayService>,
    pub messenger: Arc<dyn MessagingPort>,
    pub chat_locks: Arc<ChatLocks>,
}

/// Idle chat locks are dropped once the map reaches this size.
const CHAT_LOCKS_PRUNE_AT: usize = 1024;

/// Per-chat serialization so a chat's form input is handled in order.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            if map.len() >= CHAT_LOCKS_PRUNE_AT && !map.contains_key(&chat_id) {
                // Held or awaited locks have a clone outside the map.
                map.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Start the change poller, serve Telegram updates until Ctrl-C, then stop the poller.
pub async fn run_polling(cfg: Arc<Config>, store: Arc<StoreHandle>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!(username = %me.username(), "relay bot started");
    }

    // Fan-out sends to every subscriber back to back; throttle to stay under Telegram limits.
    // The Telegram adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let registry = Arc::new(SubscriberRegistry::new());
    let poller = ChangePoller::new(
        store.clone(),
        registry.clone(),
        Notifier::new(messenger.clone(), cfg.telegram_safe_limit),
        PollSettings::from_config(&cfg),
        Arc::new(TokioClock),
    );
    match poller.initialize().await {
        Ok(rows) => info!(rows, "watching sheet for new rows"),
        Err(e) => warn!(error = %e, "initial sheet read failed, the poller retries with backoff"),
    }

    let cancel = CancellationToken::new();
    let poller_handle = poller.spawn(cancel);

    let state = Arc::new(AppState {
        service: Arc::new(RelayService::new(
            store,
            registry,
            poller,
            CommandSettings::from_config(&cfg),
        )),
        messenger,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped, shutting down change poller");
    if !poller_handle.shutdown(cfg.shutdown_timeout).await {
        warn!("change poller was aborted mid-cycle");
    }

    Ok(())
}
