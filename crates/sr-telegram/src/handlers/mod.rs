//! Telegram update handlers.
//!
//! Text messages are serialized per chat and handed to the transport-agnostic
//! `RelayService`; its reply is sent back through the messaging port.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::warn;

use sr_core::{
    domain::ChatId,
    service::{main_menu, Reply},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let Some(text) = msg.text() else {
        send_reply(&state, chat_id, state.service.unsupported_input()).await;
        return Ok(());
    };

    let _guard = state.chat_locks.lock_chat(chat_id).await;
    let reply = state.service.handle(chat_id, text).await;
    send_reply(&state, chat_id, reply).await;
    Ok(())
}

async fn send_reply(state: &AppState, chat_id: ChatId, reply: Reply) {
    let menu = main_menu();
    let last = reply.parts.len().saturating_sub(1);
    for (i, part) in reply.parts.iter().enumerate() {
        let res = if reply.menu && i == last {
            state.messenger.send_menu(chat_id, part, &menu).await
        } else {
            state.messenger.send_html(chat_id, part).await
        };
        if let Err(e) = res {
            warn!(%chat_id, error = %e, "failed to send reply");
            break;
        }
    }
}
