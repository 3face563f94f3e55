//! Main Telegram bot implementation.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use attache_events::{EventBus, SubscriptionHandle};
use attache_models::{ApprovalDecision, BusEvent, EventKind};
use attache_persistence::MessageStore;

use crate::debounce::DebounceInbox;
use crate::error::Result;
use crate::handlers::{
    approval_keyboard, approval_message, decision_label, parse_approval_callback,
    welcome_message, Command, RESET_MESSAGE,
};
use crate::html::sanitize_html;

struct BotContext {
    bot: Bot,
    /// The single authorized chat; everything else is ignored.
    chat: ChatId,
    bus: EventBus,
    messages: Arc<MessageStore>,
    inbox: DebounceInbox,
    http: reqwest::Client,
}

/// The Telegram front end: buffers inbound messages onto the bus, relays
/// approval prompts, and exposes reply helpers for the agent loop.
#[derive(Clone)]
pub struct TelegramBot {
    ctx: Arc<BotContext>,
}

impl TelegramBot {
    pub fn new(
        token: impl Into<String>,
        chat_id: i64,
        bus: EventBus,
        messages: Arc<MessageStore>,
    ) -> Self {
        let inbox = DebounceInbox::new(bus.clone());
        Self {
            ctx: Arc::new(BotContext {
                bot: Bot::new(token),
                chat: ChatId(chat_id),
                bus,
                messages,
                inbox,
                http: reqwest::Client::new(),
            }),
        }
    }

    /// Sends a reply to the authorized chat, rewriting block-level HTML into
    /// Telegram's subset first. Falls back to plain text if Telegram still
    /// rejects the markup.
    pub async fn send_html(&self, text: &str) -> Result<()> {
        let clean = sanitize_html(text);
        if clean.is_empty() {
            return Ok(());
        }

        let attempt = self
            .ctx
            .bot
            .send_message(self.ctx.chat, &clean)
            .parse_mode(ParseMode::Html)
            .await;
        if let Err(error) = attempt {
            warn!(%error, "HTML send rejected, retrying as plain text");
            self.ctx.bot.send_message(self.ctx.chat, &clean).await?;
        }
        Ok(())
    }

    /// Shows the typing indicator while a turn is being worked on.
    pub async fn send_typing(&self) -> Result<()> {
        self.ctx
            .bot
            .send_chat_action(self.ctx.chat, ChatAction::Typing)
            .await?;
        Ok(())
    }

    /// Runs the update dispatcher until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        let _approvals = self.spawn_approval_prompts()?;

        let bot = self.ctx.bot.clone();
        let ctx_for_callbacks = Arc::clone(&self.ctx);
        let ctx_for_commands = Arc::clone(&self.ctx);
        let ctx_for_messages = Arc::clone(&self.ctx);

        let handler = dptree::entry()
            .branch(Update::filter_callback_query().endpoint(
                move |bot: Bot, q: teloxide::types::CallbackQuery| {
                    let ctx = Arc::clone(&ctx_for_callbacks);
                    async move { handle_callback(bot, q, ctx).await }
                },
            ))
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let ctx = Arc::clone(&ctx_for_commands);
                        async move { handle_command(bot, msg, cmd, ctx).await }
                    }),
            )
            .branch(Update::filter_message().endpoint(move |msg: Message| {
                let ctx = Arc::clone(&ctx_for_messages);
                async move { handle_message(msg, ctx).await }
            }));

        info!(chat_id = %self.ctx.chat, "Telegram bot is running");

        Dispatcher::builder(bot, handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }

    /// Forwards `ApprovalRequested` bus events to the chat as a prompt with
    /// approve/deny buttons.
    fn spawn_approval_prompts(&self) -> Result<SubscriptionHandle> {
        let (handle, mut rx) = self
            .ctx
            .bus
            .subscribe_channel(EventKind::ApprovalRequested)?;
        let ctx = Arc::clone(&self.ctx);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let BusEvent::ApprovalRequested(request) = event else {
                    continue;
                };
                let send = ctx
                    .bot
                    .send_message(ctx.chat, approval_message(&request.description))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(approval_keyboard(request.id));
                if let Err(error) = send.await {
                    warn!(%error, "failed to send approval prompt");
                }
            }
        });

        Ok(handle)
    }
}

async fn handle_message(msg: Message, ctx: Arc<BotContext>) -> ResponseResult<()> {
    if msg.chat.id != ctx.chat {
        debug!(chat_id = %msg.chat.id, "ignoring message from unauthorized chat");
        return Ok(());
    }

    let user_id = msg
        .from
        .as_ref()
        .map(|user| user.id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let text = msg
        .text()
        .or_else(|| msg.caption())
        .map(str::to_string);

    let mut images = Vec::new();
    if let Some(photos) = msg.photo() {
        // Telegram sends multiple resolutions; the last one is the largest.
        if let Some(photo) = photos.last() {
            match download_photo(&ctx, photo.file.id.clone()).await {
                Ok(encoded) => images.push(encoded),
                Err(error) => warn!(%error, "failed to download photo"),
            }
        }
    }

    if text.is_none() && images.is_empty() {
        return Ok(());
    }

    debug!(chat_id = %msg.chat.id, has_text = text.is_some(), images = images.len(), "buffering inbound message");
    if let Err(error) = ctx.inbox.push(msg.chat.id.0, &user_id, text, images) {
        warn!(%error, "failed to buffer inbound message");
    }
    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    if msg.chat.id != ctx.chat {
        debug!(chat_id = %msg.chat.id, "ignoring command from unauthorized chat");
        return Ok(());
    }

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, welcome_message())
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Reset => {
            if let Err(error) = ctx.messages.clear() {
                warn!(%error, "failed to clear stored messages");
            }
            if let Err(error) = ctx.inbox.clear(msg.chat.id.0) {
                warn!(%error, "failed to clear message buffer");
            }
            bot.send_message(msg.chat.id, RESET_MESSAGE)
                .parse_mode(ParseMode::Html)
                .await?;
            info!(chat_id = %msg.chat.id, "conversation context cleared");
        }
        Command::ChatId => {
            bot.send_message(msg.chat.id, format!("<code>{}</code>", msg.chat.id.0))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

async fn handle_callback(
    bot: Bot,
    q: teloxide::types::CallbackQuery,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    let Some(reply) = q.data.as_deref().and_then(parse_approval_callback) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let label = decision_label(reply.approved);
    bot.answer_callback_query(q.id).text(label).await?;

    // Freeze the prompt so the buttons cannot be pressed twice.
    if let Some(message) = q.message {
        let original = message
            .regular_message()
            .and_then(|m| m.text())
            .map(str::to_string)
            .unwrap_or_default();
        let _ = bot
            .edit_message_text(
                message.chat().id,
                message.id(),
                format!("{original}\n\n{label}"),
            )
            .await;
    }

    info!(approval_id = %reply.id, approved = reply.approved, "approval decided");
    if let Err(error) = ctx.bus.publish(BusEvent::ApprovalDecision(ApprovalDecision {
        id: reply.id,
        approved: reply.approved,
    })) {
        warn!(%error, "failed to publish approval decision");
    }
    Ok(())
}

async fn download_photo(ctx: &BotContext, file_id: String) -> Result<String> {
    let file = ctx.bot.get_file(file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        ctx.bot.token(),
        file.path
    );
    let bytes = ctx
        .http
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(BASE64_STANDARD.encode(&bytes))
}
