//! Commands, callback parsing, and canned message formats.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use uuid::Uuid;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get help")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Forget the conversation so far")]
    Reset,

    #[command(description = "Show this chat's ID")]
    ChatId,
}

/// A decoded approval button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalReply {
    pub id: Uuid,
    pub approved: bool,
}

/// Parses `approve:{id}` / `deny:{id}` callback data.
pub fn parse_approval_callback(data: &str) -> Option<ApprovalReply> {
    let (verdict, id) = data.split_once(':')?;
    let approved = match verdict {
        "approve" => true,
        "deny" => false,
        _ => return None,
    };
    let id = Uuid::parse_str(id).ok()?;
    Some(ApprovalReply { id, approved })
}

/// Text of an approval prompt, rendered as Telegram HTML.
pub fn approval_message(description: &str) -> String {
    format!("🛡️ <b>Approval Requested</b>\n\n{description}")
}

/// Approve / deny buttons keyed to one approval request.
pub fn approval_keyboard(id: Uuid) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Approve", format!("approve:{id}")),
        InlineKeyboardButton::callback("❌ Deny", format!("deny:{id}")),
    ]])
}

/// Reply to a decided approval, shown both as the callback toast and
/// appended to the original prompt.
pub fn decision_label(approved: bool) -> &'static str {
    if approved {
        "✅ Approved"
    } else {
        "❌ Denied"
    }
}

pub fn welcome_message() -> String {
    format!(
        "Welcome! 🤵 I'm your personal assistant.\n\n\
        Send me a message and I'll get to work. I can set reminders, \
        search the agent network, and fan work out to sub-agents.\n\n\
        {}",
        Command::descriptions()
    )
}

pub const RESET_MESSAGE: &str =
    "🧹 <b>Context Cleared</b>\n\nI've forgotten our previous conversation.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_parse() {
        assert_eq!(Command::parse("/start", "bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/reset", "bot").unwrap(), Command::Reset);
        assert_eq!(Command::parse("/chatid", "bot").unwrap(), Command::ChatId);
        assert!(Command::parse("/unknown", "bot").is_err());
    }

    #[test]
    fn test_approval_callback_roundtrip() {
        let id = Uuid::new_v4();

        let approve = parse_approval_callback(&format!("approve:{id}")).unwrap();
        assert!(approve.approved);
        assert_eq!(approve.id, id);

        let deny = parse_approval_callback(&format!("deny:{id}")).unwrap();
        assert!(!deny.approved);
    }

    #[test]
    fn test_bad_callback_data_rejected() {
        assert!(parse_approval_callback("approve").is_none());
        assert!(parse_approval_callback("approve:not-a-uuid").is_none());
        assert!(parse_approval_callback("shrug:2b1d9f44-3f5e-4d08-9f44-2b1d9f443f5e").is_none());
    }

    #[test]
    fn test_approval_message_format() {
        assert_eq!(
            approval_message("Call agent X"),
            "🛡️ <b>Approval Requested</b>\n\nCall agent X"
        );
    }
}
