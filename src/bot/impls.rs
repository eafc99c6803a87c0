use teloxide::net::Download;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Document, KeyboardRemove, Message, ParseMode, ReplyMarkup};
use teloxide::RequestError;

use super::WBot;

pub async fn send(bot: &WBot, chat_id: ChatId, text: impl Into<String>) -> Result<Message, RequestError> {
    bot.send_message(chat_id, text).parse_mode(ParseMode::MarkdownV2).await
}

pub async fn send_with(
    bot: &WBot,
    chat_id: ChatId,
    text: impl Into<String>,
    markup: impl Into<ReplyMarkup>,
) -> Result<Message, RequestError> {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(markup)
        .await
}

pub async fn send_blocked(bot: &WBot, chat_id: ChatId, text: &str) -> Result<Message, RequestError> {
    send_with(bot, chat_id, text, KeyboardRemove::new()).await
}

pub fn has_extension(document: &Document, extension: &str) -> bool {
    document
        .file_name
        .as_deref()
        .map(|name| name.to_lowercase().ends_with(extension))
        .unwrap_or(false)
}

/// Whole content of an uploaded document.
pub async fn download(bot: &WBot, document: &Document) -> anyhow::Result<Vec<u8>> {
    let file = bot.get_file(document.file.id.clone()).await?;
    let mut content = Vec::new();
    bot.inner().download_file(&file.path, &mut content).await?;
    Ok(content)
}
