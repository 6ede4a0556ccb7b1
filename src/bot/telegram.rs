//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use tracing::{info, warn};

use crate::bot::orchestrator::ImageSource;
use crate::bot::replies::{Attachment, Reply};
use crate::classifier::{ImageRef, InboundUpdate};
use crate::generation::ImageInput;

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a reply and its attachment. Returns the id of the text message.
    ///
    /// Each send is retried once before giving up.
    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<i64, String> {
        let message_id = match self.send_text(chat_id, reply).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to send to {chat_id}, retrying once: {e}");
                self.send_text(chat_id, reply)
                    .await
                    .map_err(|e| format!("Failed to send: {e}"))?
            }
        };

        if let Some(ref attachment) = reply.attachment {
            if let Err(e) = self.send_attachment(chat_id, attachment).await {
                warn!("Failed to send {} to {chat_id}, retrying once: {e}", attachment.file_name);
                self.send_attachment(chat_id, attachment)
                    .await
                    .map_err(|e| format!("Failed to send attachment: {e}"))?;
            }
        }

        Ok(message_id)
    }

    async fn send_text(&self, chat_id: i64, reply: &Reply) -> Result<i64, teloxide::RequestError> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), &reply.text)
            .parse_mode(ParseMode::Html);

        if !reply.buttons.is_empty() {
            let rows: Vec<Vec<InlineKeyboardButton>> = reply
                .buttons
                .iter()
                .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.data.clone())])
                .collect();
            request = request.reply_markup(InlineKeyboardMarkup::new(rows));
        }

        request.await.map(|msg| msg.id.0 as i64)
    }

    async fn send_attachment(&self, chat_id: i64, attachment: &Attachment) -> Result<(), teloxide::RequestError> {
        info!(
            "📎 Sending {} to chat {} ({} bytes)",
            attachment.file_name,
            chat_id,
            attachment.data.len()
        );
        let file = InputFile::memory(attachment.data.clone()).file_name(attachment.file_name.clone());
        self.bot.send_document(ChatId(chat_id), file).await.map(|_| ())
    }

    /// Stop the client-side spinner on a pressed button.
    pub async fn answer_callback(&self, query: &CallbackQuery) {
        if let Err(e) = self.bot.answer_callback_query(query.id.clone()).await {
            warn!("Failed to answer callback query: {e}");
        }
    }

    /// Download an image by file_id.
    /// Returns (bytes, media_type).
    pub async fn download_image(&self, file_id: &str) -> Result<(Vec<u8>, String), String> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| format!("Failed to get file info: {e}"))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| format!("Failed to download file: {e}"))?;

        let media_type = media_type_for(&file.path);
        info!("📥 Downloaded image ({} bytes, {})", data.len(), media_type);
        Ok((data, media_type.to_string()))
    }
}

#[async_trait]
impl ImageSource for TelegramClient {
    async fn fetch_image(&self, image: &ImageRef) -> Result<ImageInput, String> {
        let (data, media_type) = self.download_image(&image.file_id).await?;
        Ok(ImageInput { data, media_type })
    }
}

/// Guess the media type from a Telegram file path.
fn media_type_for(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        // Telegram re-encodes photos as JPEG.
        "image/jpeg"
    }
}

/// Convert a Telegram message into an inbound update.
pub fn message_to_update(msg: &Message) -> InboundUpdate {
    let user = msg.from.as_ref();
    let username = user
        .and_then(|u| u.username.as_deref())
        .unwrap_or_else(|| user.map(|u| u.first_name.as_str()).unwrap_or("unknown"))
        .to_string();

    // Largest photo size, or a document sent with an image MIME type.
    let photo = msg
        .photo()
        .and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height))
        .map(|p| p.file.id.0.clone());
    let image_document = msg
        .document()
        .filter(|d| {
            d.mime_type
                .as_ref()
                .is_some_and(|m| m.essence_str().starts_with("image/"))
        })
        .map(|d| d.file.id.0.clone());

    InboundUpdate {
        chat_id: msg.chat.id.0,
        user_id: user.map(|u| u.id.0 as i64).unwrap_or(0),
        username,
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        image: photo.or(image_document).map(|file_id| ImageRef { file_id }),
        button: None,
    }
}

/// Convert a button press into an inbound update. `None` if the originating
/// message is gone, since the chat cannot be known then.
pub fn callback_to_update(query: &CallbackQuery) -> Option<InboundUpdate> {
    let chat_id = query.message.as_ref()?.chat().id.0;
    let username = query
        .from
        .username
        .clone()
        .unwrap_or_else(|| query.from.first_name.clone());

    Some(InboundUpdate {
        chat_id,
        user_id: query.from.id.0 as i64,
        username,
        text: None,
        image: None,
        button: Some(query.data.clone().unwrap_or_default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for("photos/file_1.jpg"), "image/jpeg");
        assert_eq!(media_type_for("documents/shot.PNG"), "image/png");
        assert_eq!(media_type_for("documents/anim.webp"), "image/webp");
        assert_eq!(media_type_for("documents/noext"), "image/jpeg");
    }
}
