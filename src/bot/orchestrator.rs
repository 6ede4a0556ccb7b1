//! Routes classified updates to generation or packaging and builds the reply.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::bot::replies::{self, Attachment, Reply, ReplyKind};
use crate::bot::store::{ChatLocks, ConversationStore};
use crate::classifier::{classify, ButtonAction, Classification, ImageRef, InboundUpdate};
use crate::deploy::{archive, PackageError, Packager};
use crate::generation::{GenerationError, GenerationGateway, GenerationResult, ImageInput};

/// Fetches image bytes from the messaging transport.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, image: &ImageRef) -> Result<ImageInput, String>;
}

/// Per-chat conversation flow.
///
/// A chat with no session is idle; a successful generation stores the code
/// and every later deploy button packages the stored code. Packages are not
/// cached and deploying never changes the session.
pub struct Orchestrator {
    store: ConversationStore,
    locks: ChatLocks,
    packager: Packager,
    generator: Arc<dyn GenerationGateway>,
    images: Arc<dyn ImageSource>,
}

enum Request {
    Text(String),
    Image { image: ImageRef, caption: Option<String> },
}

impl Orchestrator {
    pub fn new(
        store: ConversationStore,
        packager: Packager,
        generator: Arc<dyn GenerationGateway>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            store,
            locks: ChatLocks::default(),
            packager,
            generator,
            images,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handle one update. `None` means it was ignored.
    pub async fn handle(&self, update: &InboundUpdate) -> Option<Reply> {
        let Some(classification) = classify(update) else {
            info!("Ignoring empty update in chat {}", update.chat_id);
            return None;
        };
        info!(
            "📨 {} update in chat {} from {} ({})",
            classification.kind(),
            update.chat_id,
            update.username,
            update.user_id
        );

        let reply = match classification {
            Classification::Command { name, .. } => self.command(&name),
            Classification::TextRequest(text) => {
                self.generate(update.chat_id, Request::Text(text)).await
            }
            Classification::ImageRequest { image, caption } => {
                self.generate(update.chat_id, Request::Image { image, caption })
                    .await
            }
            Classification::ButtonPress(data) => self.button(update.chat_id, &data).await,
        };
        Some(reply)
    }

    /// Record the id of a sent reply; only code replies are remembered.
    pub async fn reply_sent(&self, chat_id: i64, reply: &Reply, message_id: i64) {
        if reply.kind == ReplyKind::Code {
            self.store.set_reply_id(chat_id, message_id).await;
        }
    }

    fn command(&self, name: &str) -> Reply {
        let catalog = self.packager.catalog();
        match name {
            "start" => replies::welcome(),
            "help" => replies::help(catalog),
            "code" => replies::code_usage(),
            "analyze" => replies::analyze_usage(),
            "deploy" => replies::deploy_info(catalog),
            other => replies::unknown_command(other),
        }
    }

    async fn generate(&self, chat_id: i64, request: Request) -> Reply {
        let _guard = self.locks.acquire(chat_id).await;

        let result = match request {
            Request::Text(prompt) => self.generator.generate(&prompt).await,
            Request::Image { image, caption } => {
                let input = match self.images.fetch_image(&image).await {
                    Ok(input) => input,
                    Err(e) => {
                        warn!("Image download failed in chat {chat_id}: {e}");
                        return replies::image_unavailable();
                    }
                };
                self.generator
                    .generate_from_image(input, caption.as_deref())
                    .await
            }
        };

        match result {
            Ok(result) => self.store_generated(chat_id, result).await,
            Err(e) => {
                log_generation_error(chat_id, &e);
                replies::generation_failed(&e)
            }
        }
    }

    async fn store_generated(&self, chat_id: i64, result: GenerationResult) -> Reply {
        self.store.put(chat_id, &result).await;
        info!(
            "✅ Stored {} chars of {} for chat {}",
            result.code.len(),
            result.language,
            chat_id
        );
        replies::generated_code(&result, self.packager.catalog())
    }

    async fn button(&self, chat_id: i64, data: &str) -> Reply {
        let Some(ButtonAction::DeployTo(platform_id)) = ButtonAction::parse(data) else {
            warn!("Unknown button payload in chat {chat_id}: {data:?}");
            return replies::unknown_action();
        };

        let _guard = self.locks.acquire(chat_id).await;

        let Some(session) = self.store.get(chat_id).await else {
            info!("Deploy to {platform_id} requested in chat {chat_id} with nothing generated");
            return replies::nothing_to_deploy();
        };

        let catalog = self.packager.catalog();
        let packaged = self
            .packager
            .package(&session.code, &session.language, &platform_id)
            .and_then(|pkg| {
                let data = archive::zip_package(&pkg)?;
                Ok((pkg, data))
            });

        match packaged {
            Ok((pkg, data)) => {
                info!(
                    "📦 Packaged {} file(s) for {} in chat {}",
                    pkg.files.len(),
                    pkg.platform,
                    chat_id
                );
                let display_name = catalog
                    .get(pkg.platform)
                    .map_or(pkg.platform, |p| p.display_name);
                let attachment = Attachment {
                    file_name: archive::file_name(&pkg),
                    data,
                };
                replies::package(&pkg, display_name, &session.language, attachment)
            }
            Err(PackageError::UnsupportedPlatform(id)) => {
                warn!("Deploy to unknown platform {id:?} in chat {chat_id}");
                replies::unsupported_platform(&id)
            }
            Err(PackageError::UnsupportedLanguage { platform, language }) => {
                info!("{platform} rejected {language} in chat {chat_id}");
                let alternatives: Vec<&str> = catalog
                    .list()
                    .iter()
                    .filter(|p| p.supports(&language))
                    .map(|p| p.display_name)
                    .collect();
                replies::unsupported_language(&platform, &language, &alternatives)
            }
            Err(e) => {
                error!("Packaging failed in chat {chat_id}: {e}");
                replies::packaging_failed()
            }
        }
    }
}

fn log_generation_error(chat_id: i64, err: &GenerationError) {
    match err {
        GenerationError::MissingCredential => {
            error!("Generation requested in chat {chat_id} but no API key is configured")
        }
        _ => warn!("Generation failed in chat {chat_id}: {err}"),
    }
}
