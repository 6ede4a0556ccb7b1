//! Sorts inbound updates into the four kinds the bot reacts to.

/// Prefix that marks a message as a bot command.
const COMMAND_PREFIX: char = '/';

/// Prefix of the callback payload for "deploy to platform" buttons.
const DEPLOY_ACTION_PREFIX: &str = "deploy:";

/// Reference to an image held by the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub file_id: String,
}

/// Transport-neutral view of one inbound update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundUpdate {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: String,
    /// Message text, or the caption for media messages.
    pub text: Option<String>,
    pub image: Option<ImageRef>,
    /// Callback payload of a pressed inline button.
    pub button: Option<String>,
}

/// What an update asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Command { name: String, args: String },
    TextRequest(String),
    ImageRequest { image: ImageRef, caption: Option<String> },
    ButtonPress(String),
}

impl Classification {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Classification::Command { .. } => "command",
            Classification::TextRequest(_) => "text",
            Classification::ImageRequest { .. } => "image",
            Classification::ButtonPress(_) => "button",
        }
    }
}

/// Classify an update. `None` means the update is ignored.
///
/// Priority: button press, then image (even when the caption looks like a
/// command), then command, then plain text.
pub fn classify(update: &InboundUpdate) -> Option<Classification> {
    if let Some(ref data) = update.button {
        return Some(Classification::ButtonPress(data.clone()));
    }

    let text = update.text.as_deref().map(str::trim).filter(|t| !t.is_empty());

    if let Some(ref image) = update.image {
        return Some(Classification::ImageRequest {
            image: image.clone(),
            caption: text.map(str::to_string),
        });
    }

    let text = text?;
    // The raw text must start with the prefix; leading spaces make it plain text.
    let raw = update.text.as_deref().unwrap_or_default();
    if let Some(rest) = raw.strip_prefix(COMMAND_PREFIX) {
        let (name, args) = parse_command(rest);
        return Some(Classification::Command { name, args });
    }

    Some(Classification::TextRequest(text.to_string()))
}

/// Split "name@bot args..." into a lowercase name and the trimmed arguments.
fn parse_command(rest: &str) -> (String, String) {
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or("").to_lowercase();
    (name, args.to_string())
}

/// Parsed inline-button payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    DeployTo(String),
}

impl ButtonAction {
    pub fn parse(data: &str) -> Option<Self> {
        let platform = data.strip_prefix(DEPLOY_ACTION_PREFIX)?.trim();
        if platform.is_empty() {
            return None;
        }
        Some(ButtonAction::DeployTo(platform.to_string()))
    }

    /// Payload to put on the button.
    pub fn encode(&self) -> String {
        match self {
            ButtonAction::DeployTo(platform) => format!("{DEPLOY_ACTION_PREFIX}{platform}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(t: &str) -> InboundUpdate {
        InboundUpdate {
            chat_id: 1,
            user_id: 2,
            text: Some(t.to_string()),
            ..Default::default()
        }
    }

    fn image(caption: Option<&str>) -> InboundUpdate {
        InboundUpdate {
            chat_id: 1,
            user_id: 2,
            text: caption.map(str::to_string),
            image: Some(ImageRef { file_id: "file-1".into() }),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            classify(&text("  make a todo app ")),
            Some(Classification::TextRequest("make a todo app".into()))
        );
    }

    #[test]
    fn test_command_with_args() {
        assert_eq!(
            classify(&text("/code  a python script ")),
            Some(Classification::Command {
                name: "code".into(),
                args: "a python script".into()
            })
        );
    }

    #[test]
    fn test_leading_space_is_not_a_command() {
        assert_eq!(
            classify(&text("   /start")),
            Some(Classification::TextRequest("/start".into()))
        );
        assert_eq!(
            classify(&text("/start  ")),
            Some(Classification::Command {
                name: "start".into(),
                args: String::new()
            })
        );
    }

    #[test]
    fn test_command_addressed_to_bot() {
        assert_eq!(
            classify(&text("/Help@codelaunch_bot")),
            Some(Classification::Command { name: "help".into(), args: String::new() })
        );
    }

    #[test]
    fn test_captioned_image_is_image_even_if_command() {
        assert_eq!(
            classify(&image(Some("/start"))),
            Some(Classification::ImageRequest {
                image: ImageRef { file_id: "file-1".into() },
                caption: Some("/start".into())
            })
        );
    }

    #[test]
    fn test_image_without_caption() {
        assert!(matches!(
            classify(&image(None)),
            Some(Classification::ImageRequest { caption: None, .. })
        ));
    }

    #[test]
    fn test_button_wins_over_everything() {
        let mut update = image(Some("hello"));
        update.button = Some("deploy:railway".into());
        assert_eq!(
            classify(&update),
            Some(Classification::ButtonPress("deploy:railway".into()))
        );
    }

    #[test]
    fn test_empty_update_discarded() {
        assert_eq!(classify(&InboundUpdate::default()), None);
        assert_eq!(classify(&text("   ")), None);
    }

    #[test]
    fn test_button_action() {
        assert_eq!(
            ButtonAction::parse("deploy:vercel"),
            Some(ButtonAction::DeployTo("vercel".into()))
        );
        assert_eq!(ButtonAction::parse("deploy:"), None);
        assert_eq!(ButtonAction::parse("other"), None);
        assert_eq!(ButtonAction::DeployTo("render".into()).encode(), "deploy:render");
    }
}
