//! Reply model and the texts the bot sends.
//!
//! Text is Telegram HTML: user and model content is always escaped.

use crate::classifier::ButtonAction;
use crate::deploy::language;
use crate::deploy::{DeploymentPackage, PlatformCatalog};
use crate::generation::{GenerationError, GenerationResult};

/// Telegram's maximum message length.
pub const MESSAGE_LIMIT: usize = 4096;

/// Longest model explanation shown above the code.
const MAX_EXPLANATION: usize = 600;

/// What a reply is about, for logging and bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Info,
    /// Generated code with deploy buttons.
    Code,
    /// A deployment package.
    Package,
    Error,
}

/// Inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

/// A file sent along with the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Transport-neutral outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
    /// One button per row.
    pub buttons: Vec<Button>,
    pub attachment: Option<Attachment>,
}

impl Reply {
    fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            buttons: Vec::new(),
            attachment: None,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(ReplyKind::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(ReplyKind::Error, text)
    }
}

/// Escape text for Telegram HTML.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

fn code_block(code: &str, language: &str) -> String {
    format!(
        "<pre><code class=\"language-{}\">{}</code></pre>",
        html_escape(language),
        html_escape(code)
    )
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}

pub fn welcome() -> Reply {
    Reply::info(
        "🤖 <b>Welcome to the AI code generator!</b>\n\n\
I can help you with:\n\
• 💻 Writing code in any programming language\n\
• 🖼️ Reading code from screenshots and images\n\
• 🔧 Building complete programs, bots and APIs\n\
• 📚 Explaining programming concepts\n\
• 🚀 <b>Packaging your code for deployment in one tap</b>\n\n\
<b>Commands:</b>\n\
/start - Start over\n\
/help - Help and the list of deploy platforms\n\
/code - Generate code\n\
/analyze - Analyze an image\n\
/deploy - Deployment info\n\n\
🎯 <b>Send a request, get the code, deploy it with one button!</b>",
    )
}

pub fn help(catalog: &PlatformCatalog) -> Reply {
    let platforms: String = catalog
        .list()
        .iter()
        .map(|p| format!("{} {} - {}\n", p.emoji, html_escape(p.display_name), html_escape(p.tagline)))
        .collect();

    Reply::info(format!(
        "📖 <b>How to use the bot</b>\n\n\
<b>What I can do:</b>\n\
• Write code in Python, JavaScript, HTML/CSS, Go, Rust, Java and more\n\
• Build Telegram bots, web apps and APIs\n\
• Extract code from screenshots\n\
• Explain tricky concepts and solve algorithm tasks\n\
• 🚀 <b>Package the code for hosting platforms</b>\n\n\
<b>How to ask:</b>\n\
1️⃣ Describe what you need\n\
2️⃣ Mention the language if it matters\n\
3️⃣ Or send an image with code\n\
4️⃣ Press a deploy button under the answer\n\n\
<b>Deploy platforms:</b>\n{platforms}\n\
Just send your request!"
    ))
}

pub fn code_usage() -> Reply {
    Reply::info(
        "💻 <b>The code generator is ready!</b>\n\n\
Describe what you need:\n\
• Programming language\n\
• Functionality\n\
• Special requirements\n\n\
<b>Example:</b>\n\
\"Write a Python script that scrapes a web page with requests and BeautifulSoup\"\n\n\
Send your request as the next message.",
    )
}

pub fn analyze_usage() -> Reply {
    Reply::info(
        "🖼️ <b>Image analysis</b>\n\n\
Send a screenshot or photo of code, a UI mockup or a task.\n\
Add a caption to say what you want done with it, for example \"fix the bug\" or \"port this to Go\".",
    )
}

pub fn deploy_info(catalog: &PlatformCatalog) -> Reply {
    let mut text = String::from("🚀 <b>Deploying generated code</b>\n\n<b>Supported platforms:</b>\n\n");
    for p in catalog.list() {
        text.push_str(&format!("{} <b>{}</b> - {}\n", p.emoji, html_escape(p.display_name), html_escape(p.tagline)));
        for feature in p.features {
            text.push_str(&format!("• {}\n", html_escape(feature)));
        }
        text.push('\n');
    }
    text.push_str(
        "<b>How it works:</b>\n\
1. Generate code with the bot\n\
2. Press one of the \"🚀 Deploy to …\" buttons\n\
3. Get a ready project archive\n\
4. Follow the instructions that come with it",
    );
    Reply::info(text)
}

pub fn unknown_command(name: &str) -> Reply {
    Reply::info(format!(
        "Unknown command /{}. See /help for what I can do.",
        html_escape(name)
    ))
}

/// Generated code plus one deploy button per platform.
pub fn generated_code(result: &GenerationResult, catalog: &PlatformCatalog) -> Reply {
    let explanation = truncate_chars(&crate::extract::explanation(&result.raw), MAX_EXPLANATION);
    let header = format!("✅ <b>Code ready</b> ({})", html_escape(&result.language));
    let intro = if explanation.is_empty() {
        header
    } else {
        format!("{header}\n\n{}", html_escape(&explanation))
    };

    let inline = format!("{intro}\n\n{}", code_block(&result.code, &result.language));
    let (text, attachment) = if inline.len() <= MESSAGE_LIMIT {
        (inline, None)
    } else {
        let profile = language::profile_or_fallback(&result.language);
        let file_name = profile
            .source_file
            .rsplit('/')
            .next()
            .unwrap_or(profile.source_file)
            .to_string();
        (
            format!("{intro}\n\n📎 The code is too long for a message, it is attached as {}.", html_escape(&file_name)),
            Some(Attachment {
                file_name,
                data: result.code.as_bytes().to_vec(),
            }),
        )
    };

    let buttons = catalog
        .list()
        .iter()
        .map(|p| Button {
            label: format!("🚀 Deploy to {}", p.display_name),
            data: ButtonAction::DeployTo(p.id.to_string()).encode(),
        })
        .collect();

    Reply {
        kind: ReplyKind::Code,
        text,
        buttons,
        attachment,
    }
}

/// Instructions, file list and the zipped project.
pub fn package(pkg: &DeploymentPackage, display_name: &str, language: &str, archive: Attachment) -> Reply {
    let mut head = format!(
        "📦 <b>{} project ready</b> ({})\n\n<b>Files:</b>\n",
        html_escape(display_name),
        html_escape(language)
    );
    for file in &pkg.files {
        head.push_str(&format!("• <code>{}</code>\n", html_escape(&file.path)));
    }

    let tail = format!(
        "\n<b>How to deploy:</b>\n{}\n\n📎 All files are in {}.",
        html_escape(pkg.instructions),
        html_escape(&archive.file_name)
    );

    let mut contents = String::new();
    for file in &pkg.files {
        contents.push_str(&format!("\n<b>{}</b>\n<pre>{}</pre>\n", html_escape(&file.path), html_escape(&file.content)));
    }

    let with_contents = format!("{head}{contents}{tail}");
    let text = if with_contents.len() <= MESSAGE_LIMIT {
        with_contents
    } else {
        format!("{head}{tail}")
    };

    Reply {
        kind: ReplyKind::Package,
        text,
        buttons: Vec::new(),
        attachment: Some(archive),
    }
}

pub fn nothing_to_deploy() -> Reply {
    Reply::info("🤷 Nothing to deploy yet. Send a request first and I'll generate some code.")
}

pub fn generation_failed(err: &GenerationError) -> Reply {
    let text = match err {
        GenerationError::MissingCredential => {
            "⚠️ Code generation is not configured yet. Please try again later.".to_string()
        }
        GenerationError::Timeout => {
            "⏳ The generator took too long to answer. Please try again, maybe with a shorter request.".to_string()
        }
        GenerationError::Empty => {
            "🤔 The generator returned no code. Try rephrasing your request.".to_string()
        }
        _ => "❌ Something went wrong while generating code. Please try again in a moment.".to_string(),
    };
    Reply::error(text)
}

pub fn image_unavailable() -> Reply {
    Reply::error("❌ I couldn't download that image. Please send it again.")
}

pub fn unsupported_platform(platform: &str) -> Reply {
    Reply::error(format!(
        "❌ Unknown platform \"{}\". See /deploy for the supported ones.",
        html_escape(platform)
    ))
}

pub fn unsupported_language(platform: &str, language: &str, alternatives: &[&str]) -> Reply {
    let mut text = format!(
        "⚠️ {} can't host {} code.",
        html_escape(platform),
        html_escape(language)
    );
    if !alternatives.is_empty() {
        text.push_str(&format!(" Try {} instead.", html_escape(&alternatives.join(", "))));
    }
    Reply::error(text)
}

pub fn packaging_failed() -> Reply {
    Reply::error("❌ Something went wrong while preparing the project. Please try another platform.")
}

pub fn unknown_action() -> Reply {
    Reply::error("This button is no longer supported. Send a new request to get fresh buttons.")
}
