//! Registry of hosting platforms a project can be packaged for.

use crate::deploy::packager::FileEntry;
use crate::deploy::templates;

/// Builds the files of a project from (code, normalized language).
pub type TemplateFn = fn(&str, &str) -> Vec<FileEntry>;

/// Languages a platform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSupport {
    Any,
    /// Canonical lowercase language names.
    Only(&'static [&'static str]),
}

/// A hosting target and how to package for it.
#[derive(Debug, Clone)]
pub struct PlatformDescriptor {
    /// Stable key, used in button payloads.
    pub id: &'static str,
    pub display_name: &'static str,
    pub emoji: &'static str,
    /// One-line summary shown in `/help`.
    pub tagline: &'static str,
    /// Feature bullets shown in `/deploy`.
    pub features: &'static [&'static str],
    pub languages: LanguageSupport,
    pub templates: TemplateFn,
    pub instructions: &'static str,
}

impl PlatformDescriptor {
    /// Whether `language` (already normalized) can be deployed here.
    pub fn supports(&self, language: &str) -> bool {
        match self.languages {
            LanguageSupport::Any => true,
            LanguageSupport::Only(names) => names.iter().any(|n| n.eq_ignore_ascii_case(language)),
        }
    }

    /// Button / list label, e.g. "🚂 Railway".
    pub fn label(&self) -> String {
        format!("{} {}", self.emoji, self.display_name)
    }
}

/// Immutable, ordered set of platforms.
#[derive(Debug, Clone)]
pub struct PlatformCatalog {
    platforms: Vec<PlatformDescriptor>,
}

const SERVICE_LANGUAGES: &[&str] = &[
    "python", "javascript", "typescript", "go", "ruby", "php", "rust", "java",
];

impl PlatformCatalog {
    pub fn new(platforms: Vec<PlatformDescriptor>) -> Self {
        Self { platforms }
    }

    /// The platforms the bot ships with, in presentation order.
    pub fn builtin() -> Self {
        Self::new(vec![
            PlatformDescriptor {
                id: "replit",
                display_name: "Replit",
                emoji: "🌀",
                tagline: "quick deploy, runs 24/7",
                features: &[
                    "Any language",
                    "Reserved VM for always-on processes",
                    "Built-in database",
                ],
                languages: LanguageSupport::Any,
                templates: templates::replit,
                instructions: templates::REPLIT_INSTRUCTIONS,
            },
            PlatformDescriptor {
                id: "vercel",
                display_name: "Vercel",
                emoji: "▲",
                tagline: "frontends and web apps",
                features: &[
                    "Static sites and serverless functions",
                    "Automatic SSL",
                    "Global CDN",
                ],
                languages: LanguageSupport::Only(&[
                    "html", "css", "javascript", "typescript", "python",
                ]),
                templates: templates::vercel,
                instructions: templates::VERCEL_INSTRUCTIONS,
            },
            PlatformDescriptor {
                id: "netlify",
                display_name: "Netlify",
                emoji: "🌐",
                tagline: "static sites",
                features: &["JAMstack sites", "Forms and functions", "Git integration"],
                languages: LanguageSupport::Only(&["html", "css", "javascript"]),
                templates: templates::netlify,
                instructions: templates::NETLIFY_INSTRUCTIONS,
            },
            PlatformDescriptor {
                id: "railway",
                display_name: "Railway",
                emoji: "🚂",
                tagline: "general-purpose hosting",
                features: &["Any long-running app", "Deploys on push", "Managed databases"],
                languages: LanguageSupport::Only(SERVICE_LANGUAGES),
                templates: templates::railway,
                instructions: templates::RAILWAY_INSTRUCTIONS,
            },
            PlatformDescriptor {
                id: "render",
                display_name: "Render",
                emoji: "🎨",
                tagline: "web services",
                features: &["Python, Node.js, Go and more", "Docker support", "Automatic SSL"],
                languages: LanguageSupport::Only(SERVICE_LANGUAGES),
                templates: templates::render,
                instructions: templates::RENDER_INSTRUCTIONS,
            },
        ])
    }

    /// All platforms in presentation order.
    pub fn list(&self) -> &[PlatformDescriptor] {
        &self.platforms
    }

    pub fn get(&self, id: &str) -> Option<&PlatformDescriptor> {
        self.platforms.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_order_is_stable() {
        let ids: Vec<_> = PlatformCatalog::builtin().list().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["replit", "vercel", "netlify", "railway", "render"]);
    }

    #[test]
    fn test_ids_unique() {
        let catalog = PlatformCatalog::builtin();
        let ids: HashSet<_> = catalog.list().iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), catalog.list().len());
    }

    #[test]
    fn test_get() {
        let catalog = PlatformCatalog::builtin();
        assert_eq!(catalog.get("vercel").map(|p| p.display_name), Some("Vercel"));
        assert_eq!(catalog.get("Railway").map(|p| p.id), Some("railway"));
        assert!(catalog.get("heroku").is_none());
    }

    #[test]
    fn test_supports() {
        let catalog = PlatformCatalog::builtin();
        let netlify = catalog.get("netlify").unwrap();
        assert!(netlify.supports("html"));
        assert!(!netlify.supports("python"));
        assert!(!netlify.supports("unknown"));
        assert!(catalog.get("replit").unwrap().supports("unknown"));
    }

    #[test]
    fn test_every_platform_documented() {
        for p in PlatformCatalog::builtin().list() {
            assert!(!p.instructions.trim().is_empty(), "{}", p.id);
            assert!(!p.features.is_empty(), "{}", p.id);
        }
    }
}
