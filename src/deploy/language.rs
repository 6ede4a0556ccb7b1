//! Language profiles and dependency manifest synthesis.
//!
//! Everything here is a pure function of the generated code, so the same code
//! always lays out the same project.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::deploy::packager::FileEntry;

/// Language name used when generation could not tell what the code is.
pub const UNKNOWN: &str = "unknown";

/// How a language is laid out and started inside a project.
#[derive(Debug)]
pub struct LanguageProfile {
    pub name: &'static str,
    aliases: &'static [&'static str],
    /// Main source file, relative to the project root.
    pub source_file: &'static str,
    /// Shell command that starts the program from the project root.
    pub start_command: &'static str,
    /// Served as a static asset rather than run as a process.
    pub is_static: bool,
}

const PROFILES: &[LanguageProfile] = &[
    LanguageProfile {
        name: "python",
        aliases: &["py", "python3"],
        source_file: "main.py",
        start_command: "python main.py",
        is_static: false,
    },
    LanguageProfile {
        name: "javascript",
        aliases: &["js", "node", "nodejs", "jsx", "mjs"],
        source_file: "index.js",
        start_command: "node index.js",
        is_static: false,
    },
    LanguageProfile {
        name: "typescript",
        aliases: &["ts", "tsx"],
        source_file: "index.ts",
        start_command: "npx tsx index.ts",
        is_static: false,
    },
    LanguageProfile {
        name: "go",
        aliases: &["golang"],
        source_file: "main.go",
        start_command: "go run main.go",
        is_static: false,
    },
    LanguageProfile {
        name: "rust",
        aliases: &["rs"],
        source_file: "src/main.rs",
        start_command: "cargo run --release",
        is_static: false,
    },
    LanguageProfile {
        name: "java",
        aliases: &[],
        source_file: "Main.java",
        start_command: "javac Main.java && java Main",
        is_static: false,
    },
    LanguageProfile {
        name: "ruby",
        aliases: &["rb"],
        source_file: "main.rb",
        start_command: "ruby main.rb",
        is_static: false,
    },
    LanguageProfile {
        name: "php",
        aliases: &[],
        source_file: "index.php",
        start_command: "php -S 0.0.0.0:${PORT:-8080}",
        is_static: false,
    },
    LanguageProfile {
        name: "shell",
        aliases: &["sh", "bash", "zsh"],
        source_file: "main.sh",
        start_command: "bash main.sh",
        is_static: false,
    },
    LanguageProfile {
        name: "cpp",
        aliases: &["c++", "cxx", "cc"],
        source_file: "main.cpp",
        start_command: "g++ -O2 -o app main.cpp && ./app",
        is_static: false,
    },
    LanguageProfile {
        name: "html",
        aliases: &["htm", "xhtml"],
        source_file: "index.html",
        start_command: "npx serve .",
        is_static: true,
    },
    LanguageProfile {
        name: "css",
        aliases: &[],
        source_file: "style.css",
        start_command: "npx serve .",
        is_static: true,
    },
];

/// Profile used for code whose language has no entry in the table.
pub const FALLBACK: LanguageProfile = LanguageProfile {
    name: UNKNOWN,
    aliases: &[],
    source_file: "main.txt",
    start_command: "cat main.txt",
    is_static: false,
};

/// Canonical lowercase language name. Aliases map to their language;
/// anything unrecognised is returned trimmed and lowercased.
pub fn normalize(language: &str) -> String {
    let lower = language.trim().to_lowercase();
    if lower.is_empty() {
        return UNKNOWN.to_string();
    }
    match profile(&lower) {
        Some(p) => p.name.to_string(),
        None => lower,
    }
}

/// Look up a profile by name or alias (case-insensitive).
pub fn profile(language: &str) -> Option<&'static LanguageProfile> {
    let lower = language.trim().to_lowercase();
    PROFILES
        .iter()
        .find(|p| p.name == lower || p.aliases.iter().any(|a| *a == lower))
}

/// Profile for `language`, or the plain-text fallback.
pub fn profile_or_fallback(language: &str) -> &'static LanguageProfile {
    profile(language).unwrap_or(&FALLBACK)
}

/// Dependency manifest for the code, if its language has one.
pub fn dependency_manifest(profile: &LanguageProfile, code: &str) -> Option<FileEntry> {
    match profile.name {
        "python" => {
            let mut content = python_requirements(code).join("\n");
            if !content.is_empty() {
                content.push('\n');
            }
            Some(FileEntry::new("requirements.txt", content))
        }
        "javascript" | "typescript" => Some(FileEntry::new(
            "package.json",
            package_json(profile, code),
        )),
        "go" => Some(FileEntry::new(
            "go.mod",
            "module generated-app\n\ngo 1.22\n",
        )),
        "rust" => Some(FileEntry::new(
            "Cargo.toml",
            "[package]\nname = \"generated-app\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n",
        )),
        "ruby" => Some(FileEntry::new(
            "Gemfile",
            "source \"https://rubygems.org\"\n",
        )),
        _ => None,
    }
}

/// `package.json` with a start script and the code's npm imports.
pub fn package_json(profile: &LanguageProfile, code: &str) -> String {
    node_manifest(profile, code, true)
}

/// Manifest for code deployed as a serverless function: dependencies only,
/// with no entry point or start script since the platform invokes the file.
pub fn function_manifest(profile: &LanguageProfile, code: &str) -> Option<FileEntry> {
    match profile.name {
        "javascript" | "typescript" => Some(FileEntry::new(
            "package.json",
            node_manifest(profile, code, false),
        )),
        _ => dependency_manifest(profile, code),
    }
}

fn node_manifest(profile: &LanguageProfile, code: &str, with_entry: bool) -> String {
    let mut dependencies = serde_json::Map::new();
    for dep in node_dependencies(code) {
        dependencies.insert(dep, json!("latest"));
    }
    if profile.name == "typescript" {
        dependencies.insert("tsx".to_string(), json!("latest"));
    }

    let mut manifest = json!({
        "name": "generated-app",
        "version": "1.0.0",
        "private": true,
        "engines": { "node": ">=18" },
        "dependencies": dependencies,
    });
    if with_entry {
        manifest["main"] = json!(profile.source_file);
        manifest["scripts"] = json!({ "start": profile.start_command });
    }
    let mut out = serde_json::to_string_pretty(&manifest).unwrap_or_default();
    out.push('\n');
    out
}

static PY_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*from\s+([A-Za-z_]\w*)[\w.]*\s+import\b").unwrap());
static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*import\s+([^\n#;]+)").unwrap());

const PYTHON_STDLIB: &[&str] = &[
    "__future__", "abc", "argparse", "array", "ast", "asyncio", "base64", "bisect",
    "calendar", "cmath", "codecs", "collections", "concurrent", "configparser",
    "contextlib", "copy", "csv", "ctypes", "dataclasses", "datetime", "decimal",
    "difflib", "email", "enum", "fractions", "functools", "getpass", "glob", "gzip",
    "hashlib", "heapq", "hmac", "html", "http", "importlib", "inspect", "io",
    "ipaddress", "itertools", "json", "locale", "logging", "math", "mimetypes",
    "multiprocessing", "operator", "os", "pathlib", "pickle", "platform", "pprint",
    "queue", "random", "re", "secrets", "select", "shlex", "shutil", "signal",
    "smtplib", "socket", "sqlite3", "ssl", "statistics", "string", "struct",
    "subprocess", "sys", "tarfile", "tempfile", "textwrap", "threading", "time",
    "timeit", "tkinter", "traceback", "types", "typing", "unicodedata", "unittest",
    "urllib", "uuid", "warnings", "weakref", "xml", "zipfile", "zoneinfo",
];

/// Import names whose PyPI distribution is named differently.
const PYPI_NAMES: &[(&str, &str)] = &[
    ("bs4", "beautifulsoup4"),
    ("cv2", "opencv-python"),
    ("dotenv", "python-dotenv"),
    ("PIL", "pillow"),
    ("sklearn", "scikit-learn"),
    ("telegram", "python-telegram-bot"),
    ("yaml", "pyyaml"),
];

/// Third-party packages imported by Python code, sorted and deduplicated.
pub fn python_requirements(code: &str) -> Vec<String> {
    let mut modules = BTreeSet::new();
    for cap in PY_FROM.captures_iter(code) {
        modules.insert(cap[1].to_string());
    }
    for cap in PY_IMPORT.captures_iter(code) {
        for item in cap[1].split(',') {
            let name = item
                .trim()
                .split(|c: char| c == '.' || c.is_whitespace())
                .next()
                .unwrap_or("");
            if !name.is_empty() {
                modules.insert(name.to_string());
            }
        }
    }

    let packages: BTreeSet<String> = modules
        .into_iter()
        .filter(|m| !PYTHON_STDLIB.iter().any(|s| s == m))
        .map(|m| {
            PYPI_NAMES
                .iter()
                .find(|(import, _)| *import == m)
                .map(|(_, dist)| dist.to_string())
                .unwrap_or(m)
        })
        .collect();
    packages.into_iter().collect()
}

static JS_REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static JS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:[^'"\n]*?\s+from\s+)?['"]([^'"]+)['"]"#).unwrap()
});

const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dns", "events", "fs",
    "http", "http2", "https", "net", "os", "path", "process", "querystring",
    "readline", "stream", "string_decoder", "timers", "tls", "url", "util", "vm",
    "worker_threads", "zlib",
];

/// npm packages required or imported by JavaScript/TypeScript code, sorted.
pub fn node_dependencies(code: &str) -> Vec<String> {
    let specifiers = JS_REQUIRE
        .captures_iter(code)
        .chain(JS_IMPORT.captures_iter(code))
        .map(|cap| cap[1].to_string());

    let mut packages = BTreeSet::new();
    for specifier in specifiers {
        if specifier.starts_with('.') || specifier.starts_with('/') || specifier.starts_with("node:") {
            continue;
        }
        let mut parts = specifier.split('/');
        let name = match (parts.next(), parts.next()) {
            (Some(scope), Some(pkg)) if scope.starts_with('@') => format!("{scope}/{pkg}"),
            (Some(first), _) => first.to_string(),
            _ => continue,
        };
        if NODE_BUILTINS.iter().any(|b| *b == name) {
            continue;
        }
        packages.insert(name);
    }
    packages.into_iter().collect()
}
