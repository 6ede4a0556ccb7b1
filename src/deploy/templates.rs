//! Per-platform project templates.
//!
//! Each function takes the generated code and its normalized language and
//! returns the project files in a fixed order. The code is always written
//! verbatim into exactly one file.

use serde_json::json;

use crate::deploy::language::{self, LanguageProfile};
use crate::deploy::packager::FileEntry;

pub const REPLIT_INSTRUCTIONS: &str = "\
1. Create a new Repl and pick \"Import from ZIP\" (or upload the files).
2. Check that .replit points at the right run command.
3. Press Run to try it out.
4. For 24/7 uptime open Deploy → Reserved VM and confirm.";

pub const VERCEL_INSTRUCTIONS: &str = "\
1. Install the CLI: npm i -g vercel
2. Unpack the archive and cd into the folder.
3. Run: vercel (first deploy creates the project).
4. Run: vercel --prod to publish to production.";

pub const NETLIFY_INSTRUCTIONS: &str = "\
1. Open app.netlify.com/drop.
2. Unpack the archive and drag the folder onto the page.
3. Netlify publishes the site and gives you a URL.
4. Optional: connect a Git repository for automatic deploys.";

pub const RAILWAY_INSTRUCTIONS: &str = "\
1. Install the CLI: npm i -g @railway/cli
2. Unpack the archive, cd into the folder and run: railway login
3. Run: railway init, then railway up
4. Add environment variables (tokens, keys) under Variables in the dashboard.";

pub const RENDER_INSTRUCTIONS: &str = "\
1. Push the unpacked folder to a GitHub or GitLab repository.
2. In the Render dashboard choose New → Blueprint and pick the repository.
3. Render reads render.yaml and builds the Dockerfile.
4. Add environment variables under Environment, then deploy.";

/// Replit: source, `.replit` run descriptor, manifest.
pub fn replit(code: &str, lang: &str) -> Vec<FileEntry> {
    let profile = language::profile_or_fallback(lang);
    let is_site = profile.is_static || is_browser_script(lang, code);
    let (mut files, run) = if is_site {
        (static_site(code, lang), "npx serve .")
    } else {
        (source_and_manifest(code, profile), profile.start_command)
    };
    files.push(FileEntry::new(
        ".replit",
        format!("run = \"{run}\"\n\n[deployment]\nrun = [\"sh\", \"-c\", \"{run}\"]\ndeploymentTarget = \"gce\"\n"),
    ));
    files.push(readme("Replit", profile, run));
    files
}

/// Vercel: static files, or a serverless function under `api/`.
pub fn vercel(code: &str, lang: &str) -> Vec<FileEntry> {
    let profile = language::profile_or_fallback(lang);

    if profile.is_static || is_browser_script(lang, code) {
        let mut files = static_site(code, lang);
        files.push(json_file("vercel.json", json!({ "cleanUrls": true })));
        files.push(readme("Vercel", profile, "vercel dev"));
        return files;
    }

    let function_path = match profile.name {
        "python" => "api/index.py",
        "typescript" => "api/index.ts",
        _ => "api/index.js",
    };
    let mut files = vec![FileEntry::new(function_path, code)];
    files.extend(language::function_manifest(profile, code));
    files.push(json_file(
        "vercel.json",
        json!({ "rewrites": [{ "source": "/(.*)", "destination": "/api" }] }),
    ));
    files.push(readme("Vercel", profile, "vercel dev"));
    files
}

/// Netlify: static site plus `netlify.toml`.
pub fn netlify(code: &str, lang: &str) -> Vec<FileEntry> {
    let profile = language::profile_or_fallback(lang);
    let mut files = static_site(code, lang);
    files.push(FileEntry::new(
        "netlify.toml",
        "[build]\n  publish = \".\"\n",
    ));
    files.push(readme("Netlify", profile, "npx netlify-cli dev"));
    files
}

/// Railway: source, manifest, `Procfile` and `railway.json`.
pub fn railway(code: &str, lang: &str) -> Vec<FileEntry> {
    let profile = language::profile_or_fallback(lang);
    let mut files = source_and_manifest(code, profile);
    files.push(FileEntry::new("Procfile", format!("web: {}\n", profile.start_command)));
    files.push(json_file(
        "railway.json",
        json!({
            "$schema": "https://railway.app/railway.schema.json",
            "deploy": {
                "startCommand": profile.start_command,
                "restartPolicyType": "ON_FAILURE",
            },
        }),
    ));
    files.push(readme("Railway", profile, profile.start_command));
    files
}

/// Render: source, manifest, `Dockerfile` and `render.yaml` blueprint.
pub fn render(code: &str, lang: &str) -> Vec<FileEntry> {
    let profile = language::profile_or_fallback(lang);
    let mut files = source_and_manifest(code, profile);
    files.push(FileEntry::new("Dockerfile", dockerfile(profile)));
    files.push(FileEntry::new(
        "render.yaml",
        "services:\n  - type: web\n    name: generated-app\n    runtime: docker\n    dockerfilePath: ./Dockerfile\n    plan: free\n",
    ));
    files.push(readme("Render", profile, "docker build -t app . && docker run -p 10000:10000 app"));
    files
}

fn source_and_manifest(code: &str, profile: &LanguageProfile) -> Vec<FileEntry> {
    let mut files = vec![FileEntry::new(profile.source_file, code)];
    files.extend(language::dependency_manifest(profile, code));
    files
}

/// Browser-side JavaScript rather than a Node program.
fn is_browser_script(lang: &str, code: &str) -> bool {
    lang == "javascript"
        && ["document.", "window.", "addEventListener(\"DOMContentLoaded\""]
            .iter()
            .any(|marker| code.contains(marker))
}

/// Static site files: the code goes verbatim into the file matching its
/// language, with an `index.html` shell added when the code is not HTML.
fn static_site(code: &str, lang: &str) -> Vec<FileEntry> {
    match lang {
        "css" => vec![
            FileEntry::new("index.html", html_shell("<link rel=\"stylesheet\" href=\"style.css\">", "")),
            FileEntry::new("style.css", code),
        ],
        "javascript" => vec![
            FileEntry::new("index.html", html_shell("", "<script src=\"script.js\"></script>")),
            FileEntry::new("script.js", code),
        ],
        _ => vec![FileEntry::new("index.html", code)],
    }
}

fn html_shell(head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n  <title>Generated app</title>\n  {head}\n</head>\n<body>\n  {body}\n</body>\n</html>\n"
    )
}

fn dockerfile(profile: &LanguageProfile) -> String {
    match profile.name {
        "python" => "FROM python:3.12-slim\nWORKDIR /app\nCOPY requirements.txt .\nRUN pip install --no-cache-dir -r requirements.txt\nCOPY . .\nCMD [\"python\", \"main.py\"]\n".to_string(),
        "javascript" | "typescript" => "FROM node:20-slim\nWORKDIR /app\nCOPY package.json .\nRUN npm install\nCOPY . .\nCMD [\"npm\", \"start\"]\n".to_string(),
        "go" => "FROM golang:1.22\nWORKDIR /app\nCOPY . .\nRUN go build -o app main.go\nCMD [\"./app\"]\n".to_string(),
        "rust" => "FROM rust:1.80\nWORKDIR /app\nCOPY . .\nRUN cargo build --release\nCMD [\"./target/release/generated-app\"]\n".to_string(),
        "ruby" => "FROM ruby:3.3-slim\nWORKDIR /app\nCOPY Gemfile .\nRUN bundle install\nCOPY . .\nCMD [\"ruby\", \"main.rb\"]\n".to_string(),
        "php" => "FROM php:8.3-cli\nWORKDIR /app\nCOPY . .\nCMD [\"php\", \"-S\", \"0.0.0.0:10000\"]\n".to_string(),
        "java" => "FROM eclipse-temurin:21\nWORKDIR /app\nCOPY . .\nRUN javac Main.java\nCMD [\"java\", \"Main\"]\n".to_string(),
        _ => format!(
            "FROM debian:bookworm-slim\nWORKDIR /app\nCOPY . .\nCMD [\"sh\", \"-c\", \"{}\"]\n",
            profile.start_command
        ),
    }
}

fn readme(platform: &str, profile: &LanguageProfile, run: &str) -> FileEntry {
    FileEntry::new(
        "README.md",
        format!(
            "# Generated app\n\nLanguage: {}\nTarget: {platform}\n\n## Run locally\n\n```\n{run}\n```\n",
            profile.name
        ),
    )
}

fn json_file(path: &str, value: serde_json::Value) -> FileEntry {
    let mut content = serde_json::to_string_pretty(&value).unwrap_or_default();
    content.push('\n');
    FileEntry::new(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(files: &[FileEntry]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    fn find<'a>(files: &'a [FileEntry], path: &str) -> &'a FileEntry {
        files
            .iter()
            .find(|f| f.path == path)
            .unwrap_or_else(|| panic!("missing {path}"))
    }

    #[test]
    fn test_railway_python() {
        let files = railway("print('hello')", "python");
        assert_eq!(
            paths(&files),
            vec!["main.py", "requirements.txt", "Procfile", "railway.json", "README.md"]
        );
        assert_eq!(find(&files, "main.py").content, "print('hello')");
        assert_eq!(find(&files, "Procfile").content, "web: python main.py\n");
    }

    #[test]
    fn test_railway_node_has_package_json() {
        let files = railway("const express = require('express');", "javascript");
        assert_eq!(find(&files, "index.js").content, "const express = require('express');");
        assert!(find(&files, "package.json").content.contains("\"express\""));
    }

    #[test]
    fn test_render_ships_dockerfile() {
        let files = render("package main\nfunc main() {}", "go");
        assert!(paths(&files).contains(&"Dockerfile"));
        assert!(paths(&files).contains(&"render.yaml"));
        assert!(find(&files, "Dockerfile").content.contains("go build"));
    }

    #[test]
    fn test_netlify_html_verbatim() {
        let html = "<html><body>hi</body></html>";
        let files = netlify(html, "html");
        assert_eq!(paths(&files), vec!["index.html", "netlify.toml", "README.md"]);
        assert_eq!(find(&files, "index.html").content, html);
    }

    #[test]
    fn test_netlify_css_gets_shell() {
        let files = netlify("body { color: red; }", "css");
        assert_eq!(find(&files, "style.css").content, "body { color: red; }");
        assert!(find(&files, "index.html").content.contains("style.css"));
    }

    #[test]
    fn test_vercel_python_function() {
        let files = vercel("from flask import Flask\napp = Flask(__name__)", "python");
        assert_eq!(paths(&files), vec!["api/index.py", "requirements.txt", "vercel.json", "README.md"]);
        assert_eq!(find(&files, "requirements.txt").content, "flask\n");
    }

    #[test]
    fn test_vercel_node_function_has_no_entry_point() {
        let files = vercel("const express = require('express');\nmodule.exports = (req, res) => res.send('ok');", "javascript");
        assert_eq!(paths(&files), vec!["api/index.js", "package.json", "vercel.json", "README.md"]);
        let manifest: serde_json::Value =
            serde_json::from_str(&find(&files, "package.json").content).unwrap();
        assert!(manifest.get("main").is_none());
        assert!(manifest.get("scripts").is_none());
        assert_eq!(manifest["dependencies"]["express"], "latest");
    }

    #[test]
    fn test_vercel_browser_script_is_static() {
        let files = vercel("document.body.textContent = 'hi';", "javascript");
        assert!(paths(&files).contains(&"script.js"));
        assert!(!paths(&files).iter().any(|p| p.starts_with("api/")));
    }

    #[test]
    fn test_replit_unknown_language() {
        let files = replit("just some text", "unknown");
        assert_eq!(paths(&files), vec!["main.txt", ".replit", "README.md"]);
    }

    #[test]
    fn test_replit_run_command() {
        let files = replit("puts 'hi'", "ruby");
        assert!(find(&files, ".replit").content.starts_with("run = \"ruby main.rb\""));
    }
}
