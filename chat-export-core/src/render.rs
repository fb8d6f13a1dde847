//! HTML and Markdown renderers.
//!
//! A renderer turns one [`Message`] into a document fragment. Documents are
//! `start()`, every fragment in order, then `end()`. Artifact links and
//! bodies come from the run's [`ArtifactIndex`]; attachment and file links
//! come from [`ArchivePath`], the same paths the archive is written with.

use crate::message::{ArtifactCommand, Attachment, ContentItem, FileKind, FileRef, Message, Sender};
use crate::paths::ArchivePath;
use crate::resolve::{ArtifactIndex, ArtifactOutcome};

pub trait Renderer {
    /// Constant document header.
    fn start(&self) -> String;

    fn render(&self, message: &Message, artifacts: &ArtifactIndex) -> String;

    /// Constant document footer.
    fn end(&self) -> String;

    fn render_document(&self, messages: &[Message], artifacts: &ArtifactIndex) -> String {
        let mut document = self.start();
        for message in messages {
            document.push_str(&self.render(message, artifacts));
        }
        document.push_str(&self.end());
        document
    }
}

/// Escape text for embedding in HTML element content or attribute values.
pub fn escape_html(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn sender_icon(sender: Sender) -> &'static str {
    match sender {
        Sender::Human => "👤",
        Sender::Assistant => "🤖",
    }
}

/// Artifact as it should be shown: the resolved version when there is one.
enum ArtifactView<'a> {
    Resolved {
        href: String,
        language: Option<&'a str>,
        body: &'a str,
    },
    Skipped(String),
    Unresolved {
        language: Option<&'a str>,
        body: &'a str,
    },
}

fn artifact_view<'a>(
    message: &Message,
    position: usize,
    command: &'a ArtifactCommand,
    artifacts: &'a ArtifactIndex,
) -> ArtifactView<'a> {
    match artifacts.get(&message.id, position) {
        Some(ArtifactOutcome::Installed(version)) => ArtifactView::Resolved {
            href: version.path.href(),
            language: version.language.as_deref(),
            body: &version.body,
        },
        Some(ArtifactOutcome::Skipped(reason)) => ArtifactView::Skipped(reason.to_string()),
        None => ArtifactView::Unresolved {
            language: command.language.as_deref(),
            body: command.body.as_deref().unwrap_or_default(),
        },
    }
}

const HTML_START: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Chat Export</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            max-width: 900px;
            margin: 0 auto;
            padding: 2rem;
            background: #f8f9fa;
        }
        .message {
            margin: 1.5rem 0;
            padding: 1.5rem;
            border-radius: 8px;
            background: white;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .message-header {
            font-weight: 600;
            margin-bottom: 1rem;
            color: #495057;
        }
        .message-time {
            font-weight: 400;
            font-size: 0.875rem;
            margin-left: 0.5rem;
        }
        .human { border-left: 4px solid #6c757d; }
        .human .message-header { color: #6c757d; }
        .assistant { border-left: 4px solid #0d6efd; }
        .assistant .message-header { color: #0d6efd; }
        .file-attachment {
            display: flex;
            align-items: center;
            margin: 1rem 0;
            padding: 0.75rem;
            background: #f8f9fa;
            border-radius: 6px;
            border: 1px solid #dee2e6;
        }
        .file-icon { margin-right: 0.75rem; color: #6c757d; }
        .file-info { flex-grow: 1; }
        .file-name { font-weight: 500; color: #0d6efd; text-decoration: none; }
        .file-name:hover { text-decoration: underline; }
        .file-type { font-size: 0.875rem; color: #6c757d; }
        .artifact-note { font-size: 0.875rem; color: #6c757d; font-style: italic; }
        img { max-width: 100%; height: auto; border-radius: 4px; }
        pre {
            background: #f8f9fa;
            padding: 1rem;
            border-radius: 4px;
            overflow-x: auto;
        }
        code { font-family: 'Menlo', 'Monaco', 'Courier New', monospace; }
    </style>
</head>
<body>
<h1>Chat Export</h1>
<div class="notice">
    Note: For file links to work, keep this HTML file in the same folder as the "files" directory from the ZIP.
</div>
"#;

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn content_item(
        &self,
        message: &Message,
        position: usize,
        item: &ContentItem,
        artifacts: &ArtifactIndex,
    ) -> Option<String> {
        match item {
            ContentItem::Text { text } if !text.is_empty() => Some(format!(
                "<p>{}</p>",
                escape_html(text).replace('\n', "<br>")
            )),
            ContentItem::ToolUse(command) => {
                let title = escape_html(command.display_title());
                Some(match artifact_view(message, position, command, artifacts) {
                    ArtifactView::Resolved {
                        href,
                        language,
                        body,
                    } => {
                        let language = escape_html(language.unwrap_or("text"));
                        format!(
                            r#"<div class="file-attachment">
    <div class="file-icon">📄</div>
    <div class="file-info">
        <a href="{href}" class="file-name">{title}</a>
        <div class="file-type">Artifact - {language}</div>
    </div>
</div>
<pre><code class="language-{language}">{}</code></pre>"#,
                            escape_html(body)
                        )
                    }
                    ArtifactView::Unresolved { language, body } => {
                        let language = escape_html(language.unwrap_or("text"));
                        format!(
                            r#"<div class="file-type">Artifact - {title}</div>
<pre><code class="language-{language}">{}</code></pre>"#,
                            escape_html(body)
                        )
                    }
                    ArtifactView::Skipped(reason) => format!(
                        r#"<div class="artifact-note">Artifact {title} was not updated: {}</div>"#,
                        escape_html(&reason)
                    ),
                })
            }
            _ => None,
        }
    }

    fn attachment(&self, attachment: &Attachment) -> String {
        let path = ArchivePath::for_attachment(attachment);
        format!(
            r#"<div class="file-attachment">
    <div class="file-icon">📎</div>
    <div class="file-info">
        <a href="{}" class="file-name">{}</a>
        <div class="file-type">Attachment</div>
    </div>
</div>"#,
            path.href(),
            escape_html(&attachment.file_name)
        )
    }

    fn file(&self, file: &FileRef) -> String {
        let href = ArchivePath::for_file(file).href();
        let name = escape_html(&file.file_name);
        match file.kind {
            FileKind::Image => format!(
                r#"<div class="file-attachment">
    <a href="{href}" target="_blank">
        <img src="{href}" alt="{name}">
    </a>
    <div class="file-info">
        <a href="{href}" class="file-name">{name}</a>
        <div class="file-type">Image</div>
    </div>
</div>"#
            ),
            FileKind::Other => format!(
                r#"<div class="file-attachment">
    <div class="file-icon">📄</div>
    <div class="file-info">
        <a href="{href}" class="file-name">{name}</a>
        <div class="file-type">File</div>
    </div>
</div>"#
            ),
        }
    }
}

impl Renderer for HtmlRenderer {
    fn start(&self) -> String {
        HTML_START.to_string()
    }

    fn render(&self, message: &Message, artifacts: &ArtifactIndex) -> String {
        let content: Vec<String> = message
            .content
            .iter()
            .enumerate()
            .filter_map(|(position, item)| self.content_item(message, position, item, artifacts))
            .collect();
        let files: Vec<String> = message
            .attachments
            .iter()
            .map(|attachment| self.attachment(attachment))
            .chain(message.all_files().map(|file| self.file(file)))
            .collect();

        format!(
            r#"<div class="message {sender}">
<div class="message-header">
    {icon} {label}<span class="message-time">{time}</span>
</div>
{content}
{files}
</div>
"#,
            sender = message.sender.as_str(),
            icon = sender_icon(message.sender),
            label = message.sender.label(),
            time = message.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            content = content.join("\n"),
            files = files.join("\n"),
        )
    }

    fn end(&self) -> String {
        "</body></html>\n".to_string()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    fn content_item(
        &self,
        message: &Message,
        position: usize,
        item: &ContentItem,
        artifacts: &ArtifactIndex,
    ) -> Option<String> {
        match item {
            ContentItem::Text { text } if !text.is_empty() => Some(text.clone()),
            ContentItem::ToolUse(command) => {
                let title = command.display_title();
                Some(match artifact_view(message, position, command, artifacts) {
                    ArtifactView::Resolved {
                        href,
                        language,
                        body,
                    } => format!(
                        "📄 **{title}** ([Download](./{href}))\n\n```{}\n{body}\n```",
                        language.unwrap_or_default()
                    ),
                    ArtifactView::Unresolved { language, body } => format!(
                        "📄 **{title}**\n\n```{}\n{body}\n```",
                        language.unwrap_or_default()
                    ),
                    ArtifactView::Skipped(reason) => {
                        format!("_Artifact {title} was not updated: {reason}_")
                    }
                })
            }
            _ => None,
        }
    }

    fn attachment(&self, attachment: &Attachment) -> String {
        let path = ArchivePath::for_attachment(attachment);
        format!(
            "📎 **Attachment:** [{}](./{})",
            attachment.file_name,
            path.href()
        )
    }

    fn file(&self, file: &FileRef) -> String {
        let href = ArchivePath::for_file(file).href();
        let name = &file.file_name;
        match file.kind {
            FileKind::Image => {
                format!("🖼️ **Image:** [{name}](./{href})\n\n![{name}](./{href})")
            }
            FileKind::Other => format!("📄 **File:** [{name}](./{href})"),
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn start(&self) -> String {
        "# Chat Export\n\n> Note: For file links to work, keep this markdown file in the same folder as the \"files\" directory from the ZIP.\n\n".to_string()
    }

    fn render(&self, message: &Message, artifacts: &ArtifactIndex) -> String {
        let header = format!(
            "{} **{}:** _{}_",
            sender_icon(message.sender),
            message.sender.label(),
            message.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let content: Vec<String> = message
            .content
            .iter()
            .enumerate()
            .filter_map(|(position, item)| self.content_item(message, position, item, artifacts))
            .collect();
        let files: Vec<String> = message
            .attachments
            .iter()
            .map(|attachment| self.attachment(attachment))
            .chain(message.all_files().map(|file| self.file(file)))
            .collect();

        let mut fragment = format!("{header}\n\n{}", content.join("\n\n"));
        if !files.is_empty() {
            fragment.push_str("\n\n");
            fragment.push_str(&files.join("\n\n"));
        }
        fragment.push_str("\n\n---\n\n");
        fragment
    }

    fn end(&self) -> String {
        String::new()
    }
}
