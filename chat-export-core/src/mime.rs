//! Extension and MIME lookups used when naming artifacts and attachments.

use std::sync::LazyLock;

use regex::Regex;

/// Extension to MIME type. The first extension listed for a type is its
/// canonical one.
const MIME_TYPES: &[(&str, &str)] = &[
    // Web
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("ts", "application/typescript"),
    ("jsx", "text/jsx"),
    ("tsx", "text/tsx"),
    ("svg", "image/svg+xml"),
    // Programming languages
    ("py", "text/x-python"),
    ("dart", "application/dart"),
    ("java", "text/x-java"),
    ("go", "text/x-go"),
    ("rs", "text/x-rust"),
    ("rb", "text/x-ruby"),
    ("php", "text/x-php"),
    // Data and config
    ("json", "application/json"),
    ("yaml", "text/yaml"),
    ("yml", "text/yaml"),
    ("xml", "text/xml"),
    ("md", "text/markdown"),
    ("txt", "text/plain"),
];

/// Artifact types that are not registered MIME types but still imply an
/// extension.
const ARTIFACT_TYPES: &[(&str, &str)] = &[
    ("application/vnd.ant.react", "jsx"),
    ("application/vnd.ant.mermaid", "mmd"),
];

const LANGUAGES: &[(&str, &str)] = &[
    ("python", "py"),
    ("javascript", "js"),
    ("typescript", "ts"),
    ("java", "java"),
    ("rust", "rs"),
    ("ruby", "rb"),
    ("golang", "go"),
    ("markdown", "md"),
    ("shell", "sh"),
    ("bash", "sh"),
];

pub const DEFAULT_EXTENSION: &str = "txt";

/// Characters of an artifact body inspected when sniffing.
const SNIFF_WINDOW: usize = 1000;

static JS_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+.*\s+from\s+").expect("valid regex"));
static PYTHON_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(def|class|import)\s+").expect("valid regex"));
static JAVA_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(public|private|class|interface)\s+").expect("valid regex")
});

pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    MIME_TYPES
        .iter()
        .find(|(_, known)| *known == mime)
        .map(|(ext, _)| *ext)
        .or_else(|| {
            ARTIFACT_TYPES
                .iter()
                .find(|(known, _)| *known == mime)
                .map(|(_, ext)| *ext)
        })
}

/// Extension for a language tag: a known language name, or a tag that is
/// itself an extension (`rs`, `yml`, ...).
pub fn extension_for_language(language: &str) -> Option<&'static str> {
    let language = language.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, ext)| *ext)
        .or_else(|| mime_for_extension(&language).and_then(extension_for_mime))
}

/// Guess an extension from the leading characters of a text body.
pub fn sniff_extension(content: &str) -> Option<&'static str> {
    let trimmed = content.trim();
    let end = trimmed
        .char_indices()
        .nth(SNIFF_WINDOW)
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());
    let head = &trimmed[..end];

    if head.contains("<?xml") || head.contains("<svg") {
        Some("svg")
    } else if head.contains("<!DOCTYPE html") || head.contains("<html") {
        Some("html")
    } else if JS_IMPORT.is_match(head) {
        Some("js")
    } else if PYTHON_DECL.is_match(head) {
        Some("py")
    } else if JAVA_DECL.is_match(head) {
        Some("java")
    } else {
        None
    }
}

/// Extension (without dot) for an artifact. Declared type first, then
/// language, then content sniffing, then `txt`.
pub fn artifact_extension(
    declared_type: Option<&str>,
    language: Option<&str>,
    body: &str,
) -> &'static str {
    declared_type
        .and_then(extension_for_mime)
        .or_else(|| language.and_then(extension_for_language))
        .or_else(|| sniff_extension(body))
        .unwrap_or(DEFAULT_EXTENSION)
}
