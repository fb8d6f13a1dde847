//! Archive paths for everything written under `files/`.
//!
//! Renderers build their links from the same [`ArchivePath`] values the
//! assembler writes entries under, so a link always points at the entry.

use std::fmt;

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::message::{Attachment, FileKind, FileRef};
use crate::resolve::embedded_extension;

/// Characters left alone by `encodeURIComponent`.
const COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Folder {
    Images,
    Attachments,
    Artifacts,
    Other,
}

impl Folder {
    pub fn dir(&self) -> &'static str {
        match self {
            Folder::Images => "files/images",
            Folder::Attachments => "files/attachments",
            Folder::Artifacts => "files/artifacts",
            Folder::Other => "files/other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchivePath {
    folder: Folder,
    file_name: String,
}

impl ArchivePath {
    pub fn new(folder: Folder, file_name: &str) -> Self {
        Self {
            folder,
            file_name: sanitize_file_name(file_name),
        }
    }

    /// `files/attachments/{stem}_{id}{ext}`; the extension comes from the
    /// attachment's name, or from its declared type when the name has none.
    pub fn for_attachment(attachment: &Attachment) -> Self {
        let ext = extension_from_name(&attachment.file_name)
            .map(str::to_string)
            .unwrap_or_else(|| embedded_extension(attachment.file_type.as_deref(), None));
        let stem = file_stem(&attachment.file_name);
        Self::new(
            Folder::Attachments,
            &format!("{stem}_{}{ext}", attachment.id),
        )
    }

    /// `files/images/{name}` for images, `files/other/{name}` otherwise.
    pub fn for_file(file: &FileRef) -> Self {
        let folder = match file.kind {
            FileKind::Image => Folder::Images,
            FileKind::Other => Folder::Other,
        };
        Self::new(folder, &file.file_name)
    }

    /// `files/artifacts/{id}_{timestamp_ms}.{ext}`.
    pub fn for_artifact(artifact_id: &str, timestamp: DateTime<Utc>, extension: &str) -> Self {
        Self::new(
            Folder::Artifacts,
            &format!("{artifact_id}_{}.{extension}", timestamp.timestamp_millis()),
        )
    }

    pub fn folder(&self) -> Folder {
        self.folder
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Entry name inside the archive.
    pub fn entry_name(&self) -> String {
        format!("{}/{}", self.folder.dir(), self.file_name)
    }

    /// Relative link to the entry, with the file name percent-encoded.
    pub fn href(&self) -> String {
        format!(
            "{}/{}",
            self.folder.dir(),
            utf8_percent_encode(&self.file_name, COMPONENT_SET)
        )
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entry_name())
    }
}

/// Extension including the leading dot, if the name has one.
pub fn extension_from_name(name: &str) -> Option<&str> {
    let idx = name.rfind('.')?;
    let ext = &name[idx..];
    if ext.len() > 1 && !ext.contains('/') {
        Some(ext)
    } else {
        None
    }
}

/// Name without its extension.
pub fn file_stem(name: &str) -> &str {
    match extension_from_name(name) {
        Some(ext) => &name[..name.len() - ext.len()],
        None => name,
    }
}

/// Make a declared file name safe to use as a single archive entry segment.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}
