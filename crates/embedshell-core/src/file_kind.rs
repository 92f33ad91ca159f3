/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Kinds of files a content-originated upload may accept.

use serde::{Deserialize, Serialize};

/// Office formats the host tries to resolve on top of the broad defaults.
pub const OFFICE_DOCUMENT_EXTENSIONS: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "csv", "pages",
    "numbers", "key",
];

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Image,
    Document,
    Audio,
    Video,
    Archive,
    /// Any file at all.
    Data,
    /// A concrete MIME essence such as `application/pdf`.
    Mime(String),
}

impl FileKind {
    /// The broadly compatible kinds every upload dialog offers.
    pub fn defaults() -> [FileKind; 6] {
        [
            FileKind::Image,
            FileKind::Document,
            FileKind::Audio,
            FileKind::Video,
            FileKind::Archive,
            FileKind::Data,
        ]
    }

    /// Resolve a file extension to a concrete kind through the MIME table.
    ///
    /// Returns `None` for extensions the table does not know.
    pub fn resolve_extension(extension: &str) -> Option<FileKind> {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            return None;
        }
        mime_guess::from_ext(extension)
            .first_raw()
            .map(|essence| FileKind::Mime(essence.to_owned()))
    }

    /// Kinds the MIME table resolves for [`OFFICE_DOCUMENT_EXTENSIONS`].
    pub fn office_documents() -> Vec<FileKind> {
        let mut kinds: Vec<FileKind> = OFFICE_DOCUMENT_EXTENSIONS
            .iter()
            .filter_map(|extension| Self::resolve_extension(extension))
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Parse an HTML `accept` token (`image/*`, `.pdf`, `text/csv`).
    pub fn from_accept_token(token: &str) -> Option<FileKind> {
        let token = token.trim();
        if token.starts_with('.') {
            return Self::resolve_extension(token);
        }
        match token {
            "image/*" => Some(FileKind::Image),
            "audio/*" => Some(FileKind::Audio),
            "video/*" => Some(FileKind::Video),
            "*/*" | "*" => Some(FileKind::Data),
            "" => None,
            essence if essence.contains('/') => Some(FileKind::Mime(essence.to_ascii_lowercase())),
            _ => None,
        }
    }

    /// File name extensions a dialog can use to filter for this kind.
    ///
    /// An empty list means "do not filter".
    pub fn extensions(&self) -> Vec<&'static str> {
        match self {
            FileKind::Image => vec!["png", "jpg", "jpeg", "gif", "webp", "heic", "bmp", "svg", "tiff"],
            FileKind::Document => vec!["pdf", "txt", "md", "html", "json", "xml"],
            FileKind::Audio => vec!["mp3", "m4a", "wav", "aac", "flac", "ogg"],
            FileKind::Video => vec!["mp4", "mov", "m4v", "webm", "avi", "mkv"],
            FileKind::Archive => vec!["zip", "tar", "gz", "tgz", "7z", "rar"],
            FileKind::Data => Vec::new(),
            FileKind::Mime(essence) => mime_guess::get_mime_extensions_str(essence)
                .map(|extensions| extensions.to_vec())
                .unwrap_or_default(),
        }
    }
}
