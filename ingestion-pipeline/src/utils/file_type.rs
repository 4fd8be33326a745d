use std::{fmt, path::Path};

use serde::Serialize;

/// Media type of a Word document.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Message shown when an upload contains a file of an unsupported type.
pub const UNSUPPORTED_FILE_MESSAGE: &str = "Please upload PDF, DOCX, TXT, or CSV files only";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Pdf,
    Docx,
    Txt,
    Unknown,
}

impl FileKind {
    /// Classifies an upload by its file name extension (case-insensitive),
    /// falling back to the declared content type.
    pub fn classify(file_name: &str, content_type: Option<&str>) -> Self {
        match Self::from_file_name(file_name) {
            Self::Unknown => content_type.map_or(Self::Unknown, Self::from_mime),
            known => known,
        }
    }

    pub fn from_file_name(file_name: &str) -> Self {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Self::Csv,
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            Some("txt") => Self::Txt,
            _ => Self::Unknown,
        }
    }

    pub fn from_mime(content_type: &str) -> Self {
        let Ok(parsed) = content_type.parse::<mime::Mime>() else {
            return Self::Unknown;
        };

        match parsed.essence_str() {
            essence if essence == mime::TEXT_CSV.essence_str() => Self::Csv,
            essence if essence == mime::APPLICATION_PDF.essence_str() => Self::Pdf,
            essence if essence == mime::TEXT_PLAIN.essence_str() => Self::Txt,
            DOCX_MIME => Self::Docx,
            _ => Self::Unknown,
        }
    }

    /// CSV files carry comments as rows; every other kind is free text.
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Csv)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduces a client supplied file name to a safe single path segment.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.trim_start_matches('.');
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Sanitized storage name whose extension matches `kind`, so the stored
/// object can be classified again from its location alone.
pub fn stored_file_name(file_name: &str, kind: FileKind) -> String {
    let sanitized = sanitize_file_name(file_name);
    if kind == FileKind::Unknown || FileKind::from_file_name(&sanitized) == kind {
        sanitized
    } else {
        format!("{sanitized}.{kind}")
    }
}
