use std::io::{Cursor, Read};

use bytes::Bytes;
use common::error::AppError;
use quick_xml::{events::Event, Reader};
use tracing::debug;

use super::file_type::FileKind;

const DOCX_BODY_PART: &str = "word/document.xml";

/// Raw text of an uploaded document. PDF and DOCX decoding run on the
/// blocking pool.
pub async fn extract_text(kind: FileKind, bytes: Bytes) -> Result<String, AppError> {
    let text = match kind {
        FileKind::Txt | FileKind::Csv => String::from_utf8_lossy(&bytes).into_owned(),
        FileKind::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map(|s| s.trim().to_string())
        })
        .await?
        .map_err(|err| AppError::Processing(format!("Failed to extract text from PDF: {err}")))?,
        FileKind::Docx => tokio::task::spawn_blocking(move || docx_text(&bytes)).await??,
        FileKind::Unknown => {
            return Err(AppError::Validation(
                "cannot extract text from a file of unknown type".into(),
            ))
        }
    };

    debug!(kind = %kind, text_chars = text.chars().count(), "extracted document text");
    Ok(text)
}

fn docx_text(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| AppError::Processing(format!("Failed to open DOCX container: {err}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|err| AppError::Processing(format!("DOCX has no document body: {err}")))?
        .read_to_string(&mut xml)?;

    document_xml_text(&xml)
}

/// Collects `w:t` runs, turning paragraphs, breaks and tabs into whitespace.
fn document_xml_text(xml: &str) -> Result<String, AppError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let unescaped = t.unescape().map_err(|err| {
                    AppError::Processing(format!("Invalid text in DOCX body: {err}"))
                })?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(AppError::Processing(format!(
                    "Failed to parse DOCX body at position {}: {err}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}
