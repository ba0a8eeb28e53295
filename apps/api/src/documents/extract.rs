//! Document text extraction for uploaded job descriptions and resumes.

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported document '{0}' (expected .pdf, .docx or .txt)")]
    UnsupportedFormat(String),

    #[error("failed to read PDF '{file}': {reason}")]
    Pdf { file: String, reason: String },

    #[error("failed to read DOCX '{file}': {reason}")]
    Docx { file: String, reason: String },

    #[error("'{0}' is not valid UTF-8 text")]
    Encoding(String),

    #[error("no text could be extracted from '{0}'")]
    NoText(String),

    #[error("text extraction for '{0}' aborted unexpectedly")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    /// Detects the document kind from the uploaded file's extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Extracts plain text from a document. Fails if nothing readable remains.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let kind = DocumentKind::from_file_name(file_name)
        .ok_or_else(|| ExtractionError::UnsupportedFormat(file_name.to_string()))?;

    let text = match kind {
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf {
                file: file_name.to_string(),
                reason: e.to_string(),
            })?
        }
        DocumentKind::Docx => extract_docx_text(file_name, bytes)?,
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractionError::Encoding(file_name.to_string()))?,
    };

    let text = normalise_whitespace(&text);
    if text.is_empty() {
        return Err(ExtractionError::NoText(file_name.to_string()));
    }

    debug!("Extracted {} chars from '{}'", text.len(), file_name);
    Ok(text)
}

/// Runs extraction on the blocking pool. PDF parsing is CPU-bound and can
/// panic on malformed input; a panic is reported as `Aborted`.
pub async fn extract_text_blocking(
    file_name: String,
    bytes: Bytes,
) -> Result<String, ExtractionError> {
    let name = file_name.clone();
    tokio::task::spawn_blocking(move || extract_text(&file_name, &bytes))
        .await
        .map_err(|_| ExtractionError::Aborted(name))?
}

fn extract_docx_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx {
        file: file_name.to_string(),
        reason: e.to_string(),
    })?;

    let mut text = String::new();
    for child in docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(p) => {
                push_paragraph(&mut text, &p);
            }
            docx_rs::DocumentChild::Table(table) => {
                push_table(&mut text, &table);
            }
            _ => {}
        }
    }
    Ok(text)
}

fn push_paragraph(out: &mut String, paragraph: &docx_rs::Paragraph) {
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    docx_rs::RunChild::Text(t) => out.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => out.push('\t'),
                    docx_rs::RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }
    out.push('\n');
}

// Resumes frequently lay out sections in tables.
#[allow(irrefutable_let_patterns)]
fn push_table(out: &mut String, table: &docx_rs::Table) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row else {
            continue;
        };
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            for content in &cell.children {
                if let docx_rs::TableCellContent::Paragraph(p) = content {
                    push_paragraph(out, p);
                }
            }
        }
    }
}

/// Trims each line and drops runs of blank lines.
fn normalise_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = docx_rs::Docx::new();
        for p in paragraphs {
            docx = docx.add_paragraph(
                docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*p)),
            );
        }
        let mut buf = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_kind_from_extension_is_case_insensitive() {
        assert_eq!(DocumentKind::from_file_name("cv.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_file_name("cv.docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_file_name("cv.txt"), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_file_name("cv.doc"), None);
        assert_eq!(DocumentKind::from_file_name("resume"), None);
    }

    #[test]
    fn test_plain_text_is_normalised() {
        let text = extract_text("jd.txt", b"  Data Engineer  \n\n\n  Build pipelines \n").unwrap();
        assert_eq!(text, "Data Engineer\nBuild pipelines");
    }

    #[test]
    fn test_empty_document_is_no_text_error() {
        assert!(matches!(
            extract_text("blank.txt", b"   \n  "),
            Err(ExtractionError::NoText(_))
        ));
    }

    #[test]
    fn test_docx_paragraphs_extracted() {
        let bytes = docx_bytes(&["Jane Tan", "BSc Computer Science"]);
        let text = extract_text("jane.docx", &bytes).unwrap();
        assert!(text.contains("Jane Tan"));
        assert!(text.contains("BSc Computer Science"));
    }

    #[test]
    fn test_corrupt_docx_is_docx_error() {
        assert!(matches!(
            extract_text("broken.docx", b"definitely not a zip"),
            Err(ExtractionError::Docx { .. })
        ));
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            extract_text("photo.png", b"\x89PNG"),
            Err(ExtractionError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_blocking_extraction_reports_errors() {
        let result = extract_text_blocking("bad.pdf".to_string(), Bytes::from_static(b"nope")).await;
        assert!(result.is_err());
    }
}
