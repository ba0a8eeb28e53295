//! Zip packaging for the assessment download.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::documents::GeneratedDocument;
use crate::errors::AppError;

pub const ARCHIVE_NAME: &str = "Assessments.zip";

/// Zips the documents. Refuses to build a partial archive: the document count
/// must equal `expected`, names must be unique and no document may be empty.
pub fn package_documents(
    documents: &[GeneratedDocument],
    expected: usize,
) -> Result<Vec<u8>, AppError> {
    if documents.len() != expected {
        return Err(AppError::Packaging(format!(
            "expected {expected} documents but {} were generated",
            documents.len()
        )));
    }

    let mut names = HashSet::new();
    for doc in documents {
        if doc.bytes.is_empty() {
            return Err(AppError::Packaging(format!("{} is empty", doc.file_name)));
        }
        if !names.insert(doc.file_name.as_str()) {
            return Err(AppError::Packaging(format!(
                "duplicate document name {}",
                doc.file_name
            )));
        }
    }

    let zip_err = |e: zip::result::ZipError| AppError::Packaging(e.to_string());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for doc in documents {
        writer.start_file(doc.file_name.as_str(), options).map_err(zip_err)?;
        writer
            .write_all(&doc.bytes)
            .map_err(|e| AppError::Packaging(e.to_string()))?;
    }

    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use zip::ZipArchive;

    use super::*;

    fn doc(name: &str) -> GeneratedDocument {
        GeneratedDocument {
            file_name: name.to_string(),
            bytes: format!("contents of {name}").into_bytes(),
        }
    }

    #[test]
    fn test_archive_contains_every_document() {
        let docs = vec![
            doc("Jane_Tan_Assessment.docx"),
            doc("Alex_Ng_Assessment.docx"),
            doc("Assessment_Answer_Key.docx"),
        ];
        let bytes = package_documents(&docs, 3).unwrap();

        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "Alex_Ng_Assessment.docx",
                "Assessment_Answer_Key.docx",
                "Jane_Tan_Assessment.docx"
            ]
        );
    }

    #[test]
    fn test_count_mismatch_fails_instead_of_truncating() {
        let docs = vec![doc("Jane_Tan_Assessment.docx")];
        assert!(matches!(
            package_documents(&docs, 2),
            Err(AppError::Packaging(_))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let docs = vec![doc("A_Assessment.docx"), doc("A_Assessment.docx")];
        assert!(matches!(
            package_documents(&docs, 2),
            Err(AppError::Packaging(_))
        ));
    }

    #[test]
    fn test_empty_document_rejected() {
        let docs = vec![GeneratedDocument {
            file_name: "Assessment_Answer_Key.docx".to_string(),
            bytes: vec![],
        }];
        assert!(matches!(
            package_documents(&docs, 1),
            Err(AppError::Packaging(_))
        ));
    }
}
