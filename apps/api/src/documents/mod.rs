// Document handling: text extraction from uploads, assessment rendering,
// and zip packaging. Everything stays in memory; nothing is written to disk.

pub mod extract;
pub mod package;
pub mod render;

use bytes::Bytes;

/// A file received from the browser.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name without directory or extension.
    pub fn stem(&self) -> &str {
        let base = self
            .file_name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.file_name);
        base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base)
    }
}

/// A rendered document held in memory until it is packaged.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_strips_path_and_extension() {
        assert_eq!(UploadedFile::new("cvs/Jane Tan.pdf", vec![]).stem(), "Jane Tan");
        assert_eq!(UploadedFile::new("C:\\cv\\bob.v2.docx", vec![]).stem(), "bob.v2");
        assert_eq!(UploadedFile::new("README", vec![]).stem(), "README");
    }
}
