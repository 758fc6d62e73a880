//! Upload checks and download payloads at the transport boundary

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::UploadFormatError;

/// MIME type of xlsx workbooks
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Canonical workbook file extension
pub const XLSX_EXTENSION: &str = "xlsx";

/// Raw uploaded file as handed over by the transport layer
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Upload {
            filename: filename.into(),
            content,
        }
    }

    /// Read an upload from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Upload { filename, content })
    }
}

/// Reject missing, empty or non-xlsx uploads before any decoding
pub fn check_upload(upload: Option<&Upload>) -> Result<&Upload, UploadFormatError> {
    let upload = upload.ok_or(UploadFormatError::Missing)?;

    let extension = Path::new(&upload.filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !extension.eq_ignore_ascii_case(XLSX_EXTENSION) {
        return Err(UploadFormatError::WrongExtension {
            filename: upload.filename.clone(),
        });
    }
    if upload.content.is_empty() {
        return Err(UploadFormatError::Empty {
            filename: upload.filename.clone(),
        });
    }
    Ok(upload)
}

/// Workbook returned to the caller for download
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub mime: &'static str,
    pub content: Vec<u8>,
}

impl Download {
    /// Workbook named `<Entity>.xlsx`
    pub fn workbook(entity: &str, content: Vec<u8>) -> Self {
        Download {
            filename: format!("{}.{}", entity, XLSX_EXTENSION),
            mime: XLSX_MIME,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_upload() {
        assert_eq!(check_upload(None).unwrap_err(), UploadFormatError::Missing);

        let csv = Upload::new("people.csv", b"a,b".to_vec());
        assert!(matches!(
            check_upload(Some(&csv)),
            Err(UploadFormatError::WrongExtension { .. })
        ));

        let empty = Upload::new("people.xlsx", Vec::new());
        assert!(matches!(
            check_upload(Some(&empty)),
            Err(UploadFormatError::Empty { .. })
        ));

        let ok = Upload::new("People.XLSX", vec![1, 2, 3]);
        assert!(check_upload(Some(&ok)).is_ok());
    }

    #[test]
    fn test_download_naming() {
        let d = Download::workbook("Person", vec![0]);
        assert_eq!(d.filename, "Person.xlsx");
        assert_eq!(d.mime, XLSX_MIME);
    }
}
