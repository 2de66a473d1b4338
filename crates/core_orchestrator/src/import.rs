use std::time::Duration;

use core_types::UploadFile;
use thiserror::Error;

pub const ALLOWED_IMPORT_EXTENSIONS: [&str; 7] =
    [".json", ".csv", ".xlsx", ".xls", ".txt", ".md", ".pdf"];

pub const MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;

/// Delay before a successful import closes its dialog and refreshes.
pub const IMPORT_AUTO_CLOSE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImportRejection {
    #[error("unsupported file type: {file_name}")]
    UnsupportedExtension { file_name: String },

    #[error("file is {size} bytes, limit is {limit}", limit = MAX_IMPORT_BYTES)]
    TooLarge { size: u64 },
}

/// Local checks run before anything is uploaded.
pub fn validate_import(file: &UploadFile) -> Result<(), ImportRejection> {
    let allowed = file
        .extension()
        .is_some_and(|ext| ALLOWED_IMPORT_EXTENSIONS.contains(&ext.as_str()));
    if !allowed {
        return Err(ImportRejection::UnsupportedExtension {
            file_name: file.file_name.clone(),
        });
    }
    if file.size() > MAX_IMPORT_BYTES {
        return Err(ImportRejection::TooLarge { size: file.size() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extension() {
        let file = UploadFile::new("data.exe", vec![0; 10]);
        assert!(matches!(
            validate_import(&file),
            Err(ImportRejection::UnsupportedExtension { .. })
        ));
        let file = UploadFile::new("noext", vec![0; 10]);
        assert!(validate_import(&file).is_err());
    }

    #[test]
    fn rejects_oversize_file() {
        let file = UploadFile::new("big.json", vec![0; 11 * 1024 * 1024]);
        assert_eq!(
            validate_import(&file),
            Err(ImportRejection::TooLarge {
                size: 11 * 1024 * 1024
            })
        );
    }

    #[test]
    fn accepts_listed_types_case_insensitively() {
        assert_eq!(validate_import(&UploadFile::new("rows.csv", vec![0; 1024])), Ok(()));
        assert_eq!(validate_import(&UploadFile::new("Notes.MD", Vec::new())), Ok(()));
        let limit = usize::try_from(MAX_IMPORT_BYTES).expect("fits");
        assert_eq!(validate_import(&UploadFile::new("edge.pdf", vec![0; limit])), Ok(()));
    }
}
