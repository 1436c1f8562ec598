use std::path::Path;

/// Maximum upload size: 1 MiB
pub const MAX_UPLOAD_SIZE: usize = 1024 * 1024; // 1 MiB

/// Spreadsheet formats the pricing job accepts
pub const ALLOWED_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "csv"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validates file size against maximum limit
pub fn validate_file_size(size: u64, max_size: usize) -> Result<(), ValidationError> {
    if size > max_size as u64 {
        return Err(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
                size,
                max_size,
                max_size / 1024 / 1024
            ),
        });
    }
    Ok(())
}

/// Lower-cased extension of `filename`, without the dot
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Only spreadsheet extensions are accepted, case-insensitively
pub fn validate_extension(filename: &str) -> Result<(), ValidationError> {
    match file_extension(filename) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ValidationError {
            code: "UNSUPPORTED_FILE_TYPE",
            message: format!(
                "Only Excel files (.xls, .xlsx, .xlsm, .csv) are allowed, got '{}'",
                filename
            ),
        }),
    }
}

/// Strips directory components so the bucket key is the bare file name
pub fn upload_key_for(path: &str) -> Result<String, ValidationError> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    if name.is_empty() {
        return Err(ValidationError {
            code: "EMPTY_FILENAME",
            message: "Please select a file first!".to_string(),
        });
    }

    Ok(name.to_string())
}

/// Bucket keys are UTF-8; a lossy conversion would silently rename the file
pub fn utf8_path(path: &Path) -> Result<&str, ValidationError> {
    path.to_str().ok_or_else(|| ValidationError {
        code: "INVALID_FILENAME",
        message: format!("File name {} is not valid UTF-8", path.display()),
    })
}

/// Full pre-flight check run before any network call
pub fn validate_upload(
    filename: &str,
    size: u64,
    max_size: usize,
) -> Result<String, ValidationError> {
    let key = upload_key_for(filename)?;
    validate_extension(&key)?;
    validate_file_size(size, max_size)?;
    Ok(key)
}

pub fn validate_chat_input(input: &str) -> Result<&str, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError {
            code: "EMPTY_QUERY",
            message: "Query must not be empty".to_string(),
        });
    }
    Ok(trimmed)
}
