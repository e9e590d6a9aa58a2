use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("PDF parse error: {0}")]
    Pdf(String),
    #[error("{0} is not valid UTF-8 text")]
    NotText(String),
}

/// Lowercased extension of a file name, empty when there is none.
pub fn file_type(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Decode a downloaded knowledge file into plain text.
///
/// PDFs go through text extraction; everything else must be UTF-8.
pub fn decode(name: &str, bytes: &[u8]) -> Result<String, DocError> {
    match file_type(name).as_str() {
        "pdf" => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocError::Pdf(e.to_string()))
        }
        _ => {
            let text = std::str::from_utf8(bytes).map_err(|_| DocError::NotText(name.to_string()))?;
            Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
        }
    }
}
