//! Resume ingestion: turns an uploaded file into plain text for the matcher.
//! PDF extraction runs on a blocking thread; everything else is read as UTF-8.

use thiserror::Error;
use tokio::task::JoinError;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Uploaded resume contains no readable text")]
    Empty,

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Text extraction task failed: {0}")]
    Task(String),
}

/// Extracts text from resume bytes. PDFs are detected by content type, file
/// extension or the `%PDF` header.
pub async fn extract_resume_text(
    bytes: Vec<u8>,
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, IngestError> {
    let text = if is_pdf(&bytes, file_name, content_type) {
        debug!("Extracting text from {} byte PDF", bytes.len());
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(extraction_task_error)?
            .map_err(|e| IngestError::Pdf(e.to_string()))?
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    };

    if text.trim().is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(text)
}

/// The PDF parser panics on some malformed files; that is a bad upload, not a server fault.
fn extraction_task_error(err: JoinError) -> IngestError {
    if err.is_panic() {
        IngestError::Pdf("malformed PDF could not be parsed".to_string())
    } else {
        IngestError::Task(err.to_string())
    }
}

fn is_pdf(bytes: &[u8], file_name: Option<&str>, content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"))
        || bytes.starts_with(PDF_MAGIC)
}
