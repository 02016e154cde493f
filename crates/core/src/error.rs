use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest line {line}: {message}")]
    Manifest { line: usize, message: String },
}
