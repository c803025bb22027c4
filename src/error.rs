use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No template: {0}")]
    NoTemplate(String),
    #[error("No data rows to generate")]
    NoRows,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to generate QR code: {0}")]
    Qr(String),
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
    #[error("Failed to package export: {0}")]
    Export(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Store(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn missing_background() -> Self {
        Self::NoTemplate("background image is not set".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_reason() {
        let err = AppError::missing_background();
        assert_eq!(
            err.to_string(),
            "No template: background image is not set"
        );
        assert_eq!(AppError::NoRows.to_string(), "No data rows to generate");
    }
}
