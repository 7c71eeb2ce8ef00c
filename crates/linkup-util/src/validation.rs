use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("value is too long (max {max}, got {got})")]
    TooLong { max: usize, got: usize },
    #[error("invalid format")]
    InvalidFormat,
}

/// Message bodies are capped at 4000 bytes. An empty body is allowed here;
/// the body-or-attachment rule is enforced at the service layer where the
/// attachment is known.
pub fn validate_message_body(body: &str) -> Result<(), ValidationError> {
    let len = body.len();
    if len > 4000 {
        return Err(ValidationError::TooLong { max: 4000, got: len });
    }
    Ok(())
}

pub fn validate_attachment_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() || url.len() > 2048 {
        return Err(ValidationError::InvalidFormat);
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ValidationError::InvalidFormat);
    }
    Ok(())
}
