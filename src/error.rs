//! Error types for the PDF pipeline.

use std::fmt;

use thiserror::Error;

/// Failures raised while turning a data URI into image bytes on disk.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The `data:image/<format>;base64,` prefix is missing.
    #[error("data URI has no image format prefix")]
    FormatNotFound,

    /// The `base64,` marker is missing.
    #[error("data URI has no base64 marker")]
    PayloadNotFound,

    #[error("unsupported image format: {0}")]
    Unsupported(String),

    #[error("invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a valid {expected} image")]
    FormatMismatch { expected: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Taxonomy bucket used by the HTTP boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::FormatNotFound | CodecError::PayloadNotFound => {
                ErrorKind::MalformedRequest
            }
            CodecError::Unsupported(_)
            | CodecError::Base64(_)
            | CodecError::FormatMismatch { .. } => ErrorKind::Decode,
            CodecError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Failure raised by the document assembler. `index` names the content
/// item being laid out, if any.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct RenderError {
    pub index: Option<usize>,
    pub reason: String,
}

impl RenderError {
    pub fn item(index: usize, reason: impl fmt::Display) -> Self {
        Self {
            index: Some(index),
            reason: reason.to_string(),
        }
    }

    pub fn document(reason: impl fmt::Display) -> Self {
        Self {
            index: None,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRequest,
    Decode,
    Io,
    Render,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedRequest => "malformed request",
            ErrorKind::Decode => "decode error",
            ErrorKind::Io => "IO error",
            ErrorKind::Render => "render error",
        };
        f.write_str(name)
    }
}

/// Pipeline stage in which a request was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Scratch namespace setup, before any image is touched.
    Prepare,
    FormatDetection,
    Decode,
    Persist,
    Assembling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::FormatDetection => "format-detection",
            Stage::Decode => "decode",
            Stage::Persist => "persist",
            Stage::Assembling => "assembling",
        };
        f.write_str(name)
    }
}

/// Terminal failure of one request, tagged with where it happened.
#[derive(Debug)]
pub struct PipelineError {
    pub stage: Stage,
    pub index: Option<usize>,
    pub kind: ErrorKind,
    pub cause: String,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} during {}", self.kind, self.stage)?;
        if let Some(index) = self.index {
            write!(f, " (item {index})")?;
        }
        write!(f, ": {}", self.cause)
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    pub fn codec(stage: Stage, index: usize, err: CodecError) -> Self {
        Self {
            stage,
            index: Some(index),
            kind: err.kind(),
            cause: err.to_string(),
        }
    }

    pub fn render(err: RenderError) -> Self {
        Self {
            stage: Stage::Assembling,
            index: err.index,
            kind: ErrorKind::Render,
            cause: err.reason,
        }
    }

    pub fn io(stage: Stage, err: std::io::Error) -> Self {
        Self {
            stage,
            index: None,
            kind: ErrorKind::Io,
            cause: err.to_string(),
        }
    }

    pub fn malformed(index: Option<usize>, cause: impl Into<String>) -> Self {
        Self {
            stage: Stage::Prepare,
            index,
            kind: ErrorKind::MalformedRequest,
            cause: cause.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_message_names_stage_and_item() {
        let err = PipelineError::codec(
            Stage::FormatDetection,
            2,
            CodecError::Unsupported("gif".into()),
        );
        assert_eq!(
            err.to_string(),
            "decode error during format-detection (item 2): unsupported image format: gif"
        );
    }

    #[test]
    fn missing_markers_are_malformed_requests() {
        assert_eq!(CodecError::PayloadNotFound.kind(), ErrorKind::MalformedRequest);
        assert_eq!(CodecError::FormatNotFound.kind(), ErrorKind::MalformedRequest);
        assert_eq!(
            CodecError::Unsupported("bmp".into()).kind(),
            ErrorKind::Decode
        );
    }
}
