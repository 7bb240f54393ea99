use thiserror::Error;

/// Status codes reported across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    Fail = -1,
    Memory = 1,
    BadFormat = 2,
}

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error(
        "invalid dimensions {width}x{height}: width and height must be even and at most 720x576"
    )]
    InvalidDimensions { width: u32, height: u32 },

    #[error("failed to allocate {bytes} bytes of frame storage")]
    OutOfMemory { bytes: usize },

    #[error("frame dimension mismatch: expected {expected_w}x{expected_h}, got {got_w}x{got_h}")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        got_w: u32,
        got_h: u32,
    },

    #[error("input frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("coded frame needs {needed} bytes but the output holds {capacity}")]
    OutputTooSmall { needed: usize, capacity: usize },
}

impl EncoderError {
    pub fn status(&self) -> Status {
        match self {
            EncoderError::InvalidDimensions { .. } => Status::BadFormat,
            EncoderError::OutOfMemory { .. } => Status::Memory,
            EncoderError::DimensionMismatch { .. }
            | EncoderError::FrameTooShort { .. }
            | EncoderError::OutputTooSmall { .. } => Status::Fail,
        }
    }
}

#[derive(Debug, Error)]
pub enum Y4mError {
    #[error("failed to read y4m input: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing YUV4MPEG2 signature")]
    BadSignature,

    #[error("y4m header has no line terminator")]
    UnterminatedHeader,

    #[error("y4m header is missing {0}")]
    MissingField(&'static str),

    #[error("invalid y4m header field {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("unsupported y4m colorspace {0}, only 4:2:0 is accepted")]
    UnsupportedColorspace(String),

    #[error("truncated y4m frame {index}")]
    TruncatedFrame { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_errors_are_bad_format() {
        let err = EncoderError::InvalidDimensions {
            width: 721,
            height: 576,
        };
        assert_eq!(err.status(), Status::BadFormat);
        assert_eq!(err.status() as i32, 2);
    }

    #[test]
    fn allocation_errors_are_memory() {
        let err = EncoderError::OutOfMemory { bytes: 1 << 20 };
        assert_eq!(err.status() as i32, 1);
    }

    #[test]
    fn frame_errors_are_generic_failures() {
        let err = EncoderError::FrameTooShort {
            expected: 10,
            actual: 3,
        };
        assert_eq!(err.status() as i32, -1);
        assert!(err.to_string().contains("expected 10 bytes"));

        let err = EncoderError::OutputTooSmall {
            needed: 92,
            capacity: 4,
        };
        assert_eq!(err.status(), Status::Fail);
    }
}
