//! Error and Result module
use std::io;

use derive_more::{Display, From};
use ntex::http::error::{BlockingError, PayloadError};
use ntex::http::StatusCode;
use ntex::web::error::{DefaultError, WebResponseError};

/// A set of errors that can occur while rewriting multipart requests
#[derive(Debug, Display, From)]
pub enum MultipartError {
    /// Multipart stream can not be decoded
    #[display("Can not decode multipart stream: {}", _0)]
    Decode(multer::Error),
    /// Payload error
    #[display("{}", _0)]
    Payload(PayloadError),
    /// Upload directory or file can not be written
    #[display("Can not store uploaded file: {}", _0)]
    Io(io::Error),
}

impl std::error::Error for MultipartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MultipartError::Decode(err) => Some(err),
            MultipartError::Io(err) => Some(err),
            MultipartError::Payload(_) => None,
        }
    }
}

impl From<BlockingError<io::Error>> for MultipartError {
    fn from(err: BlockingError<io::Error>) -> Self {
        match err {
            BlockingError::Error(err) => MultipartError::Io(err),
            BlockingError::Canceled => {
                MultipartError::Io(io::Error::new(io::ErrorKind::Interrupted, "Thread pool is gone"))
            }
        }
    }
}

/// Form value is not a `<path>; filename=<name>; mimeType=<type>` reference
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("Invalid file reference")]
pub struct FileReferenceError;

impl std::error::Error for FileReferenceError {}

/// Return `BadRequest` for `FileReferenceError`
impl WebResponseError<DefaultError> for FileReferenceError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// Return `BadRequest` for malformed input, `InternalServerError` for storage failures
impl WebResponseError<DefaultError> for MultipartError {
    fn status_code(&self) -> StatusCode {
        match self {
            MultipartError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
