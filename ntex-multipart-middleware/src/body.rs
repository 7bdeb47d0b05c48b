//! Url-encoded replacement body.
use std::path::PathBuf;
use std::{fmt, str::FromStr};

use ntex::http::{error::PayloadError, Payload};
use ntex::util::{Bytes, BytesMut};

use crate::error::FileReferenceError;

/// Builder of an `application/x-www-form-urlencoded` body.
///
/// Every pair is terminated with `&`.
#[derive(Debug, Default)]
pub(crate) struct FormBody {
    buf: BytesMut,
}

impl FormBody {
    pub(crate) fn new() -> Self {
        FormBody::default()
    }

    pub(crate) fn append(&mut self, name: &str, value: &str) {
        self.buf.extend_from_slice(urlencoding::encode(name).as_bytes());
        self.buf.extend_from_slice(b"=");
        self.buf.extend_from_slice(urlencoding::encode(value).as_bytes());
        self.buf.extend_from_slice(b"&");
    }

    pub(crate) fn append_file(&mut self, name: &str, file: &FileReference) {
        self.append(name, &file.to_string());
    }

    pub(crate) fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Form value that stands for a stored upload.
///
/// Formatted as `<path>; filename=<name>; mimeType=<type>`. Handlers behind
/// the middleware can parse the value back:
///
/// ```rust
/// use ntex_multipart_middleware::FileReference;
///
/// let file: FileReference =
///     "/tmp/multipart/ab/red.png; filename=red.png; mimeType=image/png".parse().unwrap();
/// assert_eq!(file.filename, "red.png");
/// assert_eq!(file.mime_type, "image/png");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReference {
    /// Location of the stored file
    pub path: PathBuf,
    /// File name sent by the client
    pub filename: String,
    /// Content type of the part, `type/subtype`
    pub mime_type: String,
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; filename={}; mimeType={}", self.path.display(), self.filename, self.mime_type)
    }
}

impl FromStr for FileReference {
    type Err = FileReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, mime_type) = s.rsplit_once("; mimeType=").ok_or(FileReferenceError)?;
        let (path, filename) = rest.rsplit_once("; filename=").ok_or(FileReferenceError)?;
        if path.is_empty() {
            return Err(FileReferenceError);
        }
        Ok(FileReference {
            path: PathBuf::from(path),
            filename: filename.to_owned(),
            mime_type: mime_type.to_owned(),
        })
    }
}

/// Payload that yields `body` in one chunk.
pub(crate) fn payload(body: Bytes) -> Payload {
    Payload::Stream(Box::pin(futures::stream::once(async move { Ok::<_, PayloadError>(body) })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> FileReference {
        FileReference {
            path: PathBuf::from("/tmp/multipart/0123/red.png"),
            filename: "red.png".to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    #[test]
    fn encodes_pairs() {
        let mut body = FormBody::new();
        body.append("name", "John Doe");
        body.append("a&b", "x=y");
        assert_eq!(body.finish(), Bytes::from_static(b"name=John%20Doe&a%26b=x%3Dy&"));
    }

    #[test]
    fn empty_body() {
        assert!(FormBody::new().finish().is_empty());
    }

    #[test]
    fn encodes_file_reference() {
        assert_eq!(
            red().to_string(),
            "/tmp/multipart/0123/red.png; filename=red.png; mimeType=image/png"
        );

        let mut body = FormBody::new();
        body.append_file("red", &red());
        assert_eq!(
            body.finish(),
            Bytes::from_static(
                b"red=%2Ftmp%2Fmultipart%2F0123%2Fred.png%3B%20filename%3Dred.png%3B%20mimeType%3Dimage%2Fpng&"
            )
        );
    }

    #[test]
    fn parses_file_reference() {
        let parsed: FileReference = red().to_string().parse().unwrap();
        assert_eq!(parsed, red());

        assert!("/tmp/red.png".parse::<FileReference>().is_err());
        assert!("/tmp/red.png; mimeType=image/png".parse::<FileReference>().is_err());
        assert!("; filename=red.png; mimeType=image/png".parse::<FileReference>().is_err());
    }

    #[ntex::test]
    async fn payload_yields_body() {
        let mut pl = payload(Bytes::from_static(b"a=b&"));
        assert_eq!(pl.recv().await.unwrap().unwrap(), Bytes::from_static(b"a=b&"));
        assert!(pl.recv().await.is_none());
    }
}
