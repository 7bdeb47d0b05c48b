//! Multipart decoding on top of `multer`.
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use futures::channel::mpsc;
use futures::{future, SinkExt, Stream};
use ntex::http::error::PayloadError;
use ntex::http::Payload;
use ntex::util::Bytes;
use ntex::web;

use crate::body::{FileReference, FormBody};
use crate::error::MultipartError;
use crate::limits::{Counters, Limits};
use crate::storage::{sanitize_filename, UploadDir};

/// Number of payload chunks buffered ahead of the decoder.
const PUMP_BUFFER: usize = 8;

type Chunk = Result<Vec<u8>, io::Error>;

/// Single decoded part
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Part {
    Field { name: String, value: String },
    File { name: String, file: FileReference },
}

/// Pull based part reader.
///
/// Files are written to the upload directory while they are read, so
/// `next_part` only returns once the file is on disk.
pub(crate) struct Decoder<'a> {
    multipart: multer::Multipart<'static>,
    dir: &'a UploadDir,
    limits: &'a Limits,
    counters: Counters,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new<S>(
        stream: S,
        content_type: &str,
        dir: &'a UploadDir,
        limits: &'a Limits,
    ) -> Result<Self, MultipartError>
    where
        S: Stream<Item = Chunk> + Send + 'static,
    {
        let boundary = multer::parse_boundary(content_type)?;
        Ok(Decoder {
            multipart: multer::Multipart::new(stream, boundary),
            dir,
            limits,
            counters: Counters::default(),
        })
    }

    /// Next admitted part, `None` once the closing boundary is read.
    pub(crate) async fn next_part(&mut self) -> Result<Option<Part>, MultipartError> {
        while let Some(mut field) = self.multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                log::debug!("Skipping multipart part without a name");
                continue;
            };

            let filename = field.file_name().map(str::to_owned);
            let path = match filename.as_deref() {
                Some(filename) => match self.dir.file_path(filename) {
                    Some(path) => Some(path),
                    None => {
                        log::debug!("Skipping file part {:?} with unusable filename {:?}", name, filename);
                        continue;
                    }
                },
                None => None,
            };

            if !self.counters.admit(self.limits, path.is_some()) {
                log::debug!("Dropping part {:?}, limit reached", name);
                continue;
            }

            let part = if let (Some(path), Some(filename)) = (path, filename) {
                let mime_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_owned())
                    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
                let size = store(&mut field, &path, self.limits.max_file_size()).await?;
                log::trace!("Stored file part {:?} at {:?}, {} bytes", name, path, size);

                let filename = sanitize_filename(&filename).unwrap_or_default().to_owned();
                Part::File { name, file: FileReference { path, filename, mime_type } }
            } else {
                let value = read_value(&mut field, self.limits.max_field_size()).await?;
                Part::Field { name, value }
            };
            return Ok(Some(part));
        }
        Ok(None)
    }
}

/// Write file content to `path`, truncating it at `limit` bytes.
///
/// Disk IO runs on the blocking thread pool, one chunk at a time.
async fn store(
    field: &mut multer::Field<'static>,
    path: &Path,
    limit: Option<u64>,
) -> Result<u64, MultipartError> {
    let target = path.to_path_buf();
    let mut file = web::block(move || File::create(target)).await?;
    let mut written = 0u64;

    while let Some(chunk) = field.chunk().await? {
        let len = match limit {
            Some(max) => max.saturating_sub(written).min(chunk.len() as u64) as usize,
            None => chunk.len(),
        };
        if len > 0 {
            let data = chunk.slice(..len);
            file = web::block(move || file.write_all(&data).map(|_| file)).await?;
            written += len as u64;
        }

        if len < chunk.len() {
            log::debug!("File {:?} truncated at {} bytes", path, written);
            break;
        }
    }
    Ok(written)
}

async fn read_value(
    field: &mut multer::Field<'static>,
    limit: usize,
) -> Result<String, MultipartError> {
    let mut buf = Vec::new();

    while let Some(chunk) = field.chunk().await? {
        let len = limit.saturating_sub(buf.len()).min(chunk.len());
        buf.extend_from_slice(&chunk[..len]);

        if len < chunk.len() {
            log::debug!("Field {:?} truncated at {} bytes", field.name(), buf.len());
            // do not leave half of a multi-byte character at the cut
            let cut = std::str::from_utf8(&buf)
                .err()
                .filter(|err| err.error_len().is_none())
                .map(|err| err.valid_up_to());
            if let Some(cut) = cut {
                buf.truncate(cut);
            }
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Feed payload chunks to the decoder.
///
/// Stops quietly once the decoder side is gone.
async fn pump(mut payload: Payload, mut tx: mpsc::Sender<Chunk>) -> Result<(), PayloadError> {
    while let Some(item) = payload.recv().await {
        match item {
            Ok(chunk) => {
                if tx.send(Ok(chunk.to_vec())).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, err.to_string()))).await;
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Decode multipart `payload` into a url-encoded body.
///
/// Files are stored in a new directory under `base`.
pub(crate) async fn decode(
    payload: Payload,
    content_type: &str,
    base: &Path,
    limits: &Limits,
) -> Result<Bytes, MultipartError> {
    let dir = UploadDir::create(base)?;
    let (tx, rx) = mpsc::channel(PUMP_BUFFER);
    let decoder = Decoder::new(rx, content_type, &dir, limits)?;

    // decoder is moved in, so the receiver is dropped as soon as decoding stops
    let parts = async move {
        let mut decoder = decoder;
        let mut body = FormBody::new();

        while let Some(part) = decoder.next_part().await? {
            match part {
                Part::Field { name, value } => body.append(&name, &value),
                Part::File { name, file } => body.append_file(&name, &file),
            }
        }
        Ok::<_, MultipartError>(body.finish())
    };

    let (pumped, decoded) = future::join(pump(payload, tx), parts).await;
    pumped?;
    let body = decoded?;

    log::debug!("Decoded multipart payload into {:?}, {} bytes body", dir.path(), body.len());
    Ok(body)
}
