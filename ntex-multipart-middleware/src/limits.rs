//! Decoder limits.
use serde::Deserialize;

/// Default cap on a single field value, in bytes.
pub const DEFAULT_FIELD_SIZE: usize = 1024 * 1024;

/// Limits applied while decoding a multipart stream.
///
/// Count limits silently drop the parts past the cap. Size limits truncate
/// the part at the cap and drain the rest of it from the stream.
///
/// Limits can be loaded from configuration, keys use camel case:
///
/// ```rust
/// use ntex_multipart_middleware::Limits;
///
/// let limits: Limits = serde_json::from_str(r#"{"files": 1, "fileSize": 1048576}"#).unwrap();
/// assert_eq!(limits.max_files(), Some(1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Limits {
    files: Option<usize>,
    fields: Option<usize>,
    parts: Option<usize>,
    file_size: Option<u64>,
    field_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { files: None, fields: None, parts: None, file_size: None, field_size: DEFAULT_FIELD_SIZE }
    }
}

impl Limits {
    /// Maximum number of file parts.
    pub fn files(mut self, max: usize) -> Self {
        self.files = Some(max);
        self
    }

    /// Maximum number of non-file parts.
    pub fn fields(mut self, max: usize) -> Self {
        self.fields = Some(max);
        self
    }

    /// Maximum number of parts of any kind.
    pub fn parts(mut self, max: usize) -> Self {
        self.parts = Some(max);
        self
    }

    /// Maximum number of bytes stored for one file.
    pub fn file_size(mut self, max: u64) -> Self {
        self.file_size = Some(max);
        self
    }

    /// Maximum number of bytes kept for one field value.
    ///
    /// By default it is set to 1Mb.
    pub fn field_size(mut self, max: usize) -> Self {
        self.field_size = max;
        self
    }

    /// Maximum number of file parts, `None` if unlimited.
    pub fn max_files(&self) -> Option<usize> {
        self.files
    }

    /// Maximum number of non-file parts, `None` if unlimited.
    pub fn max_fields(&self) -> Option<usize> {
        self.fields
    }

    /// Maximum number of parts of either kind, `None` if unlimited.
    pub fn max_parts(&self) -> Option<usize> {
        self.parts
    }

    /// Maximum number of bytes stored per file, `None` if unlimited.
    pub fn max_file_size(&self) -> Option<u64> {
        self.file_size
    }

    /// Maximum number of bytes kept for one field value.
    pub fn max_field_size(&self) -> usize {
        self.field_size
    }
}

/// Running part counters checked against [`Limits`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
    files: usize,
    fields: usize,
    parts: usize,
}

impl Counters {
    /// Account for a new part, returns `false` if the part must be dropped.
    pub(crate) fn admit(&mut self, limits: &Limits, is_file: bool) -> bool {
        if exceeded(self.parts, limits.parts) {
            return false;
        }
        let admitted = if is_file {
            !exceeded(self.files, limits.files)
        } else {
            !exceeded(self.fields, limits.fields)
        };
        if admitted {
            self.parts += 1;
            if is_file {
                self.files += 1;
            } else {
                self.fields += 1;
            }
        }
        admitted
    }
}

fn exceeded(count: usize, max: Option<usize>) -> bool {
    max.map_or(false, |max| count >= max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = Limits::default();
        assert_eq!(limits.max_files(), None);
        assert_eq!(limits.max_fields(), None);
        assert_eq!(limits.max_parts(), None);
        assert_eq!(limits.max_file_size(), None);
        assert_eq!(limits.max_field_size(), DEFAULT_FIELD_SIZE);
    }

    #[test]
    fn from_config() {
        let limits: Limits = serde_json::from_str(
            r#"{"files": 1, "fields": 2, "parts": 3, "fileSize": 10, "fieldSize": 20}"#,
        )
        .unwrap();
        assert_eq!(
            limits,
            Limits::default().files(1).fields(2).parts(3).file_size(10).field_size(20)
        );

        let limits: Limits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits, Limits::default());
    }

    #[test]
    fn counters_drop_files_past_cap() {
        let limits = Limits::default().files(1);
        let mut counters = Counters::default();

        assert!(counters.admit(&limits, true));
        assert!(!counters.admit(&limits, true));
        assert!(counters.admit(&limits, false));
        assert!(!counters.admit(&limits, true));
        assert!(counters.admit(&limits, false));
    }

    #[test]
    fn counters_drop_parts_past_cap() {
        let limits = Limits::default().parts(2).fields(5);
        let mut counters = Counters::default();

        assert!(counters.admit(&limits, false));
        assert!(counters.admit(&limits, true));
        assert!(!counters.admit(&limits, false));
        assert!(!counters.admit(&limits, true));
    }

    #[test]
    fn zero_limit_drops_everything() {
        let limits = Limits::default().fields(0);
        let mut counters = Counters::default();

        assert!(!counters.admit(&limits, false));
        assert!(counters.admit(&limits, true));
    }
}
