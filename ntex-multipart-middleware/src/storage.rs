//! Per-request upload directories.
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Name of the folder created under the platform temp directory.
pub const DEFAULT_FOLDER: &str = "multipart";

/// Default base directory, `<platform temp dir>/multipart`.
pub fn default_base() -> PathBuf {
    env::temp_dir().join(DEFAULT_FOLDER)
}

/// Directory holding the files of a single request.
///
/// The directory is never removed, its lifetime belongs to the caller.
#[derive(Debug)]
pub(crate) struct UploadDir {
    path: PathBuf,
}

impl UploadDir {
    /// Create a randomly named directory under `base`.
    pub(crate) fn create(base: &Path) -> io::Result<UploadDir> {
        let base = if base.is_relative() { env::current_dir()?.join(base) } else { base.to_owned() };
        let path = base.join(random_name());
        fs::create_dir_all(&path)?;
        log::trace!("Created upload directory {:?}", path);
        Ok(UploadDir { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Destination of an uploaded file, `None` if the name has no usable file name.
    pub(crate) fn file_path(&self, filename: &str) -> Option<PathBuf> {
        sanitize_filename(filename).map(|name| self.path.join(name))
    }
}

/// 128 random bits as 32 lowercase hex characters.
pub(crate) fn random_name() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Strip any client supplied path, keeping only the last component.
pub(crate) fn sanitize_filename(filename: &str) -> Option<&str> {
    let name = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_names() {
        let names: HashSet<String> = (0..1000).map(|_| random_name()).collect();
        assert_eq!(names.len(), 1000);
        for name in names {
            assert_eq!(name.len(), 32);
            assert!(name.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    #[test]
    fn filenames() {
        assert_eq!(sanitize_filename("red.png"), Some("red.png"));
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\blue.png"), Some("blue.png"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn create_dir() {
        let base = tempfile::tempdir().unwrap();
        let dir = UploadDir::create(&base.path().join("nested")).unwrap();

        assert!(dir.path().is_dir());
        assert!(dir.path().starts_with(base.path().join("nested")));
        assert_eq!(dir.file_path("a/b.txt").unwrap(), dir.path().join("b.txt"));
        assert_eq!(dir.file_path("a/"), None);
    }

    #[test]
    fn create_dir_fails_on_file() {
        let base = tempfile::tempdir().unwrap();
        let blocker = base.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();

        assert!(UploadDir::create(&blocker).is_err());
    }
}
