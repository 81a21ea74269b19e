use std::fs;
use std::io::Write;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::{Builder, NamedTempFile, TempDir};

use crate::error::KiraError;

pub fn read_input_file(path: &Path) -> Result<String, KiraError> {
    fs::read_to_string(path).map_err(|err| KiraError::InputRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Working directory Enrichr writes its result fragments into.
///
/// A caller-supplied directory is left in place; an ephemeral one is removed on drop.
#[derive(Debug)]
pub enum ScratchDir {
    Provided(Utf8PathBuf),
    Ephemeral { path: Utf8PathBuf, _guard: TempDir },
}

impl ScratchDir {
    pub fn provided(path: Utf8PathBuf) -> Result<Self, KiraError> {
        fs::create_dir_all(path.as_std_path()).map_err(|err| {
            KiraError::Filesystem(format!("create scratch dir {path}: {err}"))
        })?;
        Ok(Self::Provided(path))
    }

    pub fn ephemeral() -> Result<Self, KiraError> {
        let guard = Builder::new()
            .prefix("kira-g2t-")
            .tempdir()
            .map_err(|err| KiraError::Filesystem(format!("create temp dir: {err}")))?;
        let path = Utf8PathBuf::from_path_buf(guard.path().to_path_buf())
            .map_err(|_| KiraError::Filesystem("invalid temp dir path".to_string()))?;
        Ok(Self::Ephemeral {
            path,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        match self {
            ScratchDir::Provided(path) => path,
            ScratchDir::Ephemeral { path, .. } => path,
        }
    }
}

/// Writes `contents` next to its final location and renames it into place, so a
/// reader of `dir` never sees a half-written fragment.
pub fn write_atomic(dir: &Utf8Path, file_name: &str, contents: &[u8]) -> Result<(), KiraError> {
    let target = dir.join(file_name);
    let mut tmp = NamedTempFile::with_prefix_in(".partial-", dir.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("create temp file in {dir}: {err}")))?;
    tmp.write_all(contents)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    tmp.persist(target.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("persist {target}: {}", err.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_scratch_is_removed_on_drop() {
        let scratch = ScratchDir::ephemeral().unwrap();
        let path = scratch.path().to_owned();
        assert!(path.exists());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn write_atomic_leaves_only_target() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        write_atomic(dir, "a.txt", b"hello").unwrap();
        let names = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.txt".to_string()]);
        assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "hello");
    }
}
