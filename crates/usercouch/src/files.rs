//! Private file writes for session files.

use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Replaces `path` with `contents`, readable only by the owner.
///
/// The payload is synced to a sibling temporary file which is then renamed
/// over the target, so a concurrent reader sees either the old or the new
/// file.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(".usercouch-");
    #[cfg(unix)]
    builder.permissions(std::fs::Permissions::from_mode(0o600));

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn replaces_existing_file() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("session.ini");
        fs::write(&target, b"old").expect("seed");
        write_private(&target, b"[httpd]\n").expect("write");
        assert_eq!(fs::read(&target).expect("read"), b"[httpd]\n");
        let leftovers = fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(leftovers, 1, "temporary file should be renamed away");
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("session.ini");
        write_private(&target, b"secret").expect("write");
        let mode = fs::metadata(&target).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn path_without_parent_is_rejected() {
        let error = write_private(Path::new("/"), b"x").expect_err("root has no parent");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }
}
