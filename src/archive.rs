//! Local tarball extraction.
//!
//! Gunzip + untar pipeline shared by the remote fetcher (downloaded
//! archives) and the offline agent extraction (bundled archive). Callers
//! on the async side wrap these functions in `spawn_blocking`.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

/// Unpack a gzipped tarball into `dest` and return the path of the
/// archive's root directory.
///
/// Host-generated tarballs (`Repo-master/...`) contain a single root
/// folder; its name is reported back so the caller can rename it. Entry
/// paths are sanitized by `unpack_in`, so an archive can never write
/// outside `dest`.
pub(crate) fn unpack_tar_gz(reader: impl Read, dest: &Path) -> io::Result<PathBuf> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(false);
    #[cfg(any(unix, target_os = "redox"))]
    archive.set_unpack_xattrs(false);

    let mut root: Option<PathBuf> = None;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        let first = match path.components().next() {
            Some(Component::Normal(name)) => name.to_owned(),
            // Metadata entries (pax_global_header) and oddly shaped paths
            // are skipped, not unpacked.
            _ => continue,
        };
        if first == "pax_global_header" {
            continue;
        }
        if root.is_none() {
            root = Some(dest.join(&first));
        }

        entry.unpack_in(dest)?;
    }

    root.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "archive contains no entries"))
}

/// [`unpack_tar_gz`] reading from a file on disk.
pub(crate) fn unpack_tar_gz_file(archive: &Path, dest: &Path) -> io::Result<PathBuf> {
    let file = File::open(archive)?;
    unpack_tar_gz(file, dest)
}
