//! Archive unpacking with a pluggable format table.
//!
//! The orchestrator builds one [`Unpacker`] and hands it the downloaded
//! asset plus the member path it wants back. Formats are dispatched on the
//! filename suffix; `.bz2` alone is not an archive, so a custom handler
//! treats the whole decompressed stream as the single member, named by
//! stripping the compression suffix.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{Error, Result};

/// Unpacks an archive file into a directory.
pub type UnpackFn = fn(&Path, &Path) -> Result<()>;

/// A named archive format: filename suffixes plus the handler for them.
pub struct Format {
    pub name: &'static str,
    pub suffixes: &'static [&'static str],
    pub unpack: UnpackFn,
}

/// Suffix-dispatched unpack table.
pub struct Unpacker {
    formats: Vec<Format>,
}

impl Unpacker {
    /// Build the default table: tar family, zip, and the single-stream bz2
    /// handler.
    pub fn new() -> Self {
        let mut unpacker = Unpacker { formats: Vec::new() };
        unpacker.register(Format {
            name: "tar",
            suffixes: &[".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar"],
            unpack: unpack_tar,
        });
        unpacker.register(Format {
            name: "zip",
            suffixes: &[".zip"],
            unpack: unpack_zip,
        });
        unpacker.register(Format {
            name: "bz2",
            suffixes: &[".bz2"],
            unpack: unpack_bz2,
        });
        unpacker
    }

    /// Register a format unless one with the same name already exists.
    /// Returns whether the format was added.
    pub fn register(&mut self, format: Format) -> bool {
        if self.formats.iter().any(|f| f.name == format.name) {
            return false;
        }
        debug!("registering unpack format '{}'", format.name);
        self.formats.push(format);
        true
    }

    /// Unpack `archive` into `dest`, dispatching on the filename suffix.
    /// The longest matching suffix wins, so `.tar.bz2` is never mistaken
    /// for a bare `.bz2` stream.
    pub fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        let filename = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let format = self
            .formats
            .iter()
            .flat_map(|f| f.suffixes.iter().map(move |s| (f, *s)))
            .filter(|(_, suffix)| filename.ends_with(suffix))
            .max_by_key(|(_, suffix)| suffix.len())
            .map(|(format, _)| format)
            .ok_or_else(|| {
                Error::Extraction(format!("unsupported archive type '{filename}'"))
            })?;

        debug!("unpacking '{filename}' with format '{}'", format.name);
        (format.unpack)(archive, dest)
    }

    /// Unpack `archive` into `work` and return the path of `member`.
    pub fn extract_member(&self, archive: &Path, member: &str, work: &Path) -> Result<PathBuf> {
        self.unpack(archive, work)?;

        let path = work.join(member);
        if !path.is_file() {
            return Err(Error::Extraction(format!(
                "member '{member}' not found in archive '{}'",
                archive.display()
            )));
        }
        Ok(path)
    }
}

impl Default for Unpacker {
    fn default() -> Self {
        Self::new()
    }
}

fn unpack_tar(archive: &Path, dest: &Path) -> Result<()> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let file = File::open(archive)?;

    let reader: Box<dyn io::Read> = if filename.ends_with(".tar.gz") || filename.ends_with(".tgz")
    {
        Box::new(GzDecoder::new(file))
    } else if filename.ends_with(".tar.bz2") || filename.ends_with(".tbz2") {
        Box::new(BzDecoder::new(file))
    } else {
        Box::new(file)
    };

    tar::Archive::new(reader)
        .unpack(dest)
        .map_err(|e| Error::Extraction(format!("invalid tar archive: {e}")))
}

fn unpack_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| Error::Extraction(format!("invalid zip archive: {e}")))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::Extraction(format!("invalid zip entry: {e}")))?;
        let outpath = dest.join(entry.mangled_name());

        if entry.name().ends_with('/') {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&outpath)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }
    Ok(())
}

/// A bare `.bz2` file holds a single compressed stream, not an archive.
/// Its one member is the decompressed content, named without the suffix.
fn unpack_bz2(archive: &Path, dest: &Path) -> Result<()> {
    let stem = archive
        .file_stem()
        .ok_or_else(|| Error::Extraction("bz2 file has no stem".to_owned()))?;

    let mut decoder = BzDecoder::new(File::open(archive)?);
    let mut out = File::create(dest.join(stem))?;
    io::copy(&mut decoder, &mut out)?;
    Ok(())
}
