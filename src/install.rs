//! The install transaction.
//!
//! Sequences version resolution, download, verification, extraction and
//! placement, with a scoped temporary workspace that is removed on every
//! exit path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checksum::{compute_file_checksum, find_checksum_in_file, ChecksumSpec};
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::template::render;
use crate::unpack::Unpacker;

/// Sentinel version that resolves to the repository's latest release.
pub const LATEST: &str = "latest";

/// A release identified by its published tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag: String,
}

impl Release {
    pub fn new(tag: impl Into<String>) -> Self {
        Release { tag: tag.into() }
    }

    /// The tag with a single leading `v` stripped, so `v1.2.1` and `1.2.1`
    /// compare equal.
    pub fn version(&self) -> &str {
        self.tag.strip_prefix('v').unwrap_or(&self.tag)
    }
}

/// How a run finished. Both variants are success; `AlreadyCurrent` means no
/// download or filesystem write happened at all.
#[derive(Debug)]
pub enum Outcome {
    Installed(Release),
    AlreadyCurrent(Release),
}

/// Installs a release asset on the local system.
///
/// # Example
/// ```rust,no_run
/// use gh_release_install::Installer;
///
/// fn main() -> Result<(), gh_release_install::Error> {
///     let outcome = Installer::new("mvdan/sh", "shfmt_{tag}_linux_amd64", "/usr/local/bin/shfmt")
///         .version("v3.3.1")
///         .run()?;
///     println!("{outcome:?}");
///     Ok(())
/// }
/// ```
pub struct Installer {
    repository: String,
    asset: String,
    destination: String,
    version: String,
    extract: Option<String>,
    version_file: Option<String>,
    checksum: Option<ChecksumSpec>,
    show_progress: bool,
    api_base: Option<String>,
    download_base: Option<String>,
}

impl Installer {
    /// Create an installer for `repository` (`owner/repo`), downloading the
    /// asset named by the `asset` pattern to the `destination` pattern.
    /// Patterns may contain `{tag}` and `{version}` placeholders.
    pub fn new(repository: &str, asset: &str, destination: &str) -> Self {
        Self {
            repository: repository.to_owned(),
            asset: asset.to_owned(),
            destination: destination.to_owned(),
            version: LATEST.to_owned(),
            extract: None,
            version_file: None,
            checksum: None,
            show_progress: true,
            api_base: None,
            download_base: None,
        }
    }

    /// Pin a release tag instead of resolving the latest release (builder).
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_owned();
        self
    }

    /// Extract this member from the downloaded archive and install it
    /// instead of the asset itself (builder).
    pub fn extract(mut self, member: &str) -> Self {
        self.extract = Some(member.to_owned());
        self
    }

    /// Track the installed version in a marker file (builder). The pattern
    /// may additionally reference `{destination}`.
    pub fn version_file(mut self, pattern: &str) -> Self {
        self.version_file = Some(pattern.to_owned());
        self
    }

    /// Verify the downloaded asset against a checksum (builder).
    pub fn checksum(mut self, spec: ChecksumSpec) -> Self {
        self.checksum = Some(spec);
        self
    }

    /// Disable the download progress bar (builder).
    pub fn no_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Override the GitHub API base URL (builder, for tests).
    pub fn api_base(mut self, base: &str) -> Self {
        self.api_base = Some(base.to_owned());
        self
    }

    /// Override the release download base URL (builder, for tests).
    pub fn download_base(mut self, base: &str) -> Self {
        self.download_base = Some(base.to_owned());
        self
    }

    /// Run the install transaction.
    pub fn run(&self) -> Result<Outcome> {
        let downloader = self.build_downloader()?;
        let unpacker = Unpacker::new();

        // Resolve the target release, then render every pattern against it.
        // Destination comes before the version file, whose pattern may
        // reference {destination}.
        let target = self.resolve_target(&downloader)?;
        debug!("target version is '{}'", target.version());

        let vars = [("tag", target.tag.as_str()), ("version", target.version())];
        let asset = render(&self.asset, &vars)?;
        let destination = self.resolve_destination(&vars, &asset)?;
        let extract = match &self.extract {
            Some(pattern) => Some(render(pattern, &vars)?),
            None => None,
        };
        let version_file = self.resolve_version_file(&vars, &destination)?;

        if let Some(local) = resolve_local(version_file.as_deref())? {
            debug!("local version is '{}'", local.version());
            if local.version() == target.version() {
                info!("target version is already installed");
                return Ok(Outcome::AlreadyCurrent(target));
            }
        }

        // Scoped workspace, removed on drop on every exit path below.
        let workspace = tempfile::Builder::new()
            .prefix("gh-release-install")
            .tempdir()?;

        let asset_file = workspace.path().join(&asset);
        downloader.download_asset(&target.tag, &asset, &asset_file)?;

        if let Some(spec) = &self.checksum {
            self.verify_checksum(spec, &downloader, &target, &asset, &asset_file)?;
            info!("checksum verification succeeded");
        }

        let final_file = match &extract {
            Some(member) => {
                let extracted = unpacker.extract_member(&asset_file, member, workspace.path())?;
                info!("extracted archive member '{member}'");
                extracted
            }
            None => asset_file,
        };

        place(&final_file, &destination)?;
        info!("installed file to '{}'", destination.display());

        if let Some(path) = &version_file {
            // Only after placement, so a failed install never records a
            // version. The raw tag is written, not the stripped version.
            fs::write(path, &target.tag)?;
            info!("saved version file to '{}'", path.display());
        }

        Ok(Outcome::Installed(target))
    }

    fn build_downloader(&self) -> Result<Downloader> {
        let mut downloader = Downloader::new(&self.repository, self.show_progress)?;
        if let Some(base) = &self.api_base {
            downloader.set_api_base(base);
        }
        if let Some(base) = &self.download_base {
            downloader.set_download_base(base);
        }
        Ok(downloader)
    }

    fn resolve_target(&self, downloader: &Downloader) -> Result<Release> {
        if self.version == LATEST {
            Ok(Release::new(downloader.latest_tag()?))
        } else {
            Ok(Release::new(self.version.clone()))
        }
    }

    /// Render the destination pattern; an existing directory gets the asset
    /// name appended so the result is always a concrete file path.
    fn resolve_destination(&self, vars: &[(&str, &str)], asset: &str) -> Result<PathBuf> {
        let destination = PathBuf::from(render(&self.destination, vars)?);
        if destination.is_dir() {
            return Ok(destination.join(asset));
        }
        Ok(destination)
    }

    fn resolve_version_file(
        &self,
        vars: &[(&str, &str)],
        destination: &Path,
    ) -> Result<Option<PathBuf>> {
        let Some(pattern) = &self.version_file else {
            return Ok(None);
        };

        let destination = destination.to_string_lossy();
        let mut vars = vars.to_vec();
        vars.push(("destination", destination.as_ref()));
        Ok(Some(PathBuf::from(render(pattern, &vars)?)))
    }

    /// Verify the downloaded asset, against the literal digest when the
    /// reference looks like one, otherwise against a checksum-listing asset
    /// fetched from the same release.
    fn verify_checksum(
        &self,
        spec: &ChecksumSpec,
        downloader: &Downloader,
        target: &Release,
        asset: &str,
        asset_file: &Path,
    ) -> Result<()> {
        let local = compute_file_checksum(spec.algorithm, asset_file)?;

        let expected = if spec.is_literal_digest() {
            spec.reference.clone()
        } else {
            let listing = downloader
                .fetch_checksum_listing(&target.tag, &spec.reference)?
                .ok_or_else(|| {
                    Error::Verification(format!(
                        "checksum listing '{}' not found in release",
                        spec.reference
                    ))
                })?;
            find_checksum_in_file(&listing, asset).ok_or_else(|| {
                Error::Verification(format!(
                    "no digest for '{asset}' in listing '{}'",
                    spec.reference
                ))
            })?
        };

        if !local.eq_ignore_ascii_case(&expected) {
            return Err(Error::Verification(format!(
                "{} digest mismatch: computed {local}, expected {expected}",
                spec.algorithm
            )));
        }
        Ok(())
    }
}

/// Read the local release tag from the version marker, if one is configured
/// and present. A missing marker means "never installed", not an error.
fn resolve_local(version_file: Option<&Path>) -> Result<Option<Release>> {
    let Some(path) = version_file else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let tag = fs::read_to_string(path)?;
    Ok(Some(Release::new(tag.trim_end())))
}

/// Move the final file to its destination and mark it executable.
fn place(file: &Path, destination: &Path) -> Result<()> {
    // The workspace usually lives on another filesystem, where a plain
    // rename fails with EXDEV.
    if fs::rename(file, destination).is_err() {
        fs::copy(file, destination)?;
        fs::remove_file(file)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(destination, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_strips_a_single_leading_v() {
        assert_eq!(Release::new("v1.2.1").version(), "1.2.1");
        assert_eq!(Release::new("1.2.1").version(), "1.2.1");
        assert_eq!(Release::new("vv1").version(), "v1");
    }

    #[test]
    fn local_release_absent_without_marker() {
        assert!(resolve_local(None).unwrap().is_none());
        assert!(resolve_local(Some(Path::new("/nonexistent/marker")))
            .unwrap()
            .is_none());
    }

    #[test]
    fn local_release_read_from_marker() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("shfmt.version");
        fs::write(&marker, "v2.28.1\n").unwrap();

        let local = resolve_local(Some(&marker)).unwrap().unwrap();
        assert_eq!(local.tag, "v2.28.1");
        assert_eq!(local.version(), "2.28.1");
    }

    #[test]
    fn directory_destination_appends_asset_name() {
        let dir = tempfile::tempdir().unwrap();
        let installer = Installer::new("owner/repo", "tool_{tag}", dir.path().to_str().unwrap());

        let vars = [("tag", "v1.0.0"), ("version", "1.0.0")];
        let destination = installer.resolve_destination(&vars, "tool_v1.0.0").unwrap();
        assert_eq!(destination, dir.path().join("tool_v1.0.0"));
    }

    #[test]
    fn version_file_sees_resolved_destination() {
        let installer = Installer::new("owner/repo", "tool", "/usr/local/bin/tool")
            .version_file("{destination}.version");

        let vars = [("tag", "v1.0.0"), ("version", "1.0.0")];
        let path = installer
            .resolve_version_file(&vars, Path::new("/usr/local/bin/tool"))
            .unwrap()
            .unwrap();
        assert_eq!(path, PathBuf::from("/usr/local/bin/tool.version"));
    }

    #[test]
    fn placed_file_is_executable() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("staged");
        let destination = dir.path().join("installed");
        fs::write(&source, b"#!/bin/sh\n").unwrap();

        place(&source, &destination).unwrap();

        assert!(!source.exists());
        assert!(destination.is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&destination).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }
}
