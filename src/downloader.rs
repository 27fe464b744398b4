//! GitHub release metadata queries and asset downloads.
//!
//! All calls are synchronous and blocking, with no built-in retry: a failed
//! call aborts the run and re-invoking the tool is the caller's retry.

use std::env;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::progress::download_bar;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_DOWNLOAD_BASE: &str = "https://github.com";

/// Streamed download copy size; keeps memory use independent of asset size.
const CHUNK_SIZE: usize = 8192;

#[derive(Deserialize)]
struct ReleaseResponse {
    tag_name: String,
}

/// Queries release metadata and downloads release assets.
pub struct Downloader {
    repo: String,
    api_base: String,
    download_base: String,
    show_progress: bool,
    client: Client,
}

impl Downloader {
    /// Build a downloader for `owner/repo`.
    ///
    /// When `GITHUB_TOKEN` is set in the environment it is attached as an
    /// `Authorization: token <value>` header on every request.
    pub fn new(repo: &str, show_progress: bool) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(token) = env::var("GITHUB_TOKEN") {
            debug!("loading GITHUB_TOKEN from env");
            let value = reqwest::header::HeaderValue::from_str(&format!("token {token}"))
                .map_err(|_| Error::Config("GITHUB_TOKEN is not a valid header value".into()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(concat!("gh-release-install/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            repo: repo.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_owned(),
            show_progress,
            client,
        })
    }

    /// Override the API base URL (tests).
    pub fn set_api_base(&mut self, base: &str) {
        self.api_base = base.trim_end_matches('/').to_owned();
    }

    /// Override the download base URL (tests).
    pub fn set_download_base(&mut self, base: &str) {
        self.download_base = base.trim_end_matches('/').to_owned();
    }

    /// Fetch the latest release tag from the API.
    pub fn latest_tag(&self) -> Result<String> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, self.repo);
        debug!("querying latest release from '{url}'");

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()?;
        let resp = check_status(resp, "latest release query")?;

        let release: ReleaseResponse = resp
            .json()
            .map_err(|e| Error::Transport(format!("invalid release response: {e}")))?;
        Ok(release.tag_name)
    }

    /// Download URL for a named asset of a release tag.
    fn asset_url(&self, tag: &str, asset: &str) -> String {
        format!(
            "{}/{}/releases/download/{}/{}",
            self.download_base, self.repo, tag, asset
        )
    }

    /// Stream the asset for `tag` into `dest`.
    pub fn download_asset(&self, tag: &str, asset: &str, dest: &Path) -> Result<()> {
        let url = self.asset_url(tag, asset);
        debug!("downloading asset from '{url}'");

        let resp = self.client.get(&url).send()?;
        let resp = check_status(resp, "asset download")?;

        let bar = download_bar(resp.content_length(), self.show_progress);
        let mut reader = bar.wrap_read(resp);
        let mut file = File::create(dest)?;

        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut chunk).map_err(map_read_err)?;
            if n == 0 {
                break;
            }
            file.write_all(&chunk[..n])?;
        }
        bar.finish_and_clear();

        debug!("saved asset to '{}'", dest.display());
        Ok(())
    }

    /// Fetch the checksum-listing asset named `asset` for `tag`.
    ///
    /// A 404 means the release publishes no such listing and yields `None`;
    /// any other non-2xx status is a transport error.
    pub fn fetch_checksum_listing(&self, tag: &str, asset: &str) -> Result<Option<String>> {
        let url = self.asset_url(tag, asset);
        debug!("fetching checksum listing from '{url}'");

        let resp = self.client.get(&url).send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp, "checksum listing fetch")?;

        Ok(Some(resp.text()?))
    }
}

fn check_status(resp: Response, context: &str) -> Result<Response> {
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Transport(format!("{context} returned {status}")));
    }
    Ok(resp)
}

fn map_read_err(err: io::Error) -> Error {
    Error::Transport(format!("download stream failed: {err}"))
}
