use indicatif::{ProgressBar, ProgressStyle};

/// Build the download progress bar.
///
/// Hidden entirely when progress output is disabled (`--quiet`), a spinner
/// when the response carries no content length.
pub fn download_bar(total: Option<u64>, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    match total {
        Some(len) => ProgressBar::new(len).with_style(
            ProgressStyle::with_template(
                "downloading {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        ),
        None => ProgressBar::new_spinner().with_message("downloading"),
    }
}
