use clap::Parser;

use gh_release_install::ChecksumSpec;

/// Install GitHub release file on your system.
#[derive(Debug, Parser)]
// --version selects the release to install, so clap's own version flag
// must not claim the same argument id.
#[command(name = "gh-release-install", disable_version_flag = true, after_help = EXAMPLES)]
pub struct Cli {
    /// GitHub REPOSITORY org/repo to get the release from.
    #[arg(value_name = "REPOSITORY")]
    pub repository: String,

    /// Release ASSET filename. May contain variables such as '{version}'
    /// or '{tag}'.
    #[arg(value_name = "ASSET")]
    pub asset: String,

    /// Path to save the downloaded file. If DESTINATION is a directory, the
    /// asset name will be used as filename in that directory. May contain
    /// variables such as '{version}' or '{tag}'.
    #[arg(value_name = "DESTINATION")]
    pub destination: String,

    /// Extract <filename> from the release asset archive and install the
    /// extracted file instead. May contain variables such as '{version}'
    /// or '{tag}'.
    #[arg(long, value_name = "<filename>")]
    pub extract: Option<String>,

    /// Desired release version to install. When using 'latest' the
    /// installer will guess the latest version from the GitHub API.
    #[arg(long, default_value = gh_release_install::LATEST, value_name = "<version>")]
    pub version: String,

    /// Track the version installed on the system using a file. May contain
    /// variables such as '{destination}'.
    #[arg(long, value_name = "<filename>")]
    pub version_file: Option<String>,

    /// Asset checksum used to verify the downloaded ASSET. <hash> can be
    /// one of md5, sha1, sha224, sha256, sha384, sha512. <digest|asset> can
    /// either be the expected checksum, or the filename of a checksum file
    /// in the release assets.
    #[arg(long, value_name = "<hash>:<digest|asset>")]
    pub checksum: Option<ChecksumSpec>,

    /// Increase the verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

const EXAMPLES: &str = "\
template variables:
    {tag}               Release tag name.
    {version}           Release tag name without leading 'v'.
    {destination}       DESTINATION path, including the asset filename if
                        path is a directory.

examples:
    gh-release-install 'mvdan/sh' \\
        'shfmt_{tag}_linux_amd64' \\
        '/usr/local/bin/shfmt' \\
        --version 'v3.3.1'

    gh-release-install 'prometheus/prometheus' \\
        'prometheus-{version}.linux-amd64.tar.gz' \\
        --extract 'prometheus-{version}.linux-amd64/prometheus' \\
        '/usr/local/bin/prometheus' \\
        --version-file '{destination}.version' \\
        --checksum 'sha256:sha256sums.txt'
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::parse_from([
            "gh-release-install",
            "mvdan/sh",
            "shfmt_{tag}_linux_amd64",
            "/usr/local/bin/shfmt",
        ]);
        assert_eq!(cli.repository, "mvdan/sh");
        assert_eq!(cli.version, "latest");
        assert!(cli.checksum.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parses_full_invocation() {
        let cli = Cli::parse_from([
            "gh-release-install",
            "prometheus/prometheus",
            "prometheus-{version}.linux-amd64.tar.gz",
            "/usr/local/bin/prometheus",
            "--extract",
            "prometheus-{version}.linux-amd64/prometheus",
            "--version",
            "v2.28.1",
            "--version-file",
            "{destination}.version",
            "--checksum",
            "sha256:sha256sums.txt",
            "-vv",
        ]);
        assert_eq!(cli.version, "v2.28.1");
        assert_eq!(cli.verbose, 2);
        let checksum = cli.checksum.unwrap();
        assert_eq!(checksum.reference, "sha256sums.txt");
    }

    #[test]
    fn rejects_invalid_checksum_option() {
        let result = Cli::try_parse_from([
            "gh-release-install",
            "owner/repo",
            "asset",
            "dest",
            "--checksum",
            "whirlpool:digest",
        ]);
        assert!(result.is_err());
    }
}
