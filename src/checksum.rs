//! Asset integrity checking.
//!
//! A checksum option is `<algorithm>:<reference>` where the reference is
//! either a literal hex digest, or the filename of a checksum-listing asset
//! published in the same release (e.g. `SHA256SUMS`).

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use regex::Regex;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use tracing::debug;

use crate::error::{Error, Result};

/// Fixed read size so digest computation is O(1) in asset size.
const BLOCK_SIZE: usize = 8192;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    /// Length of the canonical hex digest for this algorithm.
    pub fn hex_len(self) -> usize {
        match self {
            Algorithm::Md5 => 32,
            Algorithm::Sha1 => 40,
            Algorithm::Sha224 => 56,
            Algorithm::Sha256 => 64,
            Algorithm::Sha384 => 96,
            Algorithm::Sha512 => 128,
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "md5" => Ok(Algorithm::Md5),
            "sha1" => Ok(Algorithm::Sha1),
            "sha224" => Ok(Algorithm::Sha224),
            "sha256" => Ok(Algorithm::Sha256),
            "sha384" => Ok(Algorithm::Sha384),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(Error::Config(format!(
                "invalid checksum algorithm '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha224 => "sha224",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

/// Parsed `--checksum` option.
#[derive(Debug, Clone)]
pub struct ChecksumSpec {
    pub algorithm: Algorithm,
    /// Literal hex digest, or the filename of a checksum-listing asset.
    pub reference: String,
}

impl ChecksumSpec {
    /// True when the reference is a literal digest rather than a listing
    /// filename: exactly the canonical hex length, hex characters only.
    pub fn is_literal_digest(&self) -> bool {
        is_hexdigest(self.algorithm, &self.reference)
    }
}

impl FromStr for ChecksumSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, reference) = s
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("invalid checksum option '{s}'")))?;

        Ok(ChecksumSpec {
            algorithm: algorithm.parse()?,
            reference: reference.to_owned(),
        })
    }
}

/// True iff `value` has the algorithm's canonical hex-digest length and
/// consists only of hex digits.
pub fn is_hexdigest(algorithm: Algorithm, value: &str) -> bool {
    value.len() == algorithm.hex_len() && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Look up the digest for `filename` in a checksum listing.
///
/// The listing is one `<hexdigest> <filename>` entry per line; the filename
/// must match exactly, so overlapping suffixes on other lines never match.
/// First matching line wins.
pub fn find_checksum_in_file(content: &str, filename: &str) -> Option<String> {
    // Unwrap is fine, the pattern is built from an escaped literal.
    let line_re = Regex::new(&format!(
        r"^([0-9a-fA-F]+)\s+{}$",
        regex::escape(filename)
    ))
    .unwrap();

    content
        .lines()
        .find_map(|line| line_re.captures(line))
        .map(|caps| caps[1].to_owned())
}

/// Compute the hex digest of a file, streaming in fixed-size blocks.
pub fn compute_file_checksum(algorithm: Algorithm, path: &Path) -> Result<String> {
    let digest = match algorithm {
        Algorithm::Md5 => hash_file::<Md5>(path)?,
        Algorithm::Sha1 => hash_file::<Sha1>(path)?,
        Algorithm::Sha224 => hash_file::<Sha224>(path)?,
        Algorithm::Sha256 => hash_file::<Sha256>(path)?,
        Algorithm::Sha384 => hash_file::<Sha384>(path)?,
        Algorithm::Sha512 => hash_file::<Sha512>(path)?,
    };

    debug!("computed {algorithm} digest '{digest}'");
    Ok(digest)
}

fn hash_file<D: Digest>(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        let n = file.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Hello World\n").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn parse_checksum_spec() {
        let spec: ChecksumSpec = "sha256:SHA256SUMS".parse().unwrap();
        assert_eq!(spec.algorithm, Algorithm::Sha256);
        assert_eq!(spec.reference, "SHA256SUMS");
        assert!(!spec.is_literal_digest());

        // Only the first ':' splits, the reference may contain more.
        let spec: ChecksumSpec = "sha256:https://example.org/SHA256SUMS".parse().unwrap();
        assert_eq!(spec.reference, "https://example.org/SHA256SUMS");
    }

    #[test]
    fn parse_checksum_spec_rejects_bad_input() {
        assert!(matches!(
            "sha256".parse::<ChecksumSpec>(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            "crc32:0011223344".parse::<ChecksumSpec>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn hexdigest_detection() {
        let digest = "484aedc04288b02f69eee1c20e98c588125fa960b43e5e129d5d36b93bb62072";
        assert!(is_hexdigest(Algorithm::Sha256, digest));
        // One character short of the canonical length.
        assert!(!is_hexdigest(Algorithm::Sha256, &digest[1..]));
        // Right length, not hex.
        assert!(!is_hexdigest(Algorithm::Md5, "not-a-digest-but-32-chars-long!!"));
        assert!(!is_hexdigest(Algorithm::Sha256, "SHA256SUMS"));
    }

    #[test]
    fn streaming_digest_matches_known_values() {
        let file = fixture();
        for (algorithm, expected) in [
            (Algorithm::Md5, "e59ff97941044f85df5297e1c302d260"),
            (Algorithm::Sha1, "648a6a6ffffdaa0badb23b8baf90b6168dd16b3a"),
            (
                Algorithm::Sha224,
                "e53ee97e5e0a2a4d359b5b461409dc44d9315afbc3b7d6bc5cd598e6",
            ),
            (
                Algorithm::Sha256,
                "d2a84f4b8b650937ec8f73cd8be2c74add5a911ba64df27458ed8229da804a26",
            ),
            (
                Algorithm::Sha384,
                "acbfd470c22c0d95a1d10a087dc31988b9f7bfeb13be70b876a73558be664e58\
                 58d11f9459923e6e5fd838cb5708b969",
            ),
            (
                Algorithm::Sha512,
                "e1c112ff908febc3b98b1693a6cd3564eaf8e5e6ca629d084d9f0eba99247cac\
                 dd72e369ff8941397c2807409ff66be64be908da17ad7b8a49a2a26c0e8086aa",
            ),
        ] {
            assert_eq!(
                compute_file_checksum(algorithm, file.path()).unwrap(),
                expected,
                "algorithm {algorithm}"
            );
        }
    }

    #[test]
    fn listing_lookup_requires_exact_filename() {
        let content = "11111111111111111111111111111111  test.txt.bz2.suffix\n\
                       3a49580590b7b002b74db6195c1a8e15  test.txt.bz2\n\
                       11111111111111111111111111111111  prefix.test.txt.bz2\n";

        assert_eq!(
            find_checksum_in_file(content, "test.txt.bz2").as_deref(),
            Some("3a49580590b7b002b74db6195c1a8e15")
        );
        assert_eq!(find_checksum_in_file(content, "absent.bz2"), None);
    }
}
