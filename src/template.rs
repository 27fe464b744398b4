//! Placeholder substitution for user-supplied patterns.
//!
//! Asset, destination, extract and version-file options may contain
//! `{tag}`, `{version}` and (for the version-file only) `{destination}`
//! placeholders. Rendering happens lazily, once the target release is known.

use regex::Regex;

use crate::error::{Error, Result};

/// Substitute `{name}` placeholders in `pattern` using `vars`.
///
/// Referencing a variable that is not supplied is a configuration error,
/// not something worth retrying.
pub fn render(pattern: &str, vars: &[(&str, &str)]) -> Result<String> {
    // Wide capture so a misspelled placeholder like {Tag} errors instead
    // of passing through literally. Unwrap is fine, the pattern is a
    // compile-time constant.
    let placeholder = Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap();

    let mut out = String::with_capacity(pattern.len());
    let mut last = 0;
    for caps in placeholder.captures_iter(pattern) {
        let whole = caps.get(0).unwrap();
        let name = caps.get(1).unwrap().as_str();

        let value = vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown template variable '{{{name}}}' in pattern '{pattern}'"
                ))
            })?;

        out.push_str(&pattern[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&pattern[last..]);

    Ok(out)
}
