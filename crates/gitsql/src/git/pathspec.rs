//! Normalization of repository-relative path fragments.

use crate::error::{GitsqlError, Result};

/// Canonicalizes a path fragment before it is used for a tree lookup.
///
/// Leading `./` and `/` are stripped (repeatedly, in any interleaving),
/// trailing `/` are stripped and runs of `/` collapse to one. Mid-path `.`
/// segments and backslashes are kept verbatim because git looks paths up
/// literally. Any segment that is exactly `..` is rejected. An empty result
/// means the repository root.
pub fn normalize(raw: &str) -> Result<String> {
    let mut s = raw;
    loop {
        if let Some(rest) = s.strip_prefix("./") {
            s = rest;
        } else if let Some(rest) = s.strip_prefix('/') {
            s = rest;
        } else {
            break;
        }
    }
    let s = s.trim_end_matches('/');

    let mut out = String::with_capacity(s.len());
    let mut last_slash = false;
    for c in s.chars() {
        if c == '/' {
            if !last_slash {
                out.push(c);
            }
            last_slash = true;
        } else {
            out.push(c);
            last_slash = false;
        }
    }

    if out.split('/').any(|segment| segment == "..") {
        return Err(GitsqlError::InvalidInput(format!(
            "path must not contain '..': {raw}"
        )));
    }

    Ok(out)
}
