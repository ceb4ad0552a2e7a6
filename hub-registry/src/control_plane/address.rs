//! Address normalization and validation for the route namespace.
//!
//! Addresses are case-insensitive `/`-delimited ASCII strings; the first
//! segment must equal the reserved root token. All comparisons happen on the
//! lower-cased form.

use crate::error::RegistryError;

/// Reserved first segment of every address.
pub const ROOT_TOKEN: &str = "hub";

/// Reserved namespace branch under the root.
pub const SYSTEM_ADDRESS: &str = "hub/system";

/// Introspection endpoint any peer may query for the flattened table.
pub const ROUTES_ADDRESS: &str = "hub/system/routes";

/// Lower-cases and splits a path, rejecting anything not rooted at
/// [`ROOT_TOKEN`] or containing empty segments.
pub(crate) fn normalize(path: &str) -> Result<Vec<String>, RegistryError> {
    let lowered = path.trim().to_lowercase();
    let segments: Vec<String> = lowered.split('/').map(str::to_string).collect();

    match segments.first() {
        Some(first) if first == ROOT_TOKEN => {}
        _ => return Err(RegistryError::InvalidPath(path.to_string())),
    }
    if segments.iter().any(String::is_empty) {
        return Err(RegistryError::InvalidPath(path.to_string()));
    }

    Ok(segments)
}

/// Joins a parent path and a leaf name into a full lower-cased address.
pub(crate) fn join(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.to_lowercase(), name.to_lowercase())
}
