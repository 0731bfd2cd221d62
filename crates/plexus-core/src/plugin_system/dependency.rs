use std::collections::HashSet;

use thiserror::Error;

/// Error that can occur when validating dependencies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// One or more required plugins are not loaded
    #[error("Plugin '{plugin}' requires plugins that are not loaded: {}", missing.join(", "))]
    MissingPlugin { plugin: String, missing: Vec<String> },
}

/// Checks that every dependency `plugin` declares is already loaded.
///
/// `loaded` is the set of names in the registry at the moment of the check,
/// so plugins committed earlier in the same batch count. Missing names are
/// reported in declaration order.
pub fn check_dependencies<'a, I>(
    plugin: &str,
    declared: I,
    loaded: &HashSet<String>,
) -> Result<(), DependencyError>
where
    I: IntoIterator<Item = &'a String>,
{
    let missing: Vec<String> = declared
        .into_iter()
        .filter(|dep| !loaded.contains(dep.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DependencyError::MissingPlugin {
            plugin: plugin.to_string(),
            missing,
        })
    }
}
