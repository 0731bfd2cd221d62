#![cfg(test)]

use std::collections::HashSet;

use crate::plugin_system::dependency::{DependencyError, check_dependencies};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::metadata::MetadataBuilder;

fn loaded(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_no_dependencies_always_satisfied() {
    let declared: Vec<String> = Vec::new();
    assert!(check_dependencies("Solo", &declared, &loaded(&[])).is_ok());
}

#[test]
fn test_all_dependencies_loaded() {
    let declared = vec!["Core".to_string(), "Utils".to_string()];
    assert!(check_dependencies("App", &declared, &loaded(&["Utils", "Core", "Extra"])).is_ok());
}

#[test]
fn test_missing_dependencies_in_declaration_order() {
    let declared = vec!["Zeta".to_string(), "Core".to_string(), "Alpha".to_string()];
    let err = check_dependencies("App", &declared, &loaded(&["Core"])).unwrap_err();
    assert_eq!(
        err,
        DependencyError::MissingPlugin {
            plugin: "App".to_string(),
            missing: vec!["Zeta".to_string(), "Alpha".to_string()],
        }
    );

    let converted = PluginSystemError::from(err);
    assert!(matches!(converted, PluginSystemError::MissingDependency { ref missing, .. } if missing.len() == 2));
    assert!(converted.to_string().contains("Zeta, Alpha"));
}

#[test]
fn test_metadata_dependencies_deduplicated() {
    let metadata = MetadataBuilder::new("App", "1.0.0")
        .dependency("Core")
        .dependencies(&["Utils", "Core"])
        .build();
    assert_eq!(metadata.dependencies, vec!["Core", "Utils"]);
    assert!(metadata.depends_on("Utils"));
    assert!(!metadata.depends_on("App"));
    assert_eq!(metadata.min_host_version, "0.0.0");
}
