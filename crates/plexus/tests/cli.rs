use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn plexus() -> Command {
    Command::cargo_bin("plexus").unwrap()
}

#[test]
fn test_help_lists_commands() -> Result<(), Box<dyn std::error::Error>> {
    plexus()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plugins"))
        .stdout(predicate::str::contains("modules"))
        .stdout(predicate::str::contains("--plugins-dir"));
    Ok(())
}

#[test]
fn test_default_run_with_empty_plugin_dir() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let plugins = dir.path().join("plugins");

    plexus()
        .arg("--plugins-dir")
        .arg(&plugins)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 0 plugins"))
        .stdout(predicate::str::contains("Unloaded 0 plugins"));

    assert!(plugins.is_dir(), "Discovery creates the plugin directory");
    Ok(())
}

#[test]
fn test_listing_commands_on_empty_host() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    plexus()
        .arg("--plugins-dir")
        .arg(dir.path())
        .arg("plugins")
        .assert()
        .success()
        .stdout(predicate::str::contains("No plugins loaded."));

    plexus()
        .arg("--plugins-dir")
        .arg(dir.path())
        .arg("modules")
        .assert()
        .success()
        .stdout(predicate::str::contains("No modules registered."));
    Ok(())
}

#[test]
fn test_non_archives_in_plugin_dir_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("readme.txt"), "not a plugin")?;

    plexus()
        .arg("--plugins-dir")
        .arg(dir.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 0 plugins"));
    Ok(())
}

#[test]
fn test_invalid_host_version_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    plexus()
        .arg("--plugins-dir")
        .arg(dir.path())
        .arg("--host-version")
        .arg("not-a-version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to initialize"))
        .stdout(predicate::str::contains("Loaded").not());
    Ok(())
}

#[test]
fn test_config_file_sets_plugin_dir() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let plugins = dir.path().join("from-config");
    let config = dir.path().join("plexus.json");
    std::fs::write(
        &config,
        format!(r#"{{ "plugin_dir": {:?}, "toggle_messages": false }}"#, plugins.display().to_string()),
    )?;

    plexus()
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 0 plugins"));

    assert!(plugins.is_dir());
    Ok(())
}

#[test]
fn test_unsupported_config_format_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("plexus.ini");
    std::fs::write(&config, "plugin_dir = x")?;

    plexus()
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
    Ok(())
}
