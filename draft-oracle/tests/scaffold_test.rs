// Integration tests for the shipped project files.

use std::path::Path;

/// Verify that defaults/oracle.toml is valid TOML with every section.
#[test]
fn default_oracle_toml_is_valid() {
    let content = std::fs::read_to_string("defaults/oracle.toml")
        .expect("defaults/oracle.toml should exist");
    let parsed: toml::Value = toml::from_str(&content).expect("defaults/oracle.toml is not valid TOML");
    for section in ["backend", "api", "polling", "simulation"] {
        assert!(parsed.get(section).is_some(), "missing [{section}] section");
    }
}

/// Verify that all expected directories exist.
#[test]
fn directory_structure_exists() {
    let expected_dirs = ["src", "src/backend", "src/draft", "src/tui", "src/tui/widgets", "defaults", "tests"];
    for dir in &expected_dirs {
        assert!(Path::new(dir).is_dir(), "Directory {dir} should exist");
    }
}
