//! The module manifest — a YAML document named `Tawa Module
//! Information` with a single `Package` field.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "Tawa Module Information";
pub const SOURCE_SUFFIX: &str = ".Tawa Source File";
pub const LIBRARY_SUFFIX: &str = ".Dynamically Linked Tawa Module";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(rename = "Package")]
    pub package: String,
}

impl Manifest {
    pub fn load(dir: &Path) -> Result<Manifest, String> {
        let path = dir.join(MANIFEST_FILE);
        let data = fs::read_to_string(&path)
            .map_err(|e| format!("error reading {MANIFEST_FILE}: {e}"))?;
        serde_yaml::from_str(&data).map_err(|e| format!("error reading {MANIFEST_FILE}: {e}"))
    }

    pub fn write(&self, dir: &Path) -> Result<(), String> {
        let data = serde_yaml::to_string(self)
            .map_err(|e| format!("error creating {MANIFEST_FILE}: {e}"))?;
        fs::write(dir.join(MANIFEST_FILE), data)
            .map_err(|e| format!("error creating {MANIFEST_FILE}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn manifest_round_trips_through_yaml() {
        let manifest = Manifest {
            package: "demo".to_string(),
        };
        let yaml = serde_yaml::to_string(&manifest).expect("serialize");
        assert!(yaml.contains("Package: demo"), "unexpected yaml: {yaml}");
        let back: Manifest = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(manifest, back);
    }

    #[test]
    fn manifest_accepts_hand_written_yaml() {
        let back: Manifest = serde_yaml::from_str("Package: hello\n").expect("deserialize");
        assert_eq!(back.package, "hello");
    }
}
