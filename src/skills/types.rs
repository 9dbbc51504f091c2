//! Skill Type Definitions
//!
//! Registry records, the on-disk layout, and registry persistence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{StoreError, StoreResult};

/// Registry value for one skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Source text of the procedure
    pub code: String,
    /// Generated natural-language summary (embedded in the index)
    pub description: String,
}

/// Skill name → entry. Sorted so the registry file is stable.
pub type Registry = BTreeMap<String, SkillEntry>;

/// A freshly executed procedure offered to the library
#[derive(Debug, Clone)]
pub struct NewSkill {
    /// Task the procedure was written for
    pub task: String,
    /// Callable identifier; becomes the skill name
    pub program_name: String,
    pub program_code: String,
}

impl NewSkill {
    pub fn new(task: &str, program_name: &str, program_code: &str) -> Self {
        Self {
            task: task.to_string(),
            program_name: program_name.to_string(),
            program_code: program_code.to_string(),
        }
    }
}

/// Result of offering a skill to the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Task matched the excluded prefix; nothing stored
    Skipped,
    /// New name
    Added,
    /// Existing name; the previous version was archived under `archived_as`
    Overwritten { archived_as: String },
}

/// Skill names double as file names
pub fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Directory layout under `{ckpt_dir}/skill`
#[derive(Debug, Clone)]
pub struct SkillPaths {
    pub root: PathBuf,
    pub code_dir: PathBuf,
    pub description_dir: PathBuf,
    pub vectordb_dir: PathBuf,
    pub registry_file: PathBuf,
    code_extension: String,
}

impl SkillPaths {
    pub fn new(ckpt_dir: &Path, code_extension: &str) -> Self {
        let root = ckpt_dir.join("skill");
        Self {
            code_dir: root.join("code"),
            description_dir: root.join("description"),
            vectordb_dir: root.join("vectordb"),
            registry_file: root.join("skills.json"),
            root,
            code_extension: code_extension.to_string(),
        }
    }

    pub fn ensure_dirs(&self) -> StoreResult<()> {
        std::fs::create_dir_all(&self.code_dir)?;
        std::fs::create_dir_all(&self.description_dir)?;
        std::fs::create_dir_all(&self.vectordb_dir)?;
        Ok(())
    }

    pub fn code_file(&self, artifact: &str) -> PathBuf {
        self.code_dir
            .join(format!("{}.{}", artifact, self.code_extension))
    }

    pub fn description_file(&self, artifact: &str) -> PathBuf {
        self.description_dir.join(format!("{}.txt", artifact))
    }

    /// `{name}V{n}` for the first `n >= 2` without a code artifact
    pub fn next_version_name(&self, name: &str) -> String {
        let mut version = 2u32;
        loop {
            let candidate = format!("{}V{}", name, version);
            if !self.code_file(&candidate).exists() {
                return candidate;
            }
            version += 1;
        }
    }
}

/// Load the registry file
pub fn load_registry(path: &Path) -> StoreResult<Registry> {
    if !path.exists() {
        return Err(StoreError::MissingRegistry(path.to_path_buf()));
    }
    let data = std::fs::read_to_string(path)?;
    let registry: Registry = serde_json::from_str(&data)?;
    info!(path = %path.display(), skills = registry.len(), "Loaded skill registry");
    Ok(registry)
}

/// Rewrite the registry file in full
pub fn save_registry(path: &Path, registry: &Registry) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(registry)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("mineWoodLog").is_ok());
        assert!(validate_name("craft_table2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("two words").is_err());
    }

    #[test]
    fn test_layout() {
        let paths = SkillPaths::new(Path::new("/ckpt"), "js");
        assert_eq!(paths.code_file("mineWood"), PathBuf::from("/ckpt/skill/code/mineWood.js"));
        assert_eq!(
            paths.description_file("mineWoodV2"),
            PathBuf::from("/ckpt/skill/description/mineWoodV2.txt")
        );
        assert_eq!(paths.registry_file, PathBuf::from("/ckpt/skill/skills.json"));
    }

    #[test]
    fn test_next_version_fills_first_gap() {
        let tmp = TempDir::new().unwrap();
        let paths = SkillPaths::new(tmp.path(), "js");
        paths.ensure_dirs().unwrap();

        assert_eq!(paths.next_version_name("mineWood"), "mineWoodV2");

        std::fs::write(paths.code_file("mineWoodV2"), "v2").unwrap();
        std::fs::write(paths.code_file("mineWoodV4"), "v4").unwrap();
        assert_eq!(paths.next_version_name("mineWood"), "mineWoodV3");
    }

    #[test]
    fn test_registry_roundtrip_and_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("skills.json");
        assert!(matches!(load_registry(&path), Err(StoreError::MissingRegistry(_))));

        let mut registry = Registry::new();
        registry.insert(
            "mineWood".into(),
            SkillEntry {
                code: "async function mineWood(bot) {}".into(),
                description: "mines wood".into(),
            },
        );
        save_registry(&path, &registry).unwrap();
        assert_eq!(load_registry(&path).unwrap(), registry);
    }
}
