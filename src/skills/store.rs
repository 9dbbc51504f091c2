//! Skill Store
//!
//! Owns the skill registry and keeps the similarity index in lockstep with
//! it. After every mutation, and at startup, the index must report exactly
//! as many entries as the registry holds; anything else is fatal.

use serde_json::json;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::generator::DescriptionGenerator;
use super::types::{
    load_registry, save_registry, validate_name, AddOutcome, NewSkill, Registry, SkillEntry,
    SkillPaths,
};
use crate::config::SkillStoreConfig;
use crate::context::AgentContext;
use crate::error::{StoreError, StoreResult};
use crate::index::{SimilarityIndex, SqliteVectorIndex};

fn index_err(e: anyhow::Error) -> StoreError {
    StoreError::Index(format!("{:#}", e))
}

pub struct SkillStore {
    config: SkillStoreConfig,
    paths: SkillPaths,
    registry: Registry,
    index: Box<dyn SimilarityIndex>,
    describer: DescriptionGenerator,
}

impl SkillStore {
    /// Open the store with the persisted SQLite index under the checkpoint
    pub async fn open(ctx: &AgentContext) -> StoreResult<Self> {
        let paths = SkillPaths::new(&ctx.config.store.ckpt_dir, &ctx.config.store.code_extension);
        paths.ensure_dirs()?;
        let index = SqliteVectorIndex::open(&paths.vectordb_dir, ctx.embedder.clone())
            .map_err(index_err)?;
        Self::open_with_index(ctx, Box::new(index)).await
    }

    /// Open the store over an explicit index.
    ///
    /// Cold start expects an empty index; resume loads the registry file and
    /// expects the index to match it.
    pub async fn open_with_index(
        ctx: &AgentContext,
        index: Box<dyn SimilarityIndex>,
    ) -> StoreResult<Self> {
        let config = ctx.config.store.clone();
        let paths = SkillPaths::new(&config.ckpt_dir, &config.code_extension);
        paths.ensure_dirs()?;

        let registry = if config.resume {
            info!(dir = %paths.root.display(), "Loading skill store from checkpoint");
            load_registry(&paths.registry_file)?
        } else {
            Registry::new()
        };

        let store = Self {
            describer: DescriptionGenerator::new(ctx.completion.clone(), ctx.vision.clone()),
            config,
            paths,
            registry,
            index,
        };
        store.verify_consistency().await?;

        info!(skills = store.registry.len(), resume = store.config.resume, "Skill store ready");
        Ok(store)
    }

    /// Fail unless index count equals registry size
    pub async fn verify_consistency(&self) -> StoreResult<()> {
        let index = self.index.count().await.map_err(index_err)?;
        let registry = self.registry.len();
        if index != registry {
            error!(index, registry, "Similarity index is not synced with the skill registry");
            return Err(StoreError::Consistency { index, registry });
        }
        Ok(())
    }

    /// Code of the most relevant skills for `query`, best first
    pub async fn retrieve(&self, query: &str) -> StoreResult<Vec<String>> {
        let k = self.config.retrieval_top_k.min(self.registry.len());
        if k == 0 {
            return Ok(vec![]);
        }

        info!(k, "Skill store retrieving skills");
        let mut hits = self.index.query(query, k).await.map_err(index_err)?;
        hits.truncate(k);

        let names: Vec<&str> = hits.iter().map(|h| h.name()).collect();
        info!("Retrieved skills: {}", names.join(", "));

        names
            .into_iter()
            .map(|name| {
                self.registry
                    .get(name)
                    .map(|entry| entry.code.clone())
                    .ok_or_else(|| StoreError::UnknownSkill(name.to_string()))
            })
            .collect()
    }

    /// Add or overwrite a skill; see [`AddOutcome`]
    pub async fn add(&mut self, skill: &NewSkill) -> StoreResult<AddOutcome> {
        if !self.config.excluded_task_prefix.is_empty()
            && skill.task.starts_with(&self.config.excluded_task_prefix)
        {
            debug!(task = %skill.task, "Excluded task, skill not stored");
            return Ok(AddOutcome::Skipped);
        }

        let name = skill.program_name.as_str();
        validate_name(name)?;

        let description = self
            .describer
            .generate(name, &skill.program_code)
            .await
            .map_err(|e| StoreError::Completion(format!("{:#}", e)))?;

        let previous = self.registry.get(name).cloned();
        let mut archived_as = None;
        if let Some(previous) = &previous {
            let version = self.paths.next_version_name(name);
            std::fs::write(self.paths.code_file(&version), &previous.code)?;
            std::fs::write(self.paths.description_file(&version), &previous.description)?;
            archived_as = Some(version);

            if let Err(e) = self.index.delete(&[name.to_string()]).await {
                return Err(self.roll_back(name, Some(previous.clone()), archived_as, index_err(e)).await);
            }
        }

        if let Err(e) = self
            .index
            .upsert(name, &description, json!({ "name": name }))
            .await
        {
            return Err(self.roll_back(name, previous, archived_as, index_err(e)).await);
        }

        self.registry.insert(
            name.to_string(),
            SkillEntry {
                code: skill.program_code.clone(),
                description: description.clone(),
            },
        );

        self.verify_consistency().await?;

        if let Err(e) = self.persist(name, &skill.program_code, &description) {
            return Err(self.roll_back(name, previous, archived_as, e).await);
        }

        let outcome = match archived_as {
            Some(archived_as) => {
                warn!(skill = %name, archived_as = %archived_as, "Skill already exists. Rewriting!");
                AddOutcome::Overwritten { archived_as }
            }
            None => AddOutcome::Added,
        };

        info!(skill = %name, skills = self.registry.len(), "Skill stored");
        Ok(outcome)
    }

    fn persist(&self, name: &str, code: &str, description: &str) -> StoreResult<()> {
        std::fs::write(self.paths.code_file(name), code)?;
        std::fs::write(self.paths.description_file(name), description)?;
        save_registry(&self.paths.registry_file, &self.registry)
    }

    /// Undo a partial add: restore the previous registry entry, its index
    /// entry and its artifacts (or remove the entries for a new name), then
    /// drop the archive files.
    ///
    /// Returns `cause` when registry and index agree again, otherwise the
    /// fatal consistency error.
    async fn roll_back(
        &mut self,
        name: &str,
        previous: Option<SkillEntry>,
        archived_as: Option<String>,
        cause: StoreError,
    ) -> StoreError {
        warn!(skill = %name, "Adding skill failed, rolling back: {}", cause);

        let restored = match previous {
            Some(previous) => {
                let restored = self
                    .index
                    .upsert(name, &previous.description, json!({ "name": name }))
                    .await;
                let _ = std::fs::write(self.paths.code_file(name), &previous.code);
                let _ = std::fs::write(self.paths.description_file(name), &previous.description);
                self.registry.insert(name.to_string(), previous);
                restored
            }
            None => {
                self.registry.remove(name);
                self.index.delete(&[name.to_string()]).await
            }
        };
        if let Err(e) = restored {
            error!(skill = %name, "Failed to restore similarity index entry: {:#}", e);
        }

        if let Some(version) = archived_as {
            let _ = std::fs::remove_file(self.paths.code_file(&version));
            let _ = std::fs::remove_file(self.paths.description_file(&version));
        }

        match self.verify_consistency().await {
            Ok(()) => cause,
            Err(diverged) => diverged,
        }
    }

    /// Every skill's code then every control primitive, blank-line separated
    pub fn programs(&self) -> String {
        let mut programs = String::new();
        for entry in self.registry.values() {
            programs.push_str(&entry.code);
            programs.push_str("\n\n");
        }
        for primitive in &self.config.control_primitives {
            programs.push_str(primitive);
            programs.push_str("\n\n");
        }
        programs
    }

    /// Replace the index contents with the registry file's descriptions.
    ///
    /// Operator recovery after a consistency failure.
    pub async fn rebuild_index(registry_file: &Path, index: &dyn SimilarityIndex) -> StoreResult<usize> {
        let registry = load_registry(registry_file)?;

        index.clear().await.map_err(index_err)?;
        for (name, entry) in &registry {
            index
                .upsert(name, &entry.description, json!({ "name": name }))
                .await
                .map_err(index_err)?;
        }

        let count = index.count().await.map_err(index_err)?;
        if count != registry.len() {
            return Err(StoreError::Consistency {
                index: count,
                registry: registry.len(),
            });
        }

        info!(skills = count, "Regenerated similarity index from registry");
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&SkillEntry> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn paths(&self) -> &SkillPaths {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Current index entry count
    pub async fn index_count(&self) -> StoreResult<usize> {
        self.index.count().await.map_err(index_err)
    }
}
