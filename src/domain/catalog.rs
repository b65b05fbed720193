//! Stage catalog: pathways and the stages a patient moves through
//!
//! A catalog is built once from configuration and then shared immutably
//! with every reconstruction call.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

/// Maximum number of stages a pathway may display
pub const MAX_STAGES: usize = 10;

/// How scans are turned into progress rows for a pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionPolicy {
    /// One row per contiguous visit, revisits allowed (ambulatory care)
    Chronological,
    /// Exactly one row per configured stage in ordinal order (surgery)
    FixedTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("pathway '{pathway}' has no stages")]
    NoStages { pathway: String },

    #[error("stage '{stage}' in pathway '{pathway}' has no location codes")]
    NoAliases { pathway: String, stage: String },

    #[error("stage '{stage}' in fixed-template pathway '{pathway}' has no order")]
    MissingOrdinal { pathway: String, stage: String },

    #[error("order {ordinal} is used twice in pathway '{pathway}'")]
    DuplicateOrdinal { pathway: String, ordinal: u32 },

    #[error("pathway code '{0}' is configured twice")]
    DuplicatePathway(String),
}

/// Location codes are matched case-insensitively
fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// A department/room/step a patient may occupy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDescriptor {
    display_name: String,
    /// Lowercased location codes
    aliases: SmallVec<[String; 2]>,
    ordinal: Option<u32>,
}

impl StageDescriptor {
    pub fn new<I, S>(display_name: &str, aliases: I, ordinal: Option<u32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            display_name: display_name.to_string(),
            aliases: aliases.into_iter().map(|a| normalize_code(a.as_ref())).collect(),
            ordinal,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn ordinal(&self) -> Option<u32> {
        self.ordinal
    }
}

/// A progress-tracking configuration: a policy plus its stages
#[derive(Debug, Clone)]
pub struct Pathway {
    code: String,
    name: String,
    policy: ReconstructionPolicy,
    stages: Vec<StageDescriptor>,
    /// Lowercased location code -> stage index
    alias_index: FxHashMap<String, usize>,
}

impl Pathway {
    /// Build a pathway, validating its stages.
    ///
    /// Fixed-template stages must all carry a unique ordinal and are stored
    /// in ascending ordinal order. A location code listed by more than one
    /// stage belongs to the first stage that lists it.
    pub fn new(
        code: &str,
        name: &str,
        policy: ReconstructionPolicy,
        mut stages: Vec<StageDescriptor>,
    ) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::NoStages { pathway: code.to_string() });
        }

        for stage in &stages {
            if stage.aliases.is_empty() {
                return Err(CatalogError::NoAliases {
                    pathway: code.to_string(),
                    stage: stage.display_name.clone(),
                });
            }
        }

        if policy == ReconstructionPolicy::FixedTemplate {
            if let Some(stage) = stages.iter().find(|s| s.ordinal.is_none()) {
                return Err(CatalogError::MissingOrdinal {
                    pathway: code.to_string(),
                    stage: stage.display_name.clone(),
                });
            }
            // sort_by_key is stable
            stages.sort_by_key(|s| s.ordinal);
            for pair in stages.windows(2) {
                if pair[0].ordinal == pair[1].ordinal {
                    return Err(CatalogError::DuplicateOrdinal {
                        pathway: code.to_string(),
                        ordinal: pair[0].ordinal.unwrap_or_default(),
                    });
                }
            }
        }

        let mut alias_index = FxHashMap::default();
        for (idx, stage) in stages.iter().enumerate() {
            for alias in &stage.aliases {
                alias_index.entry(alias.clone()).or_insert(idx);
            }
        }

        Ok(Self {
            code: code.to_string(),
            name: name.to_string(),
            policy,
            stages,
            alias_index,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> ReconstructionPolicy {
        self.policy
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Index of the stage owning a location code, if any
    #[inline]
    pub fn stage_index(&self, location_code: &str) -> Option<usize> {
        // Stored codes are already normalized; most scans arrive that way too
        if let Some(idx) = self.alias_index.get(location_code) {
            return Some(*idx);
        }
        self.alias_index.get(&normalize_code(location_code)).copied()
    }
}

/// All pathways known to the board, keyed by pathway code
#[derive(Debug, Clone)]
pub struct StageCatalog {
    pathways: Vec<Pathway>,
}

impl StageCatalog {
    pub fn new(pathways: Vec<Pathway>) -> Result<Self, CatalogError> {
        for (i, pathway) in pathways.iter().enumerate() {
            if pathways[..i].iter().any(|p| p.code == pathway.code) {
                return Err(CatalogError::DuplicatePathway(pathway.code.clone()));
            }
        }
        Ok(Self { pathways })
    }

    pub fn pathway(&self, code: &str) -> Option<&Pathway> {
        self.pathways.iter().find(|p| p.code == code)
    }

    pub fn pathways(&self) -> &[Pathway] {
        &self.pathways
    }
}
