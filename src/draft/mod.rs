use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{DraftError, PackId, Res};

pub mod discard;
pub mod events;
pub mod packs;
pub mod picks;
pub mod session;

/// Ruleset for a draft. The defaults are the house rules: 40 packs over four
/// stages, two picks per pack and a 12 card discard-down each stage.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    pub total_packs: usize,
    pub packs_per_stage: usize,
    pub draw_size: usize,

    /// Draw position guaranteed to be non-common, if the pack allows.
    pub rare_slot: Option<usize>,

    pub base_picks: usize,

    /// Most bonus picks a single picked card can unlock.
    pub bonus_cap: usize,

    pub main_per_stage: usize,
    pub side_per_stage: usize,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            total_packs: 40,
            packs_per_stage: 10,
            draw_size: 9,
            rare_slot: Some(8),
            base_picks: 2,
            bonus_cap: 1,
            main_per_stage: 10,
            side_per_stage: 2,
        }
    }
}

impl DraftConfig {
    pub fn stages(&self) -> usize {
        if self.packs_per_stage == 0 {
            0
        } else {
            self.total_packs / self.packs_per_stage
        }
    }

    /// Cap on the main deck after the discard of `stage`, and on the main
    /// eligible pending pool during that stage.
    pub fn main_cap(&self, stage: usize) -> usize {
        self.main_per_stage * stage
    }

    pub fn validate(&self) -> Res<()> {
        let invalid = |msg: &str| Err(DraftError::InvalidConfiguration(msg.to_string()));

        if self.total_packs == 0 || self.packs_per_stage == 0 {
            return invalid("Pack counts must be positive.");
        }
        if self.total_packs % self.packs_per_stage != 0 {
            return invalid("Total packs must divide evenly into stages.");
        }
        if self.draw_size == 0 || self.base_picks == 0 {
            return invalid("Draw size and base picks must be positive.");
        }
        if self.base_picks > self.draw_size {
            return invalid("Base picks can't exceed the draw size.");
        }
        if self.main_per_stage == 0 {
            return invalid("Main deck quota must be positive.");
        }
        if let Some(slot) = self.rare_slot {
            if slot >= self.draw_size {
                return invalid("Rare slot must fall inside the draw.");
            }
        }

        Ok(())
    }
}

/// Everything needed to run one drafting session.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deck name, used for exported file names.
    pub name: String,

    pub packs: Vec<PackId>,
    pub export_dirs: Vec<PathBuf>,
    pub seed: Option<u64>,

    /// Directory for the deck snapshot written after each stage.
    pub autosave_dir: Option<PathBuf>,

    pub rules: DraftConfig,
}

impl SessionConfig {
    pub fn new<S: ToString>(name: S) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Res<Self> {
        let file = std::fs::File::open(path).map_err(|e| DraftError::io(path, e))?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        tracing::debug!("Loaded session config from {}.", path.display());
        Ok(config)
    }

    /// Check the name and ruleset. The pack selection is checked against the
    /// pack catalog when the session starts.
    pub fn validate(&self) -> Res<()> {
        if self.name.trim().is_empty() {
            return Err(DraftError::InvalidConfiguration(
                "Deck name must not be empty.".to_string(),
            ));
        }
        self.rules.validate()
    }

    /// Check the pack selection size and uniqueness.
    pub(crate) fn validate_packs(&self) -> Res<()> {
        if self.packs.len() != self.rules.total_packs {
            return Err(DraftError::InvalidConfiguration(format!(
                "Selected {} packs, {} required.",
                self.packs.len(),
                self.rules.total_packs
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dupe) = self.packs.iter().find(|p| !seen.insert(*p)) {
            return Err(DraftError::InvalidConfiguration(format!(
                "Pack {dupe} selected more than once."
            )));
        }

        Ok(())
    }

    /// Random source for the session. Seeded sessions replay identically.
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}
