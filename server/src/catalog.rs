//! Immutable troop catalog, loaded once at start-up.
//!
//! The troop file keeps stats as generic JSON numbers, so `3` and `3.0` are
//! both accepted as long as they are non-negative whole numbers.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

use crate::game::types::Troop;

#[derive(Deserialize)]
struct TroopFile {
    troops: HashMap<String, RawTroop>,
}

#[derive(Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct RawTroop {
    hp: f64,
    atk: f64,
    def: f64,
    mana: f64,
    exp: f64,
    #[serde(rename = "Special", default)]
    special: String,
}

/// Lower-cased name → troop stats. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TroopCatalog {
    troops: HashMap<String, Troop>,
}

impl TroopCatalog {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading troop specs from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: TroopFile = serde_json::from_str(json)?;
        let mut troops = HashMap::with_capacity(file.troops.len());
        for (name, raw) in file.troops {
            let troop = Troop {
                hp: whole(&name, "HP", raw.hp)?,
                atk: whole(&name, "ATK", raw.atk)?,
                def: whole(&name, "DEF", raw.def)?,
                mana: whole(&name, "MANA", raw.mana)?,
                exp: whole(&name, "EXP", raw.exp)?,
                special: raw.special,
                name: name.clone(),
            };
            troops.insert(name.to_lowercase(), troop);
        }
        Ok(TroopCatalog { troops })
    }

    pub fn from_troops(troops: impl IntoIterator<Item = Troop>) -> Self {
        TroopCatalog {
            troops: troops
                .into_iter()
                .map(|t| (t.name.to_lowercase(), t))
                .collect(),
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&Troop> {
        self.troops.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.troops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.troops.is_empty()
    }

    /// Display names, sorted, for the help banner.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.troops.values().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn whole(troop: &str, field: &str, value: f64) -> anyhow::Result<u32> {
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        bail!("troop {troop}: {field} must be a non-negative whole number, got {value}");
    }
    Ok(value as u32)
}
