//! Level-of-detail settings for a reduction run.

use std::fmt;
use std::path::Path;

use hr_core::LengthUnit;
use serde::{Deserialize, Serialize};

use crate::error::ReduceResult;

/// How much detail of one element category survives the reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lod {
    /// Category is skipped entirely.
    Ignore,
    /// Elements are deleted and their neighbours joined directly.
    Low,
    /// Elements are aggregated.
    Medium,
    /// Elements are kept as they are.
    Full,
}

impl fmt::Display for Lod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lod::Ignore => "ignore",
            Lod::Low => "low",
            Lod::Medium => "medium",
            Lod::Full => "full",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unsupported level of detail: {category} = {lod} ({reason})")]
    UnsupportedLod {
        category: &'static str,
        lod: Lod,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionSettings {
    pub pumps: Lod,
    pub fittings: Lod,
    pub pipes: Lod,
    pub underfloor_heating: Lod,
    pub space_heaters: Lod,
    pub consumers: Lod,
    pub distributor_modules: Lod,
    /// Unit of the model coordinates.
    pub length_unit: LengthUnit,
    pub detect_dead_ends: bool,
}

impl Default for ReductionSettings {
    fn default() -> Self {
        Self {
            pumps: Lod::Medium,
            fittings: Lod::Full,
            pipes: Lod::Medium,
            underfloor_heating: Lod::Medium,
            space_heaters: Lod::Medium,
            consumers: Lod::Medium,
            distributor_modules: Lod::Medium,
            length_unit: LengthUnit::Millimeter,
            detect_dead_ends: false,
        }
    }
}

impl ReductionSettings {
    /// Only plain pipes can be deleted; every other category is either
    /// aggregated or left alone.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let categories = [
            ("pumps", self.pumps),
            ("fittings", self.fittings),
            ("underfloor_heating", self.underfloor_heating),
            ("space_heaters", self.space_heaters),
            ("consumers", self.consumers),
            ("distributor_modules", self.distributor_modules),
        ];
        for (category, lod) in categories {
            if lod == Lod::Low {
                return Err(SettingsError::UnsupportedLod {
                    category,
                    lod,
                    reason: "only pipes can be removed",
                });
            }
        }
        Ok(())
    }

    /// Every category at `lod`, pipes included.
    pub fn uniform(lod: Lod) -> Self {
        Self {
            pumps: lod,
            fittings: lod,
            pipes: lod,
            underfloor_heating: lod,
            space_heaters: lod,
            consumers: lod,
            distributor_modules: lod,
            ..Self::default()
        }
    }
}

pub fn from_yaml_str(content: &str) -> ReduceResult<ReductionSettings> {
    let settings: ReductionSettings = serde_yaml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_yaml(path: &Path) -> ReduceResult<ReductionSettings> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &Path, settings: &ReductionSettings) -> ReduceResult<()> {
    settings.validate()?;
    let content = serde_yaml::to_string(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ReduceResult<ReductionSettings> {
    let content = std::fs::read_to_string(path)?;
    let settings: ReductionSettings = serde_json::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_json(path: &Path, settings: &ReductionSettings) -> ReduceResult<()> {
    settings.validate()?;
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
