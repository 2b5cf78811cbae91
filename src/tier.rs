use crate::{config::Config, engine::Preset, request::Mode};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Compression aggressiveness, least to most destructive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Low, Tier::Medium, Tier::High];

    pub fn parse(raw: &str) -> Option<Tier> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Tier::Low),
            "medium" => Some(Tier::Medium),
            "high" => Some(Tier::High),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Low => "Low",
            Tier::Medium => "Medium",
            Tier::High => "High",
        };
        f.write_str(s)
    }
}

/// Anything that can turn the source into a candidate: an ordinary tier or
/// one of the two escalation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Standard(Tier),
    /// Most aggressive preset plus a fixed downsampling resolution.
    Force,
    /// Render every page to a low-quality bitmap and rebuild the document.
    Rasterize,
}

impl Strategy {
    pub const ESCALATION: [Strategy; 2] = [Strategy::Force, Strategy::Rasterize];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Standard(t) => t.fmt(f),
            Strategy::Force => f.write_str("Force"),
            Strategy::Rasterize => f.write_str("Rasterize"),
        }
    }
}

impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone)]
pub struct TierPlanner {
    default_tier: Tier,
}

impl TierPlanner {
    pub fn new(default_tier: Tier) -> Self {
        Self { default_tier }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.tiers.default_tier)
    }

    /// Ordered tiers to try. A Reduce request with a target walks every tier
    /// from least to most aggressive; without a target it gets one tier.
    pub fn plan(&self, mode: Mode, has_target: bool) -> Vec<Tier> {
        match (mode, has_target) {
            (Mode::Increase, _) => Vec::new(),
            (Mode::Reduce, false) => vec![self.default_tier],
            (Mode::Reduce, true) => Tier::ALL.to_vec(),
        }
    }
}

/// Escalation steps enabled by config, in the order they run.
pub fn escalation_steps(cfg: &Config) -> Vec<Strategy> {
    if !cfg.escalation.enabled {
        return Vec::new();
    }
    Strategy::ESCALATION
        .into_iter()
        .filter(|s| match s {
            Strategy::Force => cfg.escalation.force,
            Strategy::Rasterize => cfg.escalation.rasterize,
            Strategy::Standard(_) => false,
        })
        .collect()
}

pub fn preset_for(cfg: &Config, strategy: Strategy) -> Preset {
    match strategy {
        Strategy::Standard(tier) => Preset::Standard {
            pdf_settings: pdf_settings(cfg, tier).to_string(),
        },
        Strategy::Force => Preset::Forced {
            pdf_settings: pdf_settings(cfg, Tier::High).to_string(),
            resolution_dpi: cfg.escalation.force_resolution_dpi,
        },
        Strategy::Rasterize => Preset::Raster {
            device: cfg.escalation.raster_device.clone(),
            resolution_dpi: cfg.escalation.raster_resolution_dpi,
            jpeg_quality: cfg.escalation.raster_jpeg_quality.clamp(1, 100),
        },
    }
}

fn pdf_settings(cfg: &Config, tier: Tier) -> &str {
    match tier {
        Tier::Low => &cfg.tiers.low_pdf_settings,
        Tier::Medium => &cfg.tiers.medium_pdf_settings,
        Tier::High => &cfg.tiers.high_pdf_settings,
    }
}
