use crate::{
    error::{EngineError, Result},
    tier::Tier,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Reduce,
    Increase,
}

impl Mode {
    pub fn parse(raw: &str) -> Result<Mode> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reduce" => Ok(Mode::Reduce),
            "increase" => Ok(Mode::Increase),
            other => Err(EngineError::InvalidParameter(format!("unknown mode: {other}"))),
        }
    }
}

/// One unit of work. Immutable once built.
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub source: PathBuf,
    pub mode: Mode,
    pub target_bytes: Option<NonZeroU64>,
    /// Tier for a Reduce request without a target; planner default otherwise.
    pub level: Option<Tier>,
}

impl CompressionRequest {
    pub fn reduce(source: impl Into<PathBuf>, target_bytes: Option<NonZeroU64>) -> Self {
        Self {
            source: source.into(),
            mode: Mode::Reduce,
            target_bytes,
            level: None,
        }
    }

    pub fn increase(source: impl Into<PathBuf>, target_bytes: NonZeroU64) -> Self {
        Self {
            source: source.into(),
            mode: Mode::Increase,
            target_bytes: Some(target_bytes),
            level: None,
        }
    }

    pub fn with_level(mut self, level: Tier) -> Self {
        self.level = Some(level);
        self
    }

    /// Build from unchecked caller input.
    pub fn from_raw(
        source: impl Into<PathBuf>,
        mode: Mode,
        target_bytes: Option<u64>,
        level: Option<Tier>,
    ) -> Result<Self> {
        let target_bytes = match target_bytes {
            None => None,
            Some(raw) => Some(NonZeroU64::new(raw).ok_or_else(|| {
                EngineError::InvalidParameter("target_bytes must be positive".into())
            })?),
        };
        if mode == Mode::Increase && target_bytes.is_none() {
            return Err(EngineError::InvalidParameter(
                "increase mode requires target_bytes".into(),
            ));
        }
        Ok(Self {
            source: source.into(),
            mode,
            target_bytes,
            level,
        })
    }

    pub fn target(&self) -> Option<u64> {
        self.target_bytes.map(NonZeroU64::get)
    }
}
