use crate::tier::Tier;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub hashing: Hashing,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub ghostscript: Ghostscript,
    #[serde(default)]
    pub tiers: Tiers,
    #[serde(default)]
    pub escalation: Escalation,
    #[serde(default)]
    pub increase: Increase,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub print_summary: bool,
    /// Worker threads for batch runs. Tiers inside one request never run in parallel.
    pub max_parallel_jobs: usize,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            max_parallel_jobs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            work_dir: ".pdf-squeeze-work".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hashing {
    pub mode: String,
    pub fast_window_bytes: u64,
}
impl Default for Hashing {
    fn default() -> Self {
        Self {
            mode: "fast_2x16mb".into(),
            fast_window_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub max_input_file_bytes: u64,
    /// Per-request deadline; 0 disables it.
    pub job_timeout_seconds: u64,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 2 * 1024 * 1024 * 1024,
            job_timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ghostscript {
    /// Executable name or path; "auto" checks $GHOSTSCRIPT then falls back to `gs`.
    pub exe: String,
    pub compatibility_level: String,
    /// Kill timeout for a single invocation; 0 waits forever.
    pub timeout_seconds: u64,
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Ghostscript {
    fn default() -> Self {
        Self {
            exe: "auto".into(),
            compatibility_level: "1.4".into(),
            timeout_seconds: 300,
            extra_args: Vec::new(),
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tiers {
    /// Tier used for Reduce requests that carry no target.
    pub default_tier: Tier,
    pub low_pdf_settings: String,
    pub medium_pdf_settings: String,
    pub high_pdf_settings: String,
}
impl Default for Tiers {
    fn default() -> Self {
        Self {
            default_tier: Tier::Medium,
            low_pdf_settings: "/printer".into(),
            medium_pdf_settings: "/ebook".into(),
            high_pdf_settings: "/screen".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    pub enabled: bool,
    pub force: bool,
    pub rasterize: bool,
    pub force_resolution_dpi: u32,
    pub raster_resolution_dpi: u32,
    pub raster_jpeg_quality: u8,
    pub raster_device: String,
}
impl Default for Escalation {
    fn default() -> Self {
        Self {
            enabled: true,
            force: true,
            rasterize: true,
            force_resolution_dpi: 50,
            raster_resolution_dpi: 72,
            raster_jpeg_quality: 30,
            raster_device: "pdfimage24".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Increase {
    pub verify_structure: bool,
}
impl Default for Increase {
    fn default() -> Self {
        Self {
            verify_structure: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_report_json: bool,
    pub artifact_suffix: String,
    pub report_suffix: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_report_json: true,
            artifact_suffix: "_compressed.pdf".into(),
            report_suffix: "_report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub keep_tool_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_tool_stderr: true,
            dump_effective_config: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
