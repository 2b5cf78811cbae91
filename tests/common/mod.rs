#![allow(dead_code)]

use pdf_squeeze::{
    cancel::CancelToken,
    config::Config,
    engine::{CompressionBackend, Preset, Rasterizer},
    error::{EngineError, Result},
    tier::{Strategy, Tier},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Write an artifact of this many bytes.
    Size(u64),
    /// Exit abnormally.
    Fail,
    /// Report success without writing anything.
    Silent,
}

/// Backend that answers each strategy with a scripted size.
pub struct FakeEngine {
    script: HashMap<Strategy, Behavior>,
    calls: Mutex<Vec<Strategy>>,
    cancel_after: Option<(usize, CancelToken)>,
    delay: Option<Duration>,
}

impl FakeEngine {
    pub fn new(script: &[(Strategy, Behavior)]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            calls: Mutex::new(Vec::new()),
            cancel_after: None,
            delay: None,
        }
    }

    /// Flip `token` once `n` calls have completed.
    pub fn cancel_after(mut self, n: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Strategy> {
        self.calls.lock().unwrap().clone()
    }

    fn run(&self, preset: &Preset, output: &Path) -> Result<()> {
        let strategy = strategy_of(preset);
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(strategy);
            calls.len()
        };
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some((after, token)) = &self.cancel_after {
            if n >= *after {
                token.cancel();
            }
        }
        match self.script.get(&strategy).copied().unwrap_or(Behavior::Fail) {
            Behavior::Size(bytes) => {
                std::fs::write(output, vec![b'x'; bytes as usize]).unwrap();
                Ok(())
            }
            Behavior::Fail => Err(EngineError::ExternalToolFailure {
                tool: "fake".into(),
                tier: preset.label(),
                detail: "exit status: 1".into(),
            }),
            Behavior::Silent => Ok(()),
        }
    }
}

impl CompressionBackend for FakeEngine {
    fn compress(&self, _input: &Path, preset: &Preset, output: &Path) -> Result<()> {
        self.run(preset, output)
    }
}

impl Rasterizer for FakeEngine {
    fn rasterize_and_reassemble(&self, _input: &Path, preset: &Preset, output: &Path) -> Result<()> {
        self.run(preset, output)
    }
}

/// Map a preset built from the default config back to its strategy.
pub fn strategy_of(preset: &Preset) -> Strategy {
    match preset {
        Preset::Standard { pdf_settings } => match pdf_settings.as_str() {
            "/printer" => Strategy::Standard(Tier::Low),
            "/ebook" => Strategy::Standard(Tier::Medium),
            "/screen" => Strategy::Standard(Tier::High),
            other => panic!("unexpected pdf_settings {other}"),
        },
        Preset::Forced { .. } => Strategy::Force,
        Preset::Raster { .. } => Strategy::Rasterize,
    }
}

pub const LOW: Strategy = Strategy::Standard(Tier::Low);
pub const MEDIUM: Strategy = Strategy::Standard(Tier::Medium);
pub const HIGH: Strategy = Strategy::Standard(Tier::High);

pub struct Sandbox {
    pub dir: TempDir,
    pub cfg: Config,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.paths.out_dir = dir.path().join("out").display().to_string();
        cfg.paths.work_dir = dir.path().join("work").display().to_string();
        Self { dir, cfg }
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.cfg.paths.work_dir)
    }

    pub fn out_dir(&self) -> PathBuf {
        PathBuf::from(&self.cfg.paths.out_dir)
    }

    /// A fake document of exactly `size` bytes.
    pub fn source(&self, name: &str, size: usize) -> PathBuf {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.resize(size, b'a');
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn scratch_dir(&self) -> PathBuf {
        let p = self.dir.path().join("scratch");
        std::fs::create_dir_all(&p).unwrap();
        p
    }
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(rd) => rd.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
