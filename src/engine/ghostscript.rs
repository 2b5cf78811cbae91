use super::{CompressionBackend, Preset, Rasterizer, ToolDiag};
use crate::config::Config;
use crate::error::{EngineError, IoContext, Result};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const TOOL: &str = "ghostscript";

pub struct GhostscriptEngine {
    cfg: Config,
    exe: PathBuf,
}

impl GhostscriptEngine {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.clone(),
            exe: resolve_gs_exe(&cfg.ghostscript.exe),
        }
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    pub fn doctor(&self) -> ToolDiag {
        let exe = self.exe.display().to_string();
        match Command::new(&self.exe).arg("--version").output() {
            Ok(out) if out.status.success() => ToolDiag {
                exe,
                version: Some(String::from_utf8_lossy(&out.stdout).trim().to_string()),
                ok: true,
                error: None,
            },
            Ok(out) => ToolDiag {
                exe,
                version: None,
                ok: false,
                error: Some(String::from_utf8_lossy(&out.stderr).trim().to_string()),
            },
            Err(e) => ToolDiag {
                exe,
                version: None,
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn build_args(&self, preset: &Preset, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match preset {
            Preset::Standard { pdf_settings } => {
                args.push("-sDEVICE=pdfwrite".into());
                args.push(format!("-dCompatibilityLevel={}", self.cfg.ghostscript.compatibility_level).into());
                args.push(format!("-dPDFSETTINGS={pdf_settings}").into());
            }
            Preset::Forced {
                pdf_settings,
                resolution_dpi,
            } => {
                args.push("-sDEVICE=pdfwrite".into());
                args.push(format!("-dCompatibilityLevel={}", self.cfg.ghostscript.compatibility_level).into());
                args.push(format!("-dPDFSETTINGS={pdf_settings}").into());
                for kind in ["Color", "Gray", "Mono"] {
                    args.push(format!("-dDownsample{kind}Images=true").into());
                    args.push(format!("-d{kind}ImageResolution={resolution_dpi}").into());
                    args.push(format!("-d{kind}ImageDownsampleThreshold=1.0").into());
                }
                args.push("-dColorImageDownsampleType=/Bicubic".into());
                args.push("-dGrayImageDownsampleType=/Bicubic".into());
                args.push("-dDetectDuplicateImages=true".into());
            }
            Preset::Raster {
                device,
                resolution_dpi,
                jpeg_quality,
            } => {
                args.push(format!("-sDEVICE={device}").into());
                args.push(format!("-r{resolution_dpi}").into());
                args.push("-sCompression=JPEG".into());
                args.push(format!("-dJPEGQ={jpeg_quality}").into());
            }
        }
        for flag in ["-dNOPAUSE", "-dQUIET", "-dBATCH", "-dSAFER"] {
            args.push(flag.into());
        }
        for extra in &self.cfg.ghostscript.extra_args {
            args.push(extra.into());
        }
        let mut out_arg = OsString::from("-sOutputFile=");
        out_arg.push(output.as_os_str());
        args.push(out_arg);
        args.push(input.as_os_str().to_os_string());
        args
    }

    fn run(&self, preset: &Preset, input: &Path, output: &Path) -> Result<()> {
        let args = self.build_args(preset, input, output);
        let timeout = match self.cfg.ghostscript.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        debug!("gs run preset={} output={} timeout={:?}", preset.label(), output.display(), timeout);

        let mut cmd = Command::new(&self.exe);
        cmd.args(&args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.cfg.ghostscript.env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(|e| EngineError::ExternalToolFailure {
            tool: TOOL.into(),
            tier: preset.label(),
            detail: format!("spawning {}: {e}", self.exe.display()),
        })?;

        let output_res = match timeout {
            Some(t) => wait_with_timeout(&mut child, t),
            None => child
                .wait_with_output()
                .io_context(|| "waiting for ghostscript"),
        };
        let out = output_res.map_err(|e| match e {
            EngineError::ExternalToolFailure { tool, detail, .. } => {
                EngineError::ExternalToolFailure {
                    tool,
                    tier: preset.label(),
                    detail,
                }
            }
            other => other,
        })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(EngineError::ExternalToolFailure {
                tool: TOOL.into(),
                tier: preset.label(),
                detail: format!("{}: {}", out.status, stderr.trim()),
            });
        }

        if self.cfg.debug.keep_tool_stderr && !out.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            debug!("gs stderr {}: {}", preset.label(), stderr.trim());
        }
        Ok(())
    }
}

impl CompressionBackend for GhostscriptEngine {
    fn compress(&self, input: &Path, preset: &Preset, output: &Path) -> Result<()> {
        if matches!(preset, Preset::Raster { .. }) {
            return Err(EngineError::InvalidParameter(
                "raster preset passed to compress".into(),
            ));
        }
        self.run(preset, input, output)
    }
}

impl Rasterizer for GhostscriptEngine {
    fn rasterize_and_reassemble(&self, input: &Path, preset: &Preset, output: &Path) -> Result<()> {
        if !matches!(preset, Preset::Raster { .. }) {
            return Err(EngineError::InvalidParameter(
                "rasterize needs a raster preset".into(),
            ));
        }
        self.run(preset, input, output)
    }
}

fn resolve_gs_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("GHOSTSCRIPT") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from(if cfg!(windows) { "gswin64c" } else { "gs" });
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a chatty gs can't block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let join = |h: std::thread::JoinHandle<std::io::Result<Vec<u8>>>, what: &str| {
        h.join()
            .map_err(|_| EngineError::io(what, std::io::Error::other("reader thread panicked")))?
            .io_context(|| what.to_string())
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().io_context(|| "try_wait")? {
            let stdout = join(stdout_thread, "read stdout")?;
            let stderr = join(stderr_thread, "read stderr")?;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("ghostscript timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().io_context(|| "wait after kill")?;
            let _ = join(stdout_thread, "read stdout");
            let stderr = join(stderr_thread, "read stderr").unwrap_or_default();
            return Err(EngineError::ExternalToolFailure {
                tool: TOOL.into(),
                tier: String::new(),
                detail: format!(
                    "exceeded timeout ({:?}); stderr: {}",
                    timeout,
                    String::from_utf8_lossy(&stderr).trim()
                ),
            });
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
