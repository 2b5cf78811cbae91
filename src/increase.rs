use crate::error::{EngineError, IoContext, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TAIL_WINDOW: u64 = 1024;
const FILL: u8 = b' ';
/// Longest line a PDF writer should emit, end-of-line marker included.
const MAX_LINE: u64 = 255;
const COMMENT_LEAD: &[u8] = b"\n%";

#[derive(Debug, Clone)]
pub struct Padded {
    pub artifact: PathBuf,
    pub size_bytes: u64,
    pub padded_bytes: u64,
}

/// Bytes to append: `comment` bytes of `%` lines, then `fill` plain filler
/// bytes, then `suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingLayout {
    pub comment: u64,
    pub fill: u64,
    pub suffix: Vec<u8>,
}

impl PaddingLayout {
    pub fn len(&self) -> u64 {
        self.comment + self.fill + self.suffix.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick a layout adding exactly `gap` bytes given the file's last bytes.
    ///
    /// PDFs get the filler as comment lines followed by a repeat of the
    /// `startxref`/`%%EOF` trailer, so the existing xref keeps its offsets and
    /// stays reachable from the end of the file.
    pub fn plan(tail: &[u8], gap: u64) -> PaddingLayout {
        let plain = PaddingLayout {
            comment: 0,
            fill: gap,
            suffix: Vec::new(),
        };
        let Some(offset) = find_startxref(tail) else {
            return plain;
        };
        let suffix = format!("\nstartxref\n{offset}\n%%EOF\n").into_bytes();
        let overhead = (COMMENT_LEAD.len() + suffix.len()) as u64;
        if gap < overhead {
            // Too small for a second trailer; trailing whitespace stays inside
            // the reader's tail window.
            return plain;
        }
        PaddingLayout {
            comment: gap - suffix.len() as u64,
            fill: 0,
            suffix,
        }
    }
}

/// Write exactly `bytes` bytes as `\n%...` lines no longer than [`MAX_LINE`].
/// `bytes` must be 0 or at least the length of one empty comment line.
pub fn write_comment_lines<W: Write>(w: &mut W, bytes: u64) -> std::io::Result<()> {
    if bytes == 0 {
        return Ok(());
    }
    let lead = COMMENT_LEAD.len() as u64;
    let lines = bytes.div_ceil(MAX_LINE);
    let mut fill = bytes - lines * lead;
    let line = [FILL; MAX_LINE as usize];
    for _ in 0..lines {
        let n = fill.min(MAX_LINE - lead);
        w.write_all(COMMENT_LEAD)?;
        w.write_all(&line[..n as usize])?;
        fill -= n;
    }
    Ok(())
}

/// Offset named by the last `startxref` keyword in `tail`.
pub fn find_startxref(tail: &[u8]) -> Option<u64> {
    const KEY: &[u8] = b"startxref";
    let pos = tail.windows(KEY.len()).rposition(|w| w == KEY)?;
    let rest = &tail[pos + KEY.len()..];
    let digits: Vec<u8> = rest
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_digit())
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}

/// Copy `source` into `scratch` and pad it up to `target` bytes.
///
/// A target at or below the current size yields an unmodified copy. With
/// `verify`, a source that parses as a PDF must still parse after padding.
pub fn increase(scratch: &Path, source: &Path, target: u64, verify: bool) -> Result<Padded> {
    let artifact = scratch.join("increased.pdf");
    let size = std::fs::copy(source, &artifact)
        .io_context(|| format!("copy {} into scratch", source.display()))?;

    if target <= size {
        info!("target {target} <= size {size}; returning unmodified copy");
        return Ok(Padded {
            artifact,
            size_bytes: size,
            padded_bytes: 0,
        });
    }

    let tail = read_tail(&artifact, size)?;
    let layout = PaddingLayout::plan(&tail, target - size);
    debug!(
        "padding layout comment={} fill={} suffix={}",
        layout.comment,
        layout.fill,
        layout.suffix.len()
    );
    append_layout(&artifact, &layout)?;

    let size_bytes = std::fs::metadata(&artifact)
        .io_context(|| "stat padded artifact")?
        .len();
    if size_bytes != target {
        return Err(EngineError::InvalidArtifact(format!(
            "padded size {size_bytes} != target {target}"
        )));
    }

    if verify {
        verify_structure(source, &artifact)?;
    }

    info!("padded {} -> {} bytes", size, size_bytes);
    Ok(Padded {
        artifact,
        size_bytes,
        padded_bytes: layout.len(),
    })
}

fn read_tail(path: &Path, size: u64) -> Result<Vec<u8>> {
    let mut f = File::open(path).io_context(|| format!("open {}", path.display()))?;
    let start = size.saturating_sub(TAIL_WINDOW);
    f.seek(SeekFrom::Start(start)).io_context(|| "seek tail")?;
    let mut buf = Vec::with_capacity((size - start) as usize);
    f.read_to_end(&mut buf).io_context(|| "read tail")?;
    Ok(buf)
}

fn append_layout(path: &Path, layout: &PaddingLayout) -> Result<()> {
    let f = OpenOptions::new()
        .append(true)
        .open(path)
        .io_context(|| format!("open {} for append", path.display()))?;
    let mut w = BufWriter::new(f);
    write_comment_lines(&mut w, layout.comment).io_context(|| "write padding")?;

    let chunk = [FILL; 64 * 1024];
    let mut left = layout.fill;
    while left > 0 {
        let n = left.min(chunk.len() as u64) as usize;
        w.write_all(&chunk[..n]).io_context(|| "write padding")?;
        left -= n as u64;
    }

    w.write_all(&layout.suffix).io_context(|| "write padding")?;
    w.flush().io_context(|| "flush padding")?;
    Ok(())
}

fn verify_structure(source: &Path, padded: &Path) -> Result<()> {
    if let Err(e) = lopdf::Document::load(source) {
        warn!("source does not parse as PDF ({e}); skipping structural check");
        return Ok(());
    }
    let doc = lopdf::Document::load(padded)
        .map_err(|e| EngineError::InvalidArtifact(format!("{}: {e}", padded.display())))?;
    debug!("padded artifact parses; pages={}", doc.get_pages().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_last_startxref() {
        let tail = b"xref\n...\nstartxref\n123\n%%EOF\nstartxref\r\n4567\n%%EOF\n";
        assert_eq!(find_startxref(tail), Some(4567));
        assert_eq!(find_startxref(b"no trailer here"), None);
    }

    #[test]
    fn layout_repeats_trailer_when_gap_is_large() {
        let tail = b"trailer\n<<>>\nstartxref\n900\n%%EOF\n";
        let layout = PaddingLayout::plan(tail, 1000);
        assert_eq!(layout.len(), 1000);
        assert_eq!(layout.fill, 0);
        assert_eq!(layout.comment, 1000 - layout.suffix.len() as u64);
        assert!(layout.suffix.ends_with(b"startxref\n900\n%%EOF\n"));
    }

    #[test]
    fn layout_falls_back_to_plain_fill() {
        let tail = b"startxref\n900\n%%EOF\n";
        let small = PaddingLayout::plan(tail, 5);
        assert_eq!(small.len(), 5);
        assert!(small.comment == 0 && small.suffix.is_empty());

        let not_pdf = PaddingLayout::plan(b"hello", 4096);
        assert_eq!(not_pdf.fill, 4096);
    }

    #[test]
    fn comment_lines_are_exact_and_short() {
        for bytes in [2u64, 3, 255, 256, 257, 510, 511, 100_000] {
            let mut buf = Vec::new();
            write_comment_lines(&mut buf, bytes).unwrap();
            assert_eq!(buf.len() as u64, bytes, "size {bytes}");
            for line in buf[1..].split(|&b| b == b'\n') {
                assert_eq!(line.first(), Some(&b'%'), "size {bytes}");
                assert!(line.len() < MAX_LINE as usize, "size {bytes}");
            }
        }
    }
}
