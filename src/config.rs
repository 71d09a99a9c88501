use crate::media::MediaItem;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use which::which;

/// Resolved external binaries.
#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Configuration document as written by the operator.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawConfig {
    /// Path to ffmpeg (null = PATH lookup)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    /// Path to ffprobe (null = PATH lookup)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub movies: Vec<MediaItem>,
}

/// Fully validated run configuration; nothing here is re-checked later.
#[derive(Debug)]
pub struct RunConfig {
    pub tools: Tools,
    pub output_dir: PathBuf,
    pub movies: Vec<MediaItem>,
}

pub fn load(path: &Path) -> Result<RunConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read configuration {}", path.display()))?;
    let raw: RawConfig = serde_json::from_str(&text)
        .with_context(|| format!("malformed configuration {}", path.display()))?;
    raw.into_run_config()
}

impl RawConfig {
    /// Validate everything up front; every problem ends up in one message.
    pub fn into_run_config(self) -> Result<RunConfig> {
        let mut problems = Vec::new();
        if !self.output_dir.is_dir() {
            problems.push(format!(
                "output directory {} does not exist",
                self.output_dir.display()
            ));
        }
        if self.movies.is_empty() {
            problems.push("no movies configured".to_string());
        }
        for movie in &self.movies {
            problems.extend(movie.problems());
        }
        let tools = resolve_tools(self.ffmpeg_path, self.ffprobe_path);
        if let Err(err) = &tools {
            problems.push(format!("{err:#}"));
        }
        if !problems.is_empty() {
            bail!("configuration is invalid:\n  - {}", problems.join("\n  - "));
        }
        Ok(RunConfig {
            tools: tools?,
            output_dir: self.output_dir,
            movies: self.movies,
        })
    }

    pub fn skeleton() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            output_dir: PathBuf::from("/path/to/output"),
            movies: vec![MediaItem {
                title: "The Matrix".into(),
                year: 1999,
                path: PathBuf::from("/path/to/the_matrix.mkv"),
            }],
        }
    }
}

/// Write a starter configuration the operator can edit.
pub fn write_skeleton(path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&RawConfig::skeleton())?;
    fs::write(path, text + "\n")
        .with_context(|| format!("cannot write skeleton to {}", path.display()))?;
    println!("Wrote configuration skeleton to {}", path.display());
    Ok(())
}

pub fn resolve_tools(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> Result<Tools> {
    Ok(Tools {
        ffmpeg: resolve_bin(ffmpeg, "ffmpeg")?,
        ffprobe: resolve_bin(ffprobe, "ffprobe")?,
    })
}

fn resolve_bin(bin_opt: Option<PathBuf>, default: &str) -> Result<PathBuf> {
    if let Some(path) = bin_opt {
        if path.is_file() {
            return Ok(path);
        }
        bail!("provided binary not found: {}", path.display());
    }

    which(default)
        .or_else(|_| {
            if cfg!(windows) {
                let exe = format!("{default}.exe");
                which(&exe)
            } else {
                Err(which::Error::CannotFindBinaryPath)
            }
        })
        .with_context(|| format!("`{default}` not found in PATH"))
}
