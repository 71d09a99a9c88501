use crate::media::MediaItem;
use crate::plan::ConversionPlan;
use crate::progress::{ProgressTracker, pump_progress};
use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// Fixed global flags: no banner, warning-level log only, no periodic
/// stats, machine-readable progress on stdout, overwrite outputs.
pub const ENCODER_GLOBAL_ARGS: &[&str] = &[
    "-hide_banner",
    "-loglevel",
    "warning",
    "-nostats",
    "-progress",
    "-",
    "-y",
];

/// Terminal result of one conversion, produced after the encoder exits.
#[derive(Debug)]
pub struct ConversionOutcome {
    pub successful: bool,
    pub stderr: String,
}

/// Spawn the encoder for one planned conversion and drain both of its
/// channels until it terminates. Progress is shown as a spinner line that
/// only moves when the rounded percentage does; stderr is accumulated in
/// full for the failure report.
pub fn run_conversion(
    ffmpeg: &Path,
    plan: &ConversionPlan,
    item: &MediaItem,
    output_root: &Path,
    current: usize,
    total: usize,
) -> Result<ConversionOutcome> {
    let destination_dir = plan.destination_dir(output_root, item);
    fs::create_dir_all(&destination_dir).with_context(|| {
        format!(
            "failed to create destination {}",
            destination_dir.display()
        )
    })?;

    let mut cmd = Command::new(ffmpeg);
    cmd.args(ENCODER_GLOBAL_ARGS);
    cmd.args(plan.encoder_args(&item.path, output_root, item));

    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to spawn ffmpeg")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("failed to capture ffmpeg stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("failed to capture ffmpeg stderr"))?;

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_strings(&["-", "\\", "|", "/"]),
    );
    let label = format!("[{current} / {total}] {}", item.fully_qualified_name(false));
    spinner.set_message(label.clone());

    let tracker = ProgressTracker::new(label, plan.duration_seconds);
    let progress_thread = pump_progress(stdout, spinner.clone(), tracker);
    let stderr_thread = thread::spawn(move || {
        let mut diagnostics = String::new();
        let mut stderr = stderr;
        let _ = stderr.read_to_string(&mut diagnostics);
        diagnostics
    });

    let status = child.wait().context("failed to wait for ffmpeg")?;
    let _ = progress_thread.join();
    let stderr = stderr_thread.join().unwrap_or_default();
    spinner.finish();

    Ok(ConversionOutcome {
        successful: status.success(),
        stderr,
    })
}
