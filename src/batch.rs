use crate::config::RunConfig;
use crate::encode::{self, ConversionOutcome};
use crate::media::MediaItem;
use crate::plan::ConversionPlan;
use crate::probe;
use crate::select::{self, LinePrompt};
use anyhow::{Result, bail};

/// Drive the whole batch: resolve every selection interactively first,
/// then invoke the encoder one movie at a time, then report.
pub fn run_batch(cfg: &RunConfig, prompt: &mut dyn LinePrompt) -> Result<()> {
    let mut queue: Vec<(MediaItem, ConversionPlan)> = Vec::new();
    for item in &cfg.movies {
        println!("\n=== {} ===", item.fully_qualified_name(false));
        let container = probe::probe_container(&cfg.tools.ffprobe, &item.path)?;
        let audio = select::choose_audio(&container.audio_streams, prompt)?;
        let subtitle = select::choose_subtitle(&container.subtitle_streams, prompt)?;
        let plan = ConversionPlan::new(container, audio, subtitle);
        queue.push((item.clone(), plan));
    }

    let total = queue.len();
    let mut failures: Vec<(&MediaItem, ConversionOutcome)> = Vec::new();
    for (i, (item, plan)) in queue.iter().enumerate() {
        let outcome = encode::run_conversion(
            &cfg.tools.ffmpeg,
            plan,
            item,
            &cfg.output_dir,
            i + 1,
            total,
        )?;
        if !outcome.successful {
            failures.push((item, outcome));
        }
    }

    if failures.is_empty() {
        println!("Converted {total} movie(s).");
        return Ok(());
    }
    for (item, outcome) in &failures {
        eprintln!("\n{} failed:", item.fully_qualified_name(false));
        eprintln!("{}", outcome.stderr.trim_end());
    }
    bail!("{} of {} conversion(s) failed", failures.len(), total);
}
