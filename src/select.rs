use crate::probe::{AudioStream, SubtitleStream};
use anyhow::{Result, bail};
use dialoguer::{Input, theme::ColorfulTheme};

/// Codecs that carry text subtitles and can be extracted to .srt.
pub const TEXT_SUBTITLE_CODECS: &[&str] =
    &["ass", "mov_text", "srt", "ssa", "subrip", "text", "webvtt"];

pub fn is_text_subtitle(codec: &str) -> bool {
    TEXT_SUBTITLE_CODECS.contains(&codec)
}

/// Blocking "ask a question, get the trimmed answer" primitive.
/// Injectable so tests can script the answers.
pub trait LinePrompt {
    fn ask(&mut self, question: &str) -> Result<String>;
}

pub struct ConsolePrompt {
    theme: ColorfulTheme,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl LinePrompt for ConsolePrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        let raw: String = Input::with_theme(&self.theme)
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()?;
        Ok(raw.trim().to_string())
    }
}

fn language_or_unknown(language: Option<&str>) -> &str {
    language.unwrap_or("???")
}

/// Resolve exactly one audio stream. Invalid input reprompts indefinitely.
pub fn choose_audio(
    streams: &[AudioStream],
    prompt: &mut dyn LinePrompt,
) -> Result<AudioStream> {
    if streams.is_empty() {
        bail!("container has no audio streams to select from");
    }
    println!("Audio streams:");
    for stream in streams {
        let title = stream
            .title
            .as_deref()
            .map(|t| format!(" \"{t}\""))
            .unwrap_or_default();
        println!(
            "  [{}] {} {} {}{}",
            stream.index,
            language_or_unknown(stream.language.as_deref()),
            stream.codec,
            stream.channel_layout,
            title
        );
    }
    loop {
        let answer = prompt.ask("Audio stream index to keep")?;
        if let Ok(index) = answer.parse::<u32>()
            && let Some(stream) = streams.iter().find(|s| s.index == index)
        {
            return Ok(stream.clone());
        }
        println!("`{answer}` does not match an audio stream index, try again.");
    }
}

/// Resolve zero or one subtitle stream. Only text-based subtitles are
/// rendered, but a typed index is looked up in the full catalog. Empty
/// answer means an external subtitle file is needed.
pub fn choose_subtitle(
    streams: &[SubtitleStream],
    prompt: &mut dyn LinePrompt,
) -> Result<Option<SubtitleStream>> {
    println!("Text subtitle streams:");
    for stream in streams.iter().filter(|s| is_text_subtitle(&s.codec)) {
        let title = stream
            .title
            .as_deref()
            .map(|t| format!(" \"{t}\""))
            .unwrap_or_default();
        println!(
            "  [{}] {} {}{}",
            stream.index,
            language_or_unknown(stream.language.as_deref()),
            stream.codec,
            title
        );
    }
    loop {
        let answer = prompt.ask("Subtitle stream index to keep (empty = external file)")?;
        if answer.is_empty() {
            return Ok(None);
        }
        if let Ok(index) = answer.parse::<u32>()
            && let Some(stream) = streams.iter().find(|s| s.index == index)
        {
            return Ok(Some(stream.clone()));
        }
        println!("`{answer}` does not match a subtitle stream index, try again.");
    }
}
