use crate::media::MediaItem;
use crate::probe::{AudioStream, ContainerInfo, SubtitleStream};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Subfolder for outputs whose subtitle is muxed in.
pub const READY_SUBFOLDER: &str = "ready";
/// Subfolder for outputs still waiting on an external subtitle file.
pub const EXTERNAL_SUBTITLE_SUBFOLDER: &str = "external_subtitle_needed";

/// Everything needed to drive one conversion, built once per movie after
/// the operator resolved the track selection. Immutable; argument building
/// is a pure function of this value.
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    pub duration_seconds: f64,
    pub audio_streams: Vec<AudioStream>,
    pub subtitle_streams: Vec<SubtitleStream>,
    pub selected_audio: AudioStream,
    pub selected_subtitle: Option<SubtitleStream>,
}

impl ConversionPlan {
    /// Selections must come from the probed container; anything else is a
    /// programming error.
    pub fn new(
        container: ContainerInfo,
        selected_audio: AudioStream,
        selected_subtitle: Option<SubtitleStream>,
    ) -> Self {
        assert!(
            container
                .audio_streams
                .iter()
                .any(|s| s.index == selected_audio.index),
            "selected audio stream is not part of the container"
        );
        if let Some(subtitle) = &selected_subtitle {
            assert!(
                container
                    .subtitle_streams
                    .iter()
                    .any(|s| s.index == subtitle.index),
                "selected subtitle stream is not part of the container"
            );
        }
        Self {
            duration_seconds: container.duration_seconds,
            audio_streams: container.audio_streams,
            subtitle_streams: container.subtitle_streams,
            selected_audio,
            selected_subtitle,
        }
    }

    pub fn subfolder(&self) -> &'static str {
        if self.selected_subtitle.is_some() {
            READY_SUBFOLDER
        } else {
            EXTERNAL_SUBTITLE_SUBFOLDER
        }
    }

    /// `<output_root>/<subfolder>/<fqn>`, created before invocation.
    pub fn destination_dir(&self, output_root: &Path, item: &MediaItem) -> PathBuf {
        output_root
            .join(self.subfolder())
            .join(item.fully_qualified_name(true))
    }

    pub fn container_destination(&self, output_root: &Path, item: &MediaItem) -> PathBuf {
        self.destination_dir(output_root, item)
            .join(format!("{}.mkv", item.fully_qualified_name(true)))
    }

    /// Sibling .srt target, only when an internal subtitle was selected.
    pub fn subtitle_destination(&self, output_root: &Path, item: &MediaItem) -> Option<PathBuf> {
        self.selected_subtitle.as_ref().map(|subtitle| {
            self.destination_dir(output_root, item).join(format!(
                "{}.{}.srt",
                item.fully_qualified_name(true),
                language_or_unknown(subtitle.language.as_deref())
            ))
        })
    }

    /// Input plus both outputs, in invocation order. Global encoder flags
    /// are owned by the invoker.
    pub fn encoder_args(
        &self,
        input: &Path,
        output_root: &Path,
        item: &MediaItem,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        args.push("-i".into());
        args.push(input.as_os_str().to_os_string());

        // Primary output: full remux with stripped container metadata.
        // 0:V maps every video stream except attached pictures.
        for flag in ["-map_metadata", "-1", "-map_chapters", "-1", "-map", "0:V"] {
            args.push(flag.into());
        }
        args.push("-map".into());
        args.push(format!("0:{}", self.selected_audio.index).into());
        for stream in &self.audio_streams {
            args.push("-map".into());
            args.push(format!("0:{}", stream.index).into());
        }
        for stream in &self.subtitle_streams {
            args.push("-map".into());
            args.push(format!("0:{}", stream.index).into());
        }

        for flag in ["-c", "copy", "-c:a:0", "aac", "-b:a:0", "128k", "-ac:a:0", "2"] {
            args.push(flag.into());
        }

        // Output audio 0: the downmixed duplicate of the selection, always default.
        let selected = &self.selected_audio;
        args.push("-metadata:s:a:0".into());
        args.push(
            format!(
                "title={}",
                synthesize_title(
                    selected.language.as_deref(),
                    "aac",
                    Some("stereo"),
                    selected.title.as_deref()
                )
            )
            .into(),
        );
        if let Some(language) = &selected.language {
            args.push("-metadata:s:a:0".into());
            args.push(format!("language={language}").into());
        }
        args.push("-disposition:a:0".into());
        let default_disposition = disposition_value(&selected.dispositions, true)
            .expect("a forced default disposition is never empty");
        args.push(default_disposition.into());

        // Stream copies of every audio track, never forced default.
        for (i, stream) in self.audio_streams.iter().enumerate() {
            let out = i + 1;
            args.push(format!("-metadata:s:a:{out}").into());
            args.push(
                format!(
                    "title={}",
                    synthesize_title(
                        stream.language.as_deref(),
                        &stream.codec,
                        Some(&stream.channel_layout),
                        stream.title.as_deref()
                    )
                )
                .into(),
            );
            if let Some(language) = &stream.language {
                args.push(format!("-metadata:s:a:{out}").into());
                args.push(format!("language={language}").into());
            }
            if let Some(value) = disposition_value(&stream.dispositions, false) {
                args.push(format!("-disposition:a:{out}").into());
                args.push(value.into());
            }
        }

        for (out, stream) in self.subtitle_streams.iter().enumerate() {
            args.push(format!("-metadata:s:s:{out}").into());
            args.push(
                format!(
                    "title={}",
                    synthesize_title(
                        stream.language.as_deref(),
                        &stream.codec,
                        None,
                        stream.title.as_deref()
                    )
                )
                .into(),
            );
            if let Some(language) = &stream.language {
                args.push(format!("-metadata:s:s:{out}").into());
                args.push(format!("language={language}").into());
            }
            if let Some(value) = disposition_value(&stream.dispositions, false) {
                args.push(format!("-disposition:s:{out}").into());
                args.push(value.into());
            }
        }

        args.push(self.container_destination(output_root, item).into_os_string());

        // Secondary output: verbatim extraction of the selected subtitle.
        if let Some(subtitle) = &self.selected_subtitle {
            args.push("-map".into());
            args.push(format!("0:{}", subtitle.index).into());
            args.push("-c".into());
            args.push("copy".into());
            let destination = self
                .subtitle_destination(output_root, item)
                .expect("subtitle destination exists when a subtitle is selected");
            args.push(destination.into_os_string());
        }

        args
    }
}

fn language_or_unknown(language: Option<&str>) -> &str {
    language.unwrap_or("???")
}

/// `<language or "???"> <codec>` + optional ` <layout>` + optional ` [<title>]`.
fn synthesize_title(
    language: Option<&str>,
    codec: &str,
    channel_layout: Option<&str>,
    original_title: Option<&str>,
) -> String {
    let mut title = format!("{} {}", language_or_unknown(language), codec);
    if let Some(layout) = channel_layout {
        title.push(' ');
        title.push_str(layout);
    }
    if let Some(original) = original_title {
        title.push_str(&format!(" [{original}]"));
    }
    title
}

/// Join flags with "+", prefixing "default" when forced. None when nothing
/// remains, so the argument can be omitted entirely.
fn disposition_value(flags: &[String], force_default: bool) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    if force_default {
        parts.push("default");
    }
    parts.extend(flags.iter().map(String::as_str));
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("+"))
    }
}
