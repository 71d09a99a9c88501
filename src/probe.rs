use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("malformed ffprobe output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("container duration is missing or not numeric")]
    Duration,
}

/// One audio track as catalogued from the prober.
#[derive(Debug, Clone)]
pub struct AudioStream {
    pub index: u32,
    pub codec: String,
    pub language: Option<String>,
    pub title: Option<String>,
    /// Disposition flags reported true by the prober, "default" excluded.
    pub dispositions: Vec<String>,
    pub channel_layout: String,
}

/// One subtitle track as catalogued from the prober.
#[derive(Debug, Clone)]
pub struct SubtitleStream {
    pub index: u32,
    pub codec: String,
    pub language: Option<String>,
    pub title: Option<String>,
    pub dispositions: Vec<String>,
}

/// Full probe result for one container. Computed once, consumed by selection.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub duration_seconds: f64,
    pub audio_streams: Vec<AudioStream>,
    pub subtitle_streams: Vec<SubtitleStream>,
}

#[derive(Debug, Deserialize)]
struct RawProbe {
    format: RawFormat,
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    index: u32,
    codec_type: String,
    codec_name: Option<String>,
    channels: Option<u32>,
    channel_layout: Option<String>,
    #[serde(default)]
    disposition: BTreeMap<String, i32>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

impl RawStream {
    fn tag(&self, key: &str) -> Option<String> {
        self.tags.get(key).cloned()
    }

    /// Flags reported true, excluding "default": which stream is default is
    /// re-derived by the planner, never trusted from the source.
    fn active_dispositions(&self) -> Vec<String> {
        self.disposition
            .iter()
            .filter(|(key, value)| key.as_str() != "default" && **value != 0)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Probe a container with ffprobe, blocking until it returns.
pub fn probe_container(ffprobe: &Path, input: &Path) -> Result<ContainerInfo> {
    let out = Command::new(ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(input)
        .output()
        .context("failed to run ffprobe")?;
    if !out.status.success() {
        bail!(
            "ffprobe error (status {}): {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    let raw = String::from_utf8_lossy(&out.stdout);
    Ok(parse_probe_output(&raw)?)
}

/// Parse raw ffprobe JSON into the stream catalog.
pub fn parse_probe_output(raw: &str) -> Result<ContainerInfo, ProbeError> {
    let probe: RawProbe = serde_json::from_str(raw)?;
    let duration_seconds = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or(ProbeError::Duration)?;

    let mut audio_streams = Vec::new();
    let mut subtitle_streams = Vec::new();
    for stream in probe.streams {
        match stream.codec_type.as_str() {
            "audio" => audio_streams.push(AudioStream {
                index: stream.index,
                codec: stream.codec_name.clone().unwrap_or_default(),
                language: stream.tag("language"),
                title: stream.tag("title"),
                dispositions: stream.active_dispositions(),
                channel_layout: stream.channel_layout.clone().unwrap_or_else(|| {
                    match stream.channels {
                        Some(n) => format!("{n}ch"),
                        None => "unknown".into(),
                    }
                }),
            }),
            "subtitle" => subtitle_streams.push(SubtitleStream {
                index: stream.index,
                codec: stream.codec_name.clone().unwrap_or_default(),
                language: stream.tag("language"),
                title: stream.tag("title"),
                dispositions: stream.active_dispositions(),
            }),
            _ => {}
        }
    }

    Ok(ContainerInfo {
        duration_seconds,
        audio_streams,
        subtitle_streams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_type": "video",
                "codec_name": "h264",
                "disposition": {"default": 1, "attached_pic": 0}
            },
            {
                "index": 1,
                "codec_type": "audio",
                "codec_name": "dts",
                "channels": 6,
                "channel_layout": "5.1",
                "disposition": {"default": 1, "forced": 0, "dub": 0},
                "tags": {"language": "eng", "title": "Surround"}
            },
            {
                "index": 2,
                "codec_type": "audio",
                "codec_name": "ac3",
                "channels": 2,
                "disposition": {"default": 0, "comment": 1},
                "tags": {"language": "ger"}
            },
            {
                "index": 3,
                "codec_type": "subtitle",
                "codec_name": "subrip",
                "disposition": {"default": 1, "forced": 1, "hearing_impaired": 1},
                "tags": {"language": "eng"}
            }
        ],
        "format": {"duration": "5400.04"}
    }"#;

    #[test]
    fn test_catalog_splits_streams_in_prober_order() {
        let info = parse_probe_output(SAMPLE).unwrap();
        assert!((info.duration_seconds - 5400.04).abs() < 1e-9);
        assert_eq!(info.audio_streams.len(), 2);
        assert_eq!(info.subtitle_streams.len(), 1);
        assert_eq!(info.audio_streams[0].index, 1);
        assert_eq!(info.audio_streams[1].index, 2);
        assert_eq!(info.subtitle_streams[0].index, 3);
    }

    #[test]
    fn test_tags_and_channel_layout() {
        let info = parse_probe_output(SAMPLE).unwrap();
        let first = &info.audio_streams[0];
        assert_eq!(first.codec, "dts");
        assert_eq!(first.language.as_deref(), Some("eng"));
        assert_eq!(first.title.as_deref(), Some("Surround"));
        assert_eq!(first.channel_layout, "5.1");

        let second = &info.audio_streams[1];
        assert_eq!(second.language.as_deref(), Some("ger"));
        assert_eq!(second.title, None);
        assert_eq!(second.channel_layout, "2ch");
    }

    #[test]
    fn test_default_disposition_is_always_discarded() {
        let info = parse_probe_output(SAMPLE).unwrap();
        assert!(info.audio_streams[0].dispositions.is_empty());
        assert_eq!(info.audio_streams[1].dispositions, vec!["comment"]);
        let sub = &info.subtitle_streams[0];
        assert!(!sub.dispositions.contains(&"default".to_string()));
        assert_eq!(sub.dispositions, vec!["forced", "hearing_impaired"]);
    }

    #[test]
    fn test_missing_duration_is_an_error() {
        let raw = r#"{"streams": [], "format": {}}"#;
        assert!(matches!(
            parse_probe_output(raw),
            Err(ProbeError::Duration)
        ));

        let raw = r#"{"streams": [], "format": {"duration": "N/A"}}"#;
        assert!(matches!(
            parse_probe_output(raw),
            Err(ProbeError::Duration)
        ));
    }

    #[test]
    fn test_malformed_output_is_an_error() {
        assert!(matches!(
            parse_probe_output("not json at all"),
            Err(ProbeError::Malformed(_))
        ));
    }
}
