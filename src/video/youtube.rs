use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process,
};

use super::{
    FetchRequest, FetchedAudio, MediaFetcher, MediaInfo, ProgressSender, ProgressSnapshot,
    ProgressStatus,
};
use crate::errors::{BotError, BotResult};

const PROGRESS_PREFIX: &str = "[progress]";
const META_PREFIX: &str = "[meta]";
const FILE_PREFIX: &str = "[file]";

/// Number of stderr lines kept to explain a failure
const STDERR_TAIL: usize = 5;

/// `MediaFetcher` backed by the yt-dlp executable (ffmpeg must be on PATH)
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
    audio_bitrate_kbps: u32,
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    duration: Option<f64>,
}

/// A line of yt-dlp output we care about
#[derive(Debug, Clone, PartialEq)]
enum OutputLine {
    Progress(ProgressSnapshot),
    Meta { duration_seconds: u32, title: String },
    File(PathBuf),
    Other,
}

impl YtDlp {
    pub fn new(binary: impl Into<String>, audio_bitrate_kbps: u32) -> Self {
        Self {
            binary: binary.into(),
            audio_bitrate_kbps,
        }
    }

    fn base_command(&self) -> process::Command {
        let mut cmd = process::Command::new(&self.binary);
        cmd.arg("--no-playlist")
            .args(["--socket-timeout", "15"])
            .kill_on_drop(true);
        cmd
    }

    fn build_audio_command(&self, request: &FetchRequest) -> process::Command {
        let mut cmd = self.base_command();
        cmd.args(["-f", "bestaudio/best"])
            .args(["-x", "--audio-format", "mp3"])
            .args(["--audio-quality", &format!("{}K", self.audio_bitrate_kbps)])
            .args(["--newline", "--progress"])
            .args([
                "--progress-template",
                "download:[progress]%(progress.status)s|%(progress.downloaded_bytes)s|\
                 %(progress.total_bytes,progress.total_bytes_estimate)s|\
                 %(progress.speed)s|%(progress.eta)s",
            ])
            .arg("--no-simulate")
            .args(["--print", "after_move:[meta]%(duration)s|%(title)s"])
            .args(["--print", "after_move:[file]%(filepath)s"])
            .args(["-o", &output_template(&request.output_dir, request.filename.as_deref())])
            .arg(&request.url);
        cmd
    }
}

#[async_trait::async_trait]
impl MediaFetcher for YtDlp {
    async fn probe(&self, url: &str) -> BotResult<MediaInfo> {
        let output = self
            .base_command()
            .args(["--skip-download", "--dump-single-json"])
            .arg(url)
            .output()
            .await
            .map_err(|e| BotError::external_command_error("yt-dlp", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(BotError::fetch_error(summarize_stderr(stderr.lines())));
        }

        parse_info(&output.stdout)
    }

    async fn fetch_audio(
        &self,
        request: FetchRequest,
        progress: ProgressSender,
    ) -> BotResult<FetchedAudio> {
        log::info!(
            "Starting audio download: {} (filename: {:?})",
            request.url, request.filename
        );

        let mut child = self
            .build_audio_command(&request)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BotError::external_command_error("yt-dlp", e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BotError::general("yt-dlp stdout is not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BotError::general("yt-dlp stderr is not captured"))?;

        // Progress lands on stderr once --print makes yt-dlp quiet.
        let stderr_task = tokio::spawn(read_stderr(stderr, progress.clone()));

        let mut meta = None;
        let mut file = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_output_line(&line) {
                OutputLine::Progress(snapshot) => {
                    let _ = progress.send(snapshot);
                }
                OutputLine::Meta {
                    duration_seconds,
                    title,
                } => meta = Some((duration_seconds, title)),
                OutputLine::File(path) => file = Some(path),
                OutputLine::Other => log::debug!("yt-dlp: {}", line),
            }
        }

        let status = child.wait().await?;
        let stderr_tail = stderr_task.await.unwrap_or_default();
        log::info!("yt-dlp exit code: {:?}", status.code());

        if !status.success() {
            let summary = summarize_stderr(stderr_tail.iter().map(String::as_str));
            log::error!("yt-dlp failed: {}", summary);
            return Err(BotError::fetch_error(summary));
        }

        let path = file
            .ok_or_else(|| BotError::fetch_error("yt-dlp did not report the output file"))?;
        let (duration_seconds, title) = meta.unwrap_or_else(|| (0, fallback_title(&path)));

        Ok(FetchedAudio {
            path,
            title,
            duration_seconds,
        })
    }
}

async fn read_stderr(stream: impl AsyncRead + Unpin, progress: ProgressSender) -> Vec<String> {
    let mut tail = Vec::new();
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_output_line(&line) {
            OutputLine::Progress(snapshot) => {
                let _ = progress.send(snapshot);
            }
            _ if line.trim().is_empty() => {}
            _ => {
                if tail.len() == STDERR_TAIL {
                    tail.remove(0);
                }
                tail.push(line);
            }
        }
    }
    tail
}

fn parse_output_line(line: &str) -> OutputLine {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        return parse_progress(rest)
            .map(OutputLine::Progress)
            .unwrap_or(OutputLine::Other);
    }
    if let Some(rest) = line.strip_prefix(META_PREFIX) {
        let (duration, title) = rest.split_once('|').unwrap_or((rest, ""));
        return OutputLine::Meta {
            duration_seconds: parse_field::<f64>(duration).map(|d| d as u32).unwrap_or(0),
            title: title.to_string(),
        };
    }
    if let Some(rest) = line.strip_prefix(FILE_PREFIX) {
        if !rest.is_empty() {
            return OutputLine::File(PathBuf::from(rest));
        }
    }
    OutputLine::Other
}

/// Parses `status|downloaded|total|speed|eta`; missing values come as `NA`
fn parse_progress(fields: &str) -> Option<ProgressSnapshot> {
    let parts: Vec<&str> = fields.split('|').collect();
    if parts.len() != 5 {
        return None;
    }

    let status = match parts[0] {
        "downloading" => ProgressStatus::Downloading,
        "finished" => ProgressStatus::Finished,
        "error" => ProgressStatus::Error,
        _ => return None,
    };

    let downloaded = parse_field::<f64>(parts[1]);
    let total = parse_field::<f64>(parts[2]).filter(|t| *t > 0.0);
    let percent = match (status, downloaded, total) {
        (ProgressStatus::Finished, _, _) => Some(100.0),
        (_, Some(done), Some(total)) => Some(((done / total) * 100.0).clamp(0.0, 100.0) as f32),
        _ => None,
    };

    Some(ProgressSnapshot {
        status,
        percent,
        speed: parse_field::<f64>(parts[3]),
        eta: parse_field::<f64>(parts[4])
            .filter(|s| *s >= 0.0)
            .map(Duration::from_secs_f64),
    })
}

fn parse_field<T: std::str::FromStr>(raw: &str) -> Option<T> {
    match raw.trim() {
        "" | "NA" | "None" => None,
        value => value.parse().ok(),
    }
}

fn output_template(dir: &Path, filename: Option<&str>) -> String {
    let stem = match filename {
        // yt-dlp treats % as a template marker
        Some(name) => name.replace('%', "%%"),
        None => "%(title)s".to_string(),
    };
    dir.join(format!("{}.%(ext)s", stem))
        .to_string_lossy()
        .into_owned()
}

fn fallback_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Audio".to_string())
}

fn summarize_stderr<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<&str> = lines.map(str::trim).filter(|l| !l.is_empty()).collect();
    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        errors.join("\n")
    } else if let Some(last) = lines.last() {
        last.to_string()
    } else {
        "yt-dlp failed without output".to_string()
    }
}

/// Maps `--dump-single-json` output. Live streams report no duration.
fn parse_info(stdout: &[u8]) -> BotResult<MediaInfo> {
    let info: YtDlpInfo = serde_json::from_slice(stdout)?;
    Ok(MediaInfo {
        title: info.title.unwrap_or_else(|| "Audio".to_string()),
        duration_seconds: info.duration.filter(|d| *d >= 0.0).map(|d| d as u32),
    })
}

/// Rejects media longer than `max` seconds, or of unknown length while a
/// limit is set; `None` for `max` means no limit
pub fn check_duration(duration_seconds: Option<u32>, max: Option<u32>) -> BotResult<()> {
    match (duration_seconds, max) {
        (_, None) => Ok(()),
        (None, Some(_)) => Err(BotError::general("Video duration is not available")),
        (Some(duration), Some(max)) if duration > max => {
            Err(BotError::DurationExceeded { duration, max })
        }
        _ => Ok(()),
    }
}

pub fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
