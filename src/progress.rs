use std::{sync::Arc, time::Duration};

use teloxide::types::{ChatId, MessageId};
use tokio::{sync::mpsc, time::Instant};

use crate::{
    channel::DeliveryChannel,
    errors::EditError,
    video::{ProgressSnapshot, ProgressStatus},
};

pub const DOWNLOAD_FINISHED_TEXT: &str = "✅ Download complete, converting to MP3...";

const UNKNOWN: &str = "N/A";

/// Turns a fast stream of download snapshots into rate-limited edits of one
/// status message. Owned by a single job.
pub struct ProgressReporter<C> {
    channel: Arc<C>,
    chat_id: ChatId,
    message_id: MessageId,
    interval: Duration,
    last_edit: Option<Instant>,
}

impl<C: DeliveryChannel> ProgressReporter<C> {
    pub fn new(channel: Arc<C>, chat_id: ChatId, message_id: MessageId, interval: Duration) -> Self {
        Self {
            channel,
            chat_id,
            message_id,
            interval,
            last_edit: None,
        }
    }

    /// Consumes snapshots until every sender is dropped.
    ///
    /// Download samples that are already superseded by a newer one in the
    /// channel are skipped; status changes are always handled.
    pub async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<ProgressSnapshot>) {
        while let Some(first) = receiver.recv().await {
            let mut latest = first;
            while let Ok(next) = receiver.try_recv() {
                if latest.status != ProgressStatus::Downloading {
                    self.on_snapshot(latest).await;
                }
                latest = next;
            }
            self.on_snapshot(latest).await;
        }
    }

    /// Returns whether an edit was attempted
    pub async fn on_snapshot(&mut self, snapshot: ProgressSnapshot) -> bool {
        match snapshot.status {
            ProgressStatus::Downloading => {
                let now = Instant::now();
                if let Some(last) = self.last_edit {
                    if now.duration_since(last) < self.interval {
                        log::trace!("Dropping progress sample {:?}", snapshot.percent);
                        return false;
                    }
                }
                self.last_edit = Some(now);
                self.edit(&render_progress(&snapshot)).await;
                true
            }
            ProgressStatus::Finished => {
                self.last_edit = Some(Instant::now());
                self.edit(DOWNLOAD_FINISHED_TEXT).await;
                true
            }
            ProgressStatus::Error => {
                log::warn!(
                    "Downloader reported an error for message {} in chat {}",
                    self.message_id,
                    self.chat_id
                );
                false
            }
        }
    }

    async fn edit(&self, text: &str) {
        match self
            .channel
            .edit_text(self.chat_id, self.message_id, text)
            .await
        {
            Ok(()) => {}
            Err(EditError::NotModified) => log::debug!("Progress text unchanged, edit skipped"),
            Err(EditError::Failed(e)) => log::warn!("Failed to update progress message: {}", e),
        }
    }
}

pub fn render_progress(snapshot: &ProgressSnapshot) -> String {
    let percent = snapshot
        .percent
        .map(|p| format!("{:.1}%", p))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let speed = snapshot
        .speed
        .map(format_speed)
        .unwrap_or_else(|| UNKNOWN.to_string());
    let eta = snapshot
        .eta
        .map(format_eta)
        .unwrap_or_else(|| UNKNOWN.to_string());

    format!(
        "⏬ Downloading...\n📈 <b>Progress</b>: <code>{}</code>\n💨 <b>Speed</b>: <code>{}</code>\n⏳ <b>ETA</b>: <code>{}</code>",
        percent, speed, eta
    )
}

fn format_speed(bytes_per_second: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];
    let mut value = bytes_per_second.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

fn format_eta(eta: Duration) -> String {
    let total = eta.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
