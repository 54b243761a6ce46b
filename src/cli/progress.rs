//! Terminal progress rendering for job updates

use crate::batch::{Phase, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Render updates until every reporter is dropped
///
/// A new bar is started when the phase changes.
pub fn spawn_renderer(mut updates: UnboundedReceiver<ProgressUpdate>, quiet: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current: Option<(Phase, ProgressBar)> = None;

        while let Some(update) = updates.recv().await {
            let needs_new = current
                .as_ref()
                .map_or(true, |(phase, _)| *phase != update.phase);
            if needs_new {
                if let Some((_, bar)) = current.take() {
                    bar.finish();
                }
                current = Some((update.phase, create_progress_bar(update.phase, quiet)));
            }

            if let Some((_, bar)) = &current {
                bar.set_length(update.total_count as u64);
                bar.set_position(update.processed_count as u64);
                bar.set_message(update.current_label);
            }
        }

        if let Some((_, bar)) = current {
            bar.finish();
        }
    })
}

fn create_progress_bar(phase: Phase, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let prefix = match phase {
        Phase::Generate => "generate",
        Phase::Apply => "apply",
    };
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{prefix:>8} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb.set_prefix(prefix);
    pb
}
