//! CLI-specific progress handling for butterfly-network
//!
//! Renders builder progress events as a stage progress bar.

use butterfly_network::BuildProgress;
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a progress bar counting build stages
pub fn create_progress_bar(total_stages: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_stages);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Progress manager for a network build
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager; the stage count is set once known
    pub fn new(message: &str) -> Self {
        let pb = create_progress_bar(0);

        // Print initial message to stderr
        eprintln!("{}", message);

        Self { pb }
    }

    /// Callback to hand to [`NetworkBuilder::on_progress`](butterfly_network::NetworkBuilder::on_progress)
    pub fn callback(&self) -> impl FnMut(BuildProgress) + 'static {
        let pb = self.pb.clone();
        move |event| update(&pb, event)
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

fn update(pb: &ProgressBar, event: BuildProgress) {
    match event {
        BuildProgress::FirstPass => {
            pb.set_message("pass 1: classifying nodes");
        }
        BuildProgress::Stage { index, count } => {
            pb.set_length(count as u64);
            pb.set_position(index as u64);
            pb.set_message(format!("pass 2: stage {}/{}", index + 1, count));
        }
        BuildProgress::Done => {
            if let Some(len) = pb.length() {
                pb.set_position(len);
            }
            pb.set_message("done");
        }
    }
}
