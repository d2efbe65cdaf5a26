
use indicatif::{ProgressBar, ProgressState, ProgressStyle};

/// Shared function to pull our progress bar styling; the prefix carries the stage label
pub fn get_progress_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {prefix:>18} {bar:40.cyan/blue} {pos}/{len} ({percent}); ETA: {eta_precise}")
        .unwrap_or_else(|_e| ProgressStyle::default_bar())
        .with_key("percent", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}%", state.fraction() * 100.0);
        })
        .progress_chars("##-")
}

/// Builds a labeled bar for `len` items, or a hidden one when progress output is disabled
/// # Arguments
/// * `len` - number of items to process
/// * `label` - short stage label shown left of the bar
/// * `enabled` - if false, nothing is drawn
pub fn stage_progress_bar(len: usize, label: &str, enabled: bool) -> ProgressBar {
    if enabled {
        ProgressBar::new(len as u64)
            .with_style(get_progress_style())
            .with_prefix(label.to_string())
    } else {
        ProgressBar::hidden()
    }
}
