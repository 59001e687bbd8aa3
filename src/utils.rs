//! Utility functions

/// Format the stage line shown under the progress bar
///
/// Produces `"<stage>, elapsed <m>m<ss>s"` with seconds zero-padded. Negative
/// or non-finite elapsed times are shown as zero.
///
/// # Examples
///
/// ```
/// use bili2text_monitor::utils::format_stage_text;
///
/// assert_eq!(format_stage_text("Transcribing audio", 125.7), "Transcribing audio, elapsed 2m05s");
/// ```
pub fn format_stage_text(stage_label: &str, elapsed_seconds: f64) -> String {
    let total = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
        elapsed_seconds.floor() as u64
    } else {
        0
    };
    format!(
        "{stage_label}, elapsed {}m{:02}s",
        total / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_stage_text("processing", 0.0), "processing, elapsed 0m00s");
        assert_eq!(format_stage_text("processing", 9.99), "processing, elapsed 0m09s");
        assert_eq!(format_stage_text("processing", 60.0), "processing, elapsed 1m00s");
        assert_eq!(
            format_stage_text("Downloading video", 3725.0),
            "Downloading video, elapsed 62m05s"
        );
    }

    #[test]
    fn invalid_elapsed_time_shows_zero() {
        assert_eq!(format_stage_text("x", -3.0), "x, elapsed 0m00s");
        assert_eq!(format_stage_text("x", f64::NAN), "x, elapsed 0m00s");
        assert_eq!(format_stage_text("x", f64::INFINITY), "x, elapsed 0m00s");
    }

    #[test]
    fn keeps_non_ascii_stage_labels() {
        assert_eq!(format_stage_text("正在转录音频", 61.0), "正在转录音频, elapsed 1m01s");
    }
}
