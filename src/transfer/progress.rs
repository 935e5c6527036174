// 进度显示
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::Cell;
use std::time::{Duration, Instant};

pub struct ProgressTracker {
    progress_bar: ProgressBar,
    transferred_bytes: Cell<u64>,
    start_time: Instant,
    last_update_time: Cell<Instant>,
    last_bytes: Cell<u64>,
}

impl ProgressTracker {
    pub fn new(total_size: u64, description: &str) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
        {
            progress_bar.set_style(style.progress_chars("#>-"));
        }
        progress_bar.set_message(description.to_string());
        Self::with_bar(progress_bar)
    }

    /// A tracker that records progress without drawing anything.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    pub fn for_copy(total_size: u64, description: &str, quiet: bool) -> Self {
        if quiet {
            Self::hidden()
        } else {
            Self::new(total_size, description)
        }
    }

    fn with_bar(progress_bar: ProgressBar) -> Self {
        let now = Instant::now();
        Self {
            progress_bar,
            transferred_bytes: Cell::new(0),
            start_time: now,
            last_update_time: Cell::new(now),
            last_bytes: Cell::new(0),
        }
    }

    pub fn update(&self, bytes_transferred: u64) {
        self.transferred_bytes.set(bytes_transferred);
        self.progress_bar.set_position(bytes_transferred);
        self.update_speed(bytes_transferred);
    }

    #[cfg(test)]
    pub fn transferred(&self) -> u64 {
        self.transferred_bytes.get()
    }

    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        let total = self.transferred_bytes.get();

        let avg_speed = if elapsed.as_secs() > 0 {
            total / elapsed.as_secs()
        } else {
            total
        };

        self.progress_bar
            .finish_with_message(format!("Transfer completed (avg speed: {})", format_speed(avg_speed)));
    }

    pub fn finish_with_error(&self, error: &str) {
        self.progress_bar.abandon_with_message(format!("Transfer failed: {}", error));
    }

    // 每200ms更新一次速度，避免太频繁刷新
    fn update_speed(&self, current_bytes: u64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update_time.get());

        if elapsed >= Duration::from_millis(200) {
            let bytes_diff = current_bytes.saturating_sub(self.last_bytes.get());
            let speed = (bytes_diff as f64 / elapsed.as_secs_f64()) as u64;
            self.progress_bar.set_message(format_speed(speed));

            self.last_update_time.set(now);
            self.last_bytes.set(current_bytes);
        }
    }
}

fn format_speed(bytes_per_sec: u64) -> String {
    if bytes_per_sec < 1024 {
        format!("{} B/s", bytes_per_sec)
    } else if bytes_per_sec < 1024 * 1024 {
        format!("{:.2} KB/s", bytes_per_sec as f64 / 1024.0)
    } else if bytes_per_sec < 1024 * 1024 * 1024 {
        format!("{:.2} MB/s", bytes_per_sec as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB/s", bytes_per_sec as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
