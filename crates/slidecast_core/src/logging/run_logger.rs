//! Per-run logger with file and callback output.
//!
//! Each assembly run gets its own logger that:
//! - Writes to a dedicated log file
//! - Sends messages to a callback (if provided)
//! - Supports compact mode with progress filtering
//! - Writes the tail of a failed tool's output for error diagnosis
//!
//! Pages may be processed on several workers at once, so every piece of
//! mutable state sits behind a lock and the logger is shared by reference.
//! Tool output is passed in whole per failure rather than buffered, so one
//! page's output never shows up under another page.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{CommandSink, LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-run logger with dual output (file + callback).
pub struct RunLogger {
    run_name: String,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Mutex<Option<LogCallback>>,
    config: LogConfig,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<u32>,
}

impl RunLogger {
    /// Create a logger writing `<log_dir>/<run_name>.log`.
    pub fn new(
        run_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let run_name = run_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&run_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            run_name,
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback: Mutex::new(callback),
            config,
            last_progress: Mutex::new(0),
        })
    }

    /// Create a logger with no log file; messages go to the callback only.
    pub fn callback_only(
        run_name: impl Into<String>,
        config: LogConfig,
        callback: LogCallback,
    ) -> Self {
        Self {
            run_name: run_name.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            callback: Mutex::new(Some(callback)),
            config,
            last_progress: Mutex::new(0),
        }
    }

    /// Log file name for a run started now (`slidecast_20260101_120000`).
    pub fn timestamped_name(prefix: &str) -> String {
        format!("{}_{}", prefix, Local::now().format("%Y%m%d_%H%M%S"))
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Get the log file path, if the logger writes one.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command line being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Debug, &msg);
    }

    /// Sink that records every external command line in this log.
    pub fn command_sink(self: &Arc<Self>) -> CommandSink {
        let logger = Arc::clone(self);
        Arc::new(move |command: &str| logger.command(command))
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a message about one page.
    pub fn page(&self, page_number: u32, message: &str) {
        let msg = MessagePrefix::Page(page_number).format(message);
        self.log(LogLevel::Info, &msg);
    }

    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);

            // Only log at step intervals (e.g., 0%, 20%, 40%, ...)
            let current_step = (percent / step) * step;
            let last_step = (*last / step) * step;

            if current_step <= last_step && percent < 100 {
                return false;
            }
            *last = percent;
        }

        let msg = format!("Progress: {}%", percent);
        self.log(LogLevel::Info, &msg);
        true
    }

    /// Write the last `error_tail` lines of a failed tool's output.
    pub fn tool_output(&self, header: &str, output: &str) {
        let lines: Vec<&str> = output.lines().collect();
        if lines.is_empty() {
            return;
        }
        let skip = lines.len().saturating_sub(self.config.error_tail.max(1));

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in &lines[skip..] {
            self.output(&self.format_message(line));
        }
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run", dir.path(), LogConfig::default(), None).unwrap();

        logger.page(3, "synthesized");
        logger.flush();

        let path = logger.log_path().unwrap().to_path_buf();
        assert!(path.ends_with("run.log"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("[page 3] synthesized"));
    }

    #[test]
    fn level_filters_messages() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let callback: LogCallback = Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger =
            RunLogger::new("run", dir.path(), LogConfig::default(), Some(callback)).unwrap();
        logger.debug("hidden");
        logger.command("ffmpeg -y");
        logger.info("shown");
        logger.warn("shown too");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let logger = RunLogger::callback_only("run", LogConfig::default(), Box::new(|_| {}));

        assert!(!logger.progress(5));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
    }

    #[test]
    fn tool_output_keeps_last_lines() {
        let mut config = LogConfig::default();
        config.error_tail = 3;
        config.show_timestamps = false;
        let lines = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let logger = RunLogger::callback_only(
            "run",
            config,
            Box::new(move |line: &str| sink.lock().push(line.to_string())),
        );

        let output: Vec<String> = (0..6).map(|i| format!("Line {}", i)).collect();
        logger.tool_output("page 2", &output.join("\n"));
        logger.tool_output("page 4", "");

        assert_eq!(
            *lines.lock(),
            vec!["[page 2/tail]", "Line 3", "Line 4", "Line 5"]
        );
    }

    #[test]
    fn command_sink_writes_commands() {
        let dir = tempdir().unwrap();
        let logger =
            Arc::new(RunLogger::new("run", dir.path(), LogConfig::debug(), None).unwrap());

        let sink = logger.command_sink();
        sink("ffprobe -v error page_1.mp3");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("$ ffprobe -v error page_1.mp3"));
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("slidecast_run"), "slidecast_run");
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
    }

    #[test]
    fn timestamped_name_keeps_prefix() {
        assert!(RunLogger::timestamped_name("slidecast").starts_with("slidecast_"));
    }
}
