//! Log formatting and output with ANSI colors
//!
//! Handles:
//! - Colorized console output with tag and level columns
//! - Continuation lines for multi-line messages
//! - Dual output (console + optional file)
//! - Broken pipe handling for piped commands

use super::config::get_logger_config;
use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Log format widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 8;

/// Format and output a log message
pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str) {
    let config = get_logger_config();
    let now = Local::now();
    let tag_plain = tag.to_plain_string();

    if config.console {
        let time = now.format("%H:%M:%S").to_string();
        let (time_str, tag_str, level_str) = if config.colors {
            (
                time.dimmed().to_string(),
                format_tag(tag).to_string(),
                format_level(level).to_string(),
            )
        } else {
            (
                time,
                format!("{:<width$}", tag_plain, width = TAG_WIDTH),
                format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH),
            )
        };

        let prefix = format!("{} [{}] [{}] ", time_str, tag_str, level_str);
        let continuation = " ".repeat(strip_ansi_codes(&prefix).len());

        for (index, line) in message.lines().enumerate() {
            if index == 0 {
                print_stdout_safe(&format!("{}{}", prefix, line));
            } else {
                print_stdout_safe(&format!("{}{}", continuation, line));
            }
        }
        if message.is_empty() {
            print_stdout_safe(&prefix);
        }
    }

    if config.log_file.is_some() {
        let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
        for line in message.lines() {
            write_to_file(&format!(
                "{} [{}] [{}] {}",
                timestamp,
                tag_plain,
                level.as_str(),
                line
            ));
        }
    }
}

/// Format a tag with its color
fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Api => label.bright_purple().bold(),
        LogTag::Cache => label.bright_cyan().bold(),
        LogTag::RateLimit => label.bright_red().bold(),
        LogTag::Retry => label.yellow().bold(),
        LogTag::PriceService => label.bright_green().bold(),
        LogTag::Metrics => label.bright_blue().bold(),
        LogTag::Health => label.bright_magenta().bold(),
        LogTag::Events => label.cyan().bold(),
    }
}

/// Format log level with its color
fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Info => label.white().bold(),
        LogLevel::Debug => label.bright_black(),
        LogLevel::Verbose => label.dimmed(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    if let Err(e) = writeln!(stdout(), "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
}

/// Remove ANSI color codes from text
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;

    for ch in text.chars() {
        if ch == '\x1b' {
            in_escape = true;
        } else if in_escape && ch == 'm' {
            in_escape = false;
        } else if !in_escape {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        let colored = "\x1b[1;32mPRICE\x1b[0m ok";
        assert_eq!(strip_ansi_codes(colored), "PRICE ok");
        assert_eq!(strip_ansi_codes("plain"), "plain");
    }
}
