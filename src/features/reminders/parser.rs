//! # Time Expression Parser
//!
//! Turns free-form Russian time phrases into absolute timestamps. Supported
//! forms, tried in order (first match wins):
//!
//! - `через 30 минут`, `через 2 часа`
//! - `сегодня в 18:30`, `завтра в 15:00`
//! - `2024-06-10 14:30`
//! - `10.06.2024 14:30`
//! - `15:45`
//!
//! All functions are pure; the reference instant is supplied by the caller so
//! behavior is deterministic under test.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: `format_time` renders the reminder timestamp in the absolute arm
//! - 1.0.0: Initial implementation

use chrono::{Duration, NaiveDateTime};
use regex::Regex;

/// Parse a time expression relative to `now`.
///
/// Returns `None` when no recognized form matches. Out-of-range hour/minute
/// values are not an error; the rule simply does not match and the next one
/// is tried.
pub fn parse_time(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = text.trim().to_lowercase();

    parse_relative(&text, now)
        .or_else(|| parse_day_time(&text, now))
        .or_else(|| parse_absolute(&text))
        .or_else(|| parse_time_only(&text, now))
}

/// `через N минут` / `через N часов`. The unit words are a fixed enumerated
/// set, not a general grammar.
fn parse_relative(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let re = Regex::new(r"через\s+(\d+)\s+(минут|минуты|час|часа|часов)").ok()?;
    let caps = re.captures(text)?;

    let amount: i64 = caps[1].parse().ok()?;
    let delta = match &caps[2] {
        "минут" | "минуты" => Duration::try_minutes(amount)?,
        _ => Duration::try_hours(amount)?,
    };

    now.checked_add_signed(delta)
}

/// `сегодня в HH:MM` / `завтра в HH:MM`. A «сегодня» time that has already
/// passed rolls silently to tomorrow; a reminder is never scheduled in the
/// past.
fn parse_day_time(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let re = Regex::new(r"(завтра|сегодня)\s+в\s+([01]?\d|2[0-3]):([0-5]?\d)").ok()?;
    let caps = re.captures(text)?;

    let hour: u32 = caps[2].parse().ok()?;
    let minute: u32 = caps[3].parse().ok()?;
    let target = now.date().and_hms_opt(hour, minute, 0)?;

    if &caps[1] == "завтра" || target <= now {
        target.checked_add_signed(Duration::days(1))
    } else {
        Some(target)
    }
}

/// `YYYY-MM-DD HH:MM`, then `DD.MM.YYYY HH:MM`.
fn parse_absolute(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%d.%m.%Y %H:%M"))
        .ok()
}

/// Bare `HH:MM`: today if still ahead, otherwise tomorrow.
fn parse_time_only(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let re = Regex::new(r"^([01]?\d|2[0-3]):([0-5]?\d)$").ok()?;
    let caps = re.captures(text)?;

    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let target = now.date().and_hms_opt(hour, minute, 0)?;

    if target <= now {
        target.checked_add_signed(Duration::days(1))
    } else {
        Some(target)
    }
}

/// Render a timestamp for the user: «сегодня в HH:MM» for the current
/// calendar date, «завтра в HH:MM» for the next one, otherwise the absolute
/// form. The relative arms round-trip with [`parse_time`].
pub fn format_time(dt: NaiveDateTime, now: NaiveDateTime) -> String {
    if dt.date() == now.date() {
        format!("сегодня в {}", dt.format("%H:%M"))
    } else if Some(dt.date()) == now.date().succ_opt() {
        format!("завтра в {}", dt.format("%H:%M"))
    } else {
        dt.format("%d.%m.%Y в %H:%M").to_string()
    }
}
