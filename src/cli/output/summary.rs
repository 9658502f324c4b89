use std::fmt::Write;

use ansi_term::Colour;
use chrono::Duration;

use crate::{
    analysis::{range::DaySummary, sessions::HourBuckets},
    utils::{percentage::duration_percentage, time::as_hours},
};

/// Hours of screen time considered a full day. Only used to express totals as percentages.
pub const EXPECTED_HOURS_PER_DAY: f64 = 7.5;

/// 256-color codes from red to green.
const GRADIENT: [u8; 10] = [196, 202, 208, 214, 220, 226, 190, 154, 118, 46];
const INACTIVE: u8 = 240;
const HOUR_GLYPH: &str = "█";

pub fn expected_day() -> Duration {
    Duration::milliseconds((EXPECTED_HOURS_PER_DAY * 3_600_000.) as i64)
}

/// Gradient index for an hour, 6 minutes per step. None for an inactive hour.
pub fn gradient_step(active: Duration) -> Option<usize> {
    if active <= Duration::zero() {
        return None;
    }
    let minutes = active.num_milliseconds() as f64 / 60_000.;
    Some((((minutes - 1.) / 6.).max(0.) as usize).min(GRADIENT.len() - 1))
}

pub fn hour_colour(active: Duration) -> Colour {
    Colour::Fixed(gradient_step(active).map_or(INACTIVE, |step| GRADIENT[step]))
}

/// 24 colored glyphs, one per hour.
pub fn render_bar(hours: &HourBuckets) -> String {
    (0..24)
        .map(|hour| hour_colour(hours.get(hour)).paint(HOUR_GLYPH).to_string())
        .collect()
}

fn stat_columns(raw: Duration, block: Duration, expected: Duration) -> String {
    let raw_str = format!(
        "Raw: {:.1} h ({})",
        as_hours(raw),
        duration_percentage(raw, expected)
    );
    let block_str = format!(
        "Block: {:.1} h ({})",
        as_hours(block),
        duration_percentage(block, expected)
    );
    format!("{raw_str:<22}{block_str}")
}

pub fn render_day(summary: &DaySummary) -> String {
    format!(
        "{}: {}  {}",
        summary.day.format("%Y-%m-%d"),
        render_bar(&summary.hours),
        stat_columns(summary.raw_duration(), summary.block_duration, expected_day())
    )
}

/// Totals over every active day. Percentages are relative to a full day per active day.
pub fn render_totals(days: &[DaySummary]) -> String {
    if days.is_empty() {
        return "No activity to summarize.".into();
    }
    let (raw, block) = days.iter().fold(
        (Duration::zero(), Duration::zero()),
        |(raw, block), day| (raw + day.raw_duration(), block + day.block_duration),
    );
    let expected = expected_day() * days.len() as i32;
    format!(
        "Total for {} active day(s): {}",
        days.len(),
        stat_columns(raw, block, expected)
    )
}

pub fn render_report(days: &[DaySummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n--- Daily Screen Time Summary ---");
    if days.is_empty() {
        let _ = writeln!(out, "No screen time data found for the selected period.");
        return out;
    }

    let mut sorted = days.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|summary| summary.day);
    for summary in sorted {
        let _ = writeln!(out, "{}", render_day(summary));
    }

    let _ = writeln!(out, "\n--- Monthly Summary ---");
    let _ = writeln!(out, "{}", render_totals(days));
    out
}
