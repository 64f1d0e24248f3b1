//! Console rendering of journeys.
//!
//! Pure string building so the output can be unit-tested and reused; the
//! binary just prints what this module returns.

use crate::domain::Journey;

const RULE: &str = "==================================================";
const THIN_RULE: &str = "--------------------------------------------------";

/// Renders a travel time like "1 hour, 30 minutes".
pub fn format_duration(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let plural = |n: u32, word: &str| {
        if n == 1 {
            format!("{n} {word}")
        } else {
            format!("{n} {word}s")
        }
    };
    if hours > 0 {
        format!("{}, {}", plural(hours, "hour"), plural(minutes, "minute"))
    } else {
        plural(minutes, "minute")
    }
}

/// Renders one journey as a block of lines.
pub fn format_journey(journey: &Journey, start_name: &str, end_name: &str) -> String {
    let mut out = Vec::new();
    out.push(RULE.to_string());
    out.push(" Connection found".to_string());
    out.push(RULE.to_string());
    out.push(format!(
        "Origin:      {start_name} ({})",
        journey.departure_time()
    ));
    out.push(format!(
        "Destination: {end_name} ({})",
        journey.arrival_time()
    ));
    out.push(format!(
        "TOTAL TRAVEL TIME: {}",
        format_duration(journey.duration_secs())
    ));
    out.push(THIN_RULE.to_string());

    let segments = journey.segments();
    for (i, segment) in segments.iter().enumerate() {
        let line = if segment.route_name.is_empty() {
            "unknown"
        } else {
            &segment.route_name
        };
        out.push(format!("  {}. RIDE", i + 1));
        out.push(format!(
            "     > Departure: {}  | {}",
            segment.board_time, segment.board_stop_name
        ));
        out.push(format!(
            "     > Arrival:   {}  | {}",
            segment.alight_time, segment.alight_stop_name
        ));
        out.push(format!("     > Line:      {line}"));

        if let Some(next) = segments.get(i + 1) {
            out.push(format!(
                "  TRANSFER at {} ({} minutes wait)",
                segment.alight_stop_name,
                next.wait_before_secs / 60
            ));
        }
    }

    out.push(RULE.to_string());
    out.join("\n")
}

/// Renders a full query result, numbering the alternatives.
pub fn format_journeys(journeys: &[Journey], start_name: &str, end_name: &str) -> String {
    if journeys.is_empty() {
        return "No journey found.".to_string();
    }

    let mut out = Vec::new();
    for (i, journey) in journeys.iter().enumerate() {
        if journeys.len() > 1 {
            out.push(format!("Option {} of {}:", i + 1, journeys.len()));
        }
        out.push(format_journey(journey, start_name, end_name));
    }
    out.join("\n")
}
