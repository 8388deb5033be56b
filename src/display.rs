// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Plain-text rendering of the live flight list.
//!
//! Rows fade with the age of their last sighting using ANSI dim, newly
//! observed flights get a marker, and expanded rows show the aircraft photo
//! credit (or the stand-in borrowed from another aircraft of the same type).

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use flightdeck_client::{
    age_opacity, density_glyph, is_local_airport, most_observed, seen_indicator, Flight,
    PhotoEntry, Session, TrafficStatus,
};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

// Rows at or below this opacity are drawn dimmed
const DIM_OPACITY: f32 = 0.7;

const FRESH_MARKER: char = '●';
const PLACEHOLDER: &str = "—";

fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(PLACEHOLDER)
}

fn airport(code: Option<&str>, local_airports: &[String]) -> String {
    let label = or_placeholder(code);
    if is_local_airport(code, local_airports) {
        format!("{BOLD}{label}{RESET}")
    } else {
        label.to_string()
    }
}

fn last_seen_label(flight: &Flight) -> String {
    flight.last_seen_at().map_or_else(
        || PLACEHOLDER.to_string(),
        |ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
    )
}

fn photo_line(session: &Session, flight: &Flight) -> String {
    let Some(reg) = flight.registration() else {
        return "no registration".to_string();
    };

    if let Some(best) = session.best_photo(flight) {
        let credit = best.photo.photographer.as_deref().unwrap_or("unknown photographer");
        let src = or_placeholder(best.photo.thumbnail_url.as_deref());
        return if best.is_fallback {
            format!("{src} (same type, {} by {credit})", best.source_reg)
        } else {
            format!("{src} (by {credit}, via Planespotters)")
        };
    }

    match session.photos().lookup(reg) {
        PhotoEntry::NotRequested if session.photos().is_pending(reg) => "loading photo…".to_string(),
        PhotoEntry::NotRequested => "photo not loaded".to_string(),
        _ => "no photo available".to_string(),
    }
}

/// Render the status header, one line per flight in the current view, and
/// the sweep footer.
#[must_use]
pub fn render(session: &Session, now: DateTime<Utc>, local_airports: &[String]) -> String {
    let snapshot = session.snapshot();
    let flights = snapshot.filtered_view();
    let expand = session.expand_state();
    let status = TrafficStatus::from_count(flights.len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{BOLD}FLIGHT INTELLIGENCE{RESET}  {} {}  targets: {}",
        status,
        density_glyph(flights.len()),
        flights.len()
    );
    if snapshot.has_time_filter() {
        let _ = writeln!(out, "time search active");
    } else if !snapshot.query().trim().is_empty() {
        let _ = writeln!(out, "filter: {}", snapshot.query().trim());
    }
    let _ = writeln!(out);

    if flights.is_empty() {
        let _ = writeln!(out, "  no flights");
    }

    for flight in &flights {
        let fresh = flight
            .id
            .as_ref()
            .is_some_and(|id| snapshot.is_fresh(id, now));
        let style = if age_opacity(flight, now) <= DIM_OPACITY { DIM } else { "" };

        let _ = writeln!(
            out,
            "{style}{} {:<9} {:<8} {:<5} {} → {}  {}  seen {}{}{RESET}",
            if fresh { FRESH_MARKER } else { ' ' },
            or_placeholder(flight.callsign.as_deref()),
            or_placeholder(flight.reg.as_deref()),
            or_placeholder(flight.type_code.as_deref()),
            airport(flight.origin_iata.as_deref(), local_airports),
            airport(flight.dest_iata.as_deref(), local_airports),
            last_seen_label(flight),
            flight.times_seen.unwrap_or(0),
            seen_indicator(flight.times_seen),
        );

        if expand.is_expanded(flight.id.as_ref()) {
            let _ = writeln!(out, "    {}", photo_line(session, flight));
        }
    }

    let _ = writeln!(out);
    let sweep = snapshot
        .seconds_since_refresh(now)
        .map_or_else(|| "never".to_string(), |secs| format!("{secs}s ago"));
    let _ = write!(out, "LAST SWEEP {sweep}");
    if let Some(top) = most_observed(&flights) {
        let _ = write!(
            out,
            "  |  MOST OBSERVED {} ×{}",
            or_placeholder(top.callsign.as_deref().or(top.reg.as_deref())),
            top.times_seen.unwrap_or(0)
        );
    }
    let _ = writeln!(out);

    out
}

/// Render for a terminal, clearing the previous frame first.
#[must_use]
pub fn render_frame(session: &Session, now: DateTime<Utc>, local_airports: &[String]) -> String {
    format!("{CLEAR_SCREEN}{}", render(session, now, local_airports))
}
