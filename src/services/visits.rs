//! Per-session visit counting.
//!
//! A visit counts once per elapsed calendar day: the stored count only moves
//! when at least one whole day has passed since the recorded last visit, and
//! the last-visit timestamp only advances together with the count.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::instrument;

use crate::store::SessionRepository;

pub const VISITS_KEY: &str = "visits";
pub const LAST_VISIT_KEY: &str = "last_visit";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_VISITS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub visits: u32,
    pub last_visit: String,
}

/// `2024-05-01 13:45:10.000123`
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parses a stored timestamp, ignoring fractional seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let whole_seconds = raw.trim().split('.').next()?;
    NaiveDateTime::parse_from_str(whole_seconds, TIMESTAMP_FORMAT).ok()
}

/// Applies one visit at `now` to the stored session values. Missing or
/// unreadable values fall back to a count of 1 and a last visit of `now`.
pub fn track_visit(
    stored_visits: Option<&str>,
    stored_last_visit: Option<&str>,
    now: NaiveDateTime,
) -> VisitRecord {
    let visits = stored_visits
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_VISITS);

    let (last_visit, last_visit_at) = stored_last_visit
        .and_then(|raw| parse_timestamp(raw).map(|at| (raw.to_string(), at)))
        .unwrap_or_else(|| (format_timestamp(now), now));

    if (now - last_visit_at).num_days() > 0 {
        VisitRecord {
            visits: visits.saturating_add(1),
            last_visit: format_timestamp(now),
        }
    } else {
        VisitRecord { visits, last_visit }
    }
}

#[derive(Clone, Debug)]
pub struct VisitService {
    sessions: SessionRepository,
}

impl VisitService {
    pub fn new(sessions: SessionRepository) -> Self {
        Self { sessions }
    }

    /// Whether the session id names a live session. Lookup failures count as
    /// unknown.
    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.exists(session_id).await.unwrap_or_else(|e| {
            tracing::warn!("Could not look up session: {:?}", e);
            false
        })
    }

    /// Records a visit for the session and returns the visit count to show.
    /// Session storage failures are logged and never fail the request.
    #[instrument(name = "Service: Record visit", skip(self, session_id))]
    pub async fn record_visit(&self, session_id: &str, now: NaiveDateTime) -> u32 {
        let stored = self.sessions.load(session_id).await.unwrap_or_else(|e| {
            tracing::warn!("Could not load session, using defaults: {:?}", e);
            HashMap::new()
        });

        let record = track_visit(
            stored.get(VISITS_KEY).map(String::as_str),
            stored.get(LAST_VISIT_KEY).map(String::as_str),
            now,
        );

        let mut values = HashMap::new();
        values.insert(VISITS_KEY.to_string(), record.visits.to_string());
        values.insert(LAST_VISIT_KEY.to_string(), record.last_visit.clone());
        if let Err(e) = self.sessions.save(session_id, &values).await {
            tracing::warn!("Could not save session: {:?}", e);
        }

        record.visits
    }
}
