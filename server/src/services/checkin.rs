//! Door check-in: turns a scanned QR payload into exactly one `used`
//! transition per ticket and keeps the event's attendee counter in step.

use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::event::{CheckInStats, Event};
use crate::models::ticket::{
    parse_qr_payload, scan_verdict, ScanOutcome, ScanRequest, ScanResult, Ticket, TicketStatus,
};
use crate::services::event_service;
use crate::utils::error::AppResult;

// Past this many remembered scans, expired entries are swept on insert.
const SWEEP_THRESHOLD: usize = 1024;

/// Remembers recent scan results so a camera that decodes the same code on
/// consecutive frames gets the first answer back instead of a second trip to
/// the database.
pub struct ScanGuard {
    window: Duration,
    recent: DashMap<(Uuid, String), (Instant, ScanResult)>,
}

impl ScanGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            recent: DashMap::new(),
        }
    }

    pub fn recent(&self, event_id: Uuid, code: &str) -> Option<ScanResult> {
        let key = (event_id, code.to_string());
        let hit = self
            .recent
            .get(&key)
            .filter(|entry| entry.0.elapsed() < self.window)
            .map(|entry| entry.1.clone());
        if hit.is_none() {
            self.evict_if_stale(&key);
        }
        hit
    }

    // Re-checks under the shard lock so a fresh `remember` from a concurrent
    // scan is never dropped.
    fn evict_if_stale(&self, key: &(Uuid, String)) {
        let window = self.window;
        self.recent.remove_if(key, |_, (seen, _)| seen.elapsed() >= window);
    }

    pub fn remember(&self, event_id: Uuid, code: String, result: ScanResult) {
        if self.window.is_zero() {
            return;
        }
        if self.recent.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            self.recent.retain(|_, (seen, _)| seen.elapsed() < window);
        }
        self.recent.insert((event_id, code), (Instant::now(), result));
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

pub async fn scan_ticket(
    pool: &PgPool,
    guard: &ScanGuard,
    scanner: &AuthUser,
    req: ScanRequest,
) -> AppResult<ScanResult> {
    let code = parse_qr_payload(&req.qr_payload)?;
    let event = event_service::fetch_event(pool, req.event_id).await?;
    event_service::ensure_can_manage(pool, scanner, &event).await?;

    if let Some(previous) = guard.recent(event.id, &code) {
        debug!(event_id = %event.id, outcome = ?previous.outcome, "Duplicate scan suppressed");
        return Ok(previous.as_duplicate());
    }

    let result = check_in(pool, scanner.id, &event, &code).await?;
    info!(
        event_id = %event.id,
        scanner_id = %scanner.id,
        outcome = ?result.outcome,
        admitted = result.outcome.is_admitted(),
        checked_in = result.stats.checked_in,
        "Ticket scanned"
    );
    guard.remember(event.id, code, result.clone());
    Ok(result)
}

async fn check_in(pool: &PgPool, scanner_id: Uuid, event: &Event, code: &str) -> AppResult<ScanResult> {
    let mut tx = pool.begin().await?;

    // The row lock makes concurrent scans of one ticket queue up; the second
    // one sees `used` and is reported as such.
    let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE qr_code = $1 FOR UPDATE")
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

    let outcome = scan_verdict(ticket.as_ref(), event, Utc::now());
    let result = match (outcome, ticket) {
        (ScanOutcome::CheckedIn, Some(ticket)) => {
            let used = sqlx::query_as::<_, Ticket>(
                "UPDATE tickets
                 SET status = 'used', checked_in_at = NOW(), checked_in_by = $2, updated_at = NOW()
                 WHERE id = $1 AND status = 'active'
                 RETURNING *",
            )
            .bind(ticket.id)
            .bind(scanner_id)
            .fetch_one(&mut *tx)
            .await?;

            let tallied = sqlx::query_as::<_, Event>(
                "UPDATE events SET checked_in_count = checked_in_count + 1, updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
            )
            .bind(event.id)
            .fetch_one(&mut *tx)
            .await?;

            ScanResult::new(ScanOutcome::CheckedIn, Some(used), tallied.stats())
        }
        (ScanOutcome::Expired, Some(ticket)) if ticket.status == TicketStatus::Active => {
            let expired = sqlx::query_as::<_, Ticket>(
                "UPDATE tickets SET status = 'expired', updated_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(ticket.id)
            .fetch_one(&mut *tx)
            .await?;
            ScanResult::new(ScanOutcome::Expired, Some(expired), current_stats(&mut *tx, event).await?)
        }
        // Never reveal another event's ticket to this event's door staff.
        (ScanOutcome::WrongEvent, _) => {
            ScanResult::new(ScanOutcome::WrongEvent, None, current_stats(&mut *tx, event).await?)
        }
        (outcome, ticket) => ScanResult::new(outcome, ticket, current_stats(&mut *tx, event).await?),
    };

    tx.commit().await?;
    Ok(result)
}

async fn current_stats(conn: &mut PgConnection, event: &Event) -> AppResult<CheckInStats> {
    let fresh = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event.id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(fresh.stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: ScanOutcome) -> ScanResult {
        ScanResult::new(outcome, None, CheckInStats::from_counts(100, 10, 1))
    }

    #[test]
    fn test_repeat_within_window_is_replayed() {
        let guard = ScanGuard::new(Duration::from_secs(30));
        let event_id = Uuid::new_v4();
        assert!(guard.recent(event_id, "FTABC").is_none());

        guard.remember(event_id, "FTABC".to_string(), result(ScanOutcome::CheckedIn));
        let replay = guard.recent(event_id, "FTABC").expect("remembered");
        assert_eq!(replay.outcome, ScanOutcome::CheckedIn);
        assert!(!replay.duplicate);
        assert!(replay.as_duplicate().duplicate);
    }

    #[test]
    fn test_scans_are_keyed_by_event() {
        let guard = ScanGuard::new(Duration::from_secs(30));
        guard.remember(Uuid::new_v4(), "FTABC".to_string(), result(ScanOutcome::CheckedIn));
        assert!(guard.recent(Uuid::new_v4(), "FTABC").is_none());
    }

    #[test]
    fn test_zero_window_disables_suppression() {
        let guard = ScanGuard::new(Duration::ZERO);
        let event_id = Uuid::new_v4();
        guard.remember(event_id, "FTABC".to_string(), result(ScanOutcome::NotFound));
        assert!(guard.recent(event_id, "FTABC").is_none());
        assert!(guard.is_empty());
    }

    #[test]
    fn test_expired_entries_are_dropped_on_lookup() {
        let guard = ScanGuard::new(Duration::from_millis(1));
        let event_id = Uuid::new_v4();
        guard.remember(event_id, "FTABC".to_string(), result(ScanOutcome::AlreadyUsed));
        std::thread::sleep(Duration::from_millis(5));
        assert!(guard.recent(event_id, "FTABC").is_none());
        assert_eq!(guard.len(), 0);
    }

    #[test]
    fn test_eviction_keeps_an_entry_refreshed_after_the_miss() {
        let window = Duration::from_secs(30);
        let guard = ScanGuard::new(window);
        let key = (Uuid::new_v4(), "FTABC".to_string());
        let stale = Instant::now()
            .checked_sub(window * 2)
            .expect("monotonic clock has run long enough");

        guard.recent.insert(key.clone(), (stale, result(ScanOutcome::NotFound)));
        guard.evict_if_stale(&key);
        assert!(guard.is_empty());

        // A concurrent scan stored a fresh result between the lookup and the eviction.
        guard.recent.insert(key.clone(), (Instant::now(), result(ScanOutcome::CheckedIn)));
        guard.evict_if_stale(&key);
        let kept = guard.recent(key.0, &key.1).expect("fresh entry survives");
        assert_eq!(kept.outcome, ScanOutcome::CheckedIn);
    }
}
