use chrono::NaiveDate;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{LedgerLayout, MatchConfig};
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::matcher::{match_attendance, present_set};
use crate::merge::merge_attendance;
use crate::models::{MemberMatch, MergeOutcome, StreakOutcome};
use crate::roster::{load_roster, RosterCache};
use crate::store::TabularStore;
use crate::streak::recalculate_streaks;

#[derive(Debug, Clone)]
pub struct AttendanceRun {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub roster_size: usize,
    pub matches: Vec<MemberMatch>,
    pub merge: MergeOutcome,
    /// `None` when the ledger has no streak column.
    pub streaks: Option<StreakOutcome>,
}

async fn read_ledger<S: TabularStore>(
    store: &S,
    layout: &LedgerLayout,
) -> Result<Ledger, EngineError> {
    let grid = store.get_all_cells().await?;
    Ok(Ledger::from_grid(grid, layout))
}

fn report_alerts(outcome: &StreakOutcome) {
    for alert in &outcome.alerts {
        tracing::warn!(
            member = %alert.member,
            streak = alert.streak.get(),
            "Member '{}' has reached {} consecutive misses",
            alert.member,
            alert.streak
        );
    }
}

/// Recompute the streak column against a fresh read of the ledger.
pub async fn sync_streaks<S: TabularStore>(
    store: &S,
    cutoff: NaiveDate,
    layout: &LedgerLayout,
) -> Result<StreakOutcome, EngineError> {
    let ledger = read_ledger(store, layout).await?;
    let outcome = recalculate_streaks(&ledger, cutoff, &layout.streak_header)?;
    store.set_cells(&outcome.writes).await?;
    report_alerts(&outcome);
    tracing::info!(
        %cutoff,
        column = outcome.column,
        updated = outcome.writes.len(),
        locked = outcome.locked,
        "streaks synced"
    );
    Ok(outcome)
}

/// Record attendance for one meeting from an OCR transcript, then refresh
/// the consecutive-miss column.
pub async fn take_attendance<S, C>(
    store: &S,
    cache: &C,
    transcript: &str,
    date: NaiveDate,
    layout: &LedgerLayout,
    matching: &MatchConfig,
) -> Result<AttendanceRun, EngineError>
where
    S: TabularStore,
    C: RosterCache,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("attendance", %run_id, %date);
    record_meeting(store, cache, transcript, date, layout, matching)
        .instrument(span)
        .await
        .map(|(roster_size, matches, merge, streaks)| AttendanceRun {
            run_id,
            date,
            roster_size,
            matches,
            merge,
            streaks,
        })
}

async fn record_meeting<S, C>(
    store: &S,
    cache: &C,
    transcript: &str,
    date: NaiveDate,
    layout: &LedgerLayout,
    matching: &MatchConfig,
) -> Result<(usize, Vec<MemberMatch>, MergeOutcome, Option<StreakOutcome>), EngineError>
where
    S: TabularStore,
    C: RosterCache,
{
    let roster = load_roster(store, cache).await;
    tracing::info!(members = roster.len(), "roster loaded");

    let matches = match_attendance(transcript, &roster, matching);
    tracing::info!(present = matches.len(), "transcript matched");
    let present = present_set(&matches);

    let ledger = read_ledger(store, layout).await?;
    let merge = merge_attendance(&ledger, date, &present)?;
    store.set_cells(&merge.writes).await?;
    tracing::info!(
        column = merge.column,
        updated = merge.writes.len(),
        "attendance recorded"
    );

    let streaks = match sync_streaks(store, date, layout).await {
        Ok(outcome) => Some(outcome),
        Err(EngineError::StreakColumnNotFound { fragment }) => {
            tracing::warn!("Column '{fragment}' not found; streaks not updated");
            None
        }
        Err(e) => return Err(e),
    };

    Ok((roster.len(), matches, merge, streaks))
}
