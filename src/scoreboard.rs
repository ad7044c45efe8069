//! Scoreboard aggregator
//!
//! Keeps every received round in arrival order and derives the ranked
//! top-N view shown by the scoreboard display.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::relay::{ScoreRecord, TIMESTAMP_FORMAT};

/// Rows shown on the scoreboard
pub const DISPLAY_ROWS: usize = 5;

/// Top-N snapshot shared between the client worker and the display loop
pub type SharedStandings = Arc<Mutex<Vec<RankedRow>>>;

/// One displayed row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    /// Display rank (1-indexed, equal consecutive scores share it)
    pub rank: u32,
    pub score: i64,
    /// Timestamp as received
    pub timestamp: String,
    /// `HH:MM:SS`, or `N/A` if the timestamp did not parse
    pub time_of_day: String,
}

/// Append-only history of received rounds
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    history: Vec<ScoreRecord>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a round and return the refreshed top rows
    pub fn push(&mut self, record: ScoreRecord) -> Vec<RankedRow> {
        self.history.push(record);
        self.standings(DISPLAY_ROWS)
    }

    /// Ranked view of the best `limit` rounds
    pub fn standings(&self, limit: usize) -> Vec<RankedRow> {
        rank_records(&self.history, limit)
    }

    pub fn history(&self) -> &[ScoreRecord] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn top_score(&self) -> Option<i64> {
        self.history.iter().map(|r| r.score).max()
    }
}

/// Sort descending by score (stable, so ties keep arrival order) and assign
/// positional ranks: the counter moves up by one only when a score is
/// strictly below the previous row's.
pub fn rank_records(records: &[ScoreRecord], limit: usize) -> Vec<RankedRow> {
    let mut sorted: Vec<&ScoreRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    let mut rows = Vec::with_capacity(limit.min(sorted.len()));
    let mut rank = 1;
    let mut previous: Option<i64> = None;
    for record in sorted.into_iter().take(limit) {
        if previous.is_some_and(|p| record.score < p) {
            rank += 1;
        }
        previous = Some(record.score);
        rows.push(RankedRow {
            rank,
            score: record.score,
            timestamp: record.timestamp.clone(),
            time_of_day: format_time_of_day(&record.timestamp),
        });
    }
    rows
}

/// `YYYY-MM-DD HH:MM:SS` -> `HH:MM:SS`
pub fn format_time_of_day(timestamp: &str) -> String {
    match chrono::NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT) {
        Ok(parsed) => parsed.format("%H:%M:%S").to_string(),
        Err(_) => "N/A".to_string(),
    }
}

/// Plain-text table for the console display
pub fn render_table(rows: &[RankedRow]) -> String {
    let mut out = String::from("HIGH SCORES\n");
    if rows.is_empty() {
        out.push_str("  No scores yet\n");
        return out;
    }
    let _ = writeln!(out, "{:>4}  {:>6}  {:>8}", "Rank", "Score", "Time");
    for row in rows {
        let _ = writeln!(
            out,
            "{:>4}  {:>6}  {:>8}",
            row.rank, row.score, row.time_of_day
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn records(scores: &[i64]) -> Vec<ScoreRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| ScoreRecord::new(*s, format!("2024-05-01 12:00:{:02}", i)))
            .collect()
    }

    fn ranks(rows: &[RankedRow]) -> Vec<u32> {
        rows.iter().map(|r| r.rank).collect()
    }

    #[test]
    fn test_equal_scores_share_rank() {
        let rows = rank_records(&records(&[10, 10, 7]), DISPLAY_ROWS);
        assert_eq!(ranks(&rows), vec![1, 1, 2]);
        assert_eq!(rows[2].score, 7);
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let rows = rank_records(&records(&[3, 9, 1, 9, 4, 8, 2]), DISPLAY_ROWS);
        let scores: Vec<i64> = rows.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![9, 9, 8, 4, 3]);
        assert_eq!(ranks(&rows), vec![1, 1, 2, 3, 4]);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let rows = rank_records(&records(&[5, 5]), DISPLAY_ROWS);
        assert_eq!(rows[0].timestamp, "2024-05-01 12:00:00");
        assert_eq!(rows[1].timestamp, "2024-05-01 12:00:01");
    }

    #[test]
    fn test_push_refreshes_standings() {
        let mut board = Scoreboard::new();
        assert!(board.is_empty());
        board.push(ScoreRecord::new(4, "2024-05-01 09:15:30"));
        let rows = board.push(ScoreRecord::new(6, "2024-05-01 09:16:40"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score, 6);
        assert_eq!(rows[0].time_of_day, "09:16:40");
        assert_eq!(board.len(), 2);
        assert_eq!(board.top_score(), Some(6));
    }

    #[test]
    fn test_negative_scores_rank_last() {
        let rows = rank_records(&records(&[-2, 3, 0, -2]), DISPLAY_ROWS);
        let scores: Vec<i64> = rows.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![3, 0, -2, -2]);
        assert_eq!(ranks(&rows), vec![1, 2, 3, 3]);
    }

    #[test]
    fn test_time_of_day_fallback() {
        assert_eq!(format_time_of_day("2024-05-01 23:59:01"), "23:59:01");
        assert_eq!(format_time_of_day("yesterday"), "N/A");
        assert_eq!(format_time_of_day(""), "N/A");
    }

    #[test]
    fn test_render_table() {
        assert!(render_table(&[]).contains("No scores yet"));

        let rows = rank_records(&records(&[12]), DISPLAY_ROWS);
        let table = render_table(&rows);
        assert!(table.contains("Rank"));
        assert!(table.contains("   1      12  12:00:00"));
    }

    proptest! {
        #[test]
        fn prop_ranks_step_by_one_on_strict_drops(
            scores in proptest::collection::vec(-5i64..20, 1..40)
        ) {
            let rows = rank_records(&records(&scores), usize::MAX);
            prop_assert_eq!(rows.len(), scores.len());
            prop_assert_eq!(rows[0].rank, 1);
            for pair in rows.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert_eq!(pair[0].rank, pair[1].rank);
                } else {
                    prop_assert_eq!(pair[0].rank + 1, pair[1].rank);
                }
            }
        }
    }
}
