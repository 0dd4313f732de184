/// Vote ledger
///
/// One counted vote per (subject, voter, day). Each accepted vote inserts its
/// record and bumps the subject's counter in the same transaction, so the
/// counter always equals the number of stored records.
use crate::errors::VoteError;
use crate::logger::{self, LogTag};
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Vote counter row used by leaderboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub subject_id: String,
    pub votes_count: u64,
}

pub struct VoteLedger {
    conn: Mutex<Connection>,
    max_key_length: usize,
}

impl VoteLedger {
    pub fn open(path: &Path, max_key_length: usize) -> Result<Self, VoteError> {
        let conn = Connection::open(path)?;
        logger::debug(
            LogTag::Votes,
            &format!("Opened vote ledger at {}", path.display()),
        );
        Self::with_connection(conn, max_key_length)
    }

    pub fn in_memory(max_key_length: usize) -> Result<Self, VoteError> {
        Self::with_connection(Connection::open_in_memory()?, max_key_length)
    }

    fn with_connection(conn: Connection, max_key_length: usize) -> Result<Self, VoteError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vote_records (
                subject_id TEXT NOT NULL,
                voter_key TEXT NOT NULL,
                day TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (subject_id, voter_key, day)
            );
            CREATE INDEX IF NOT EXISTS idx_vote_records_subject_day ON vote_records(subject_id, day);

            CREATE TABLE IF NOT EXISTS vote_counts (
                subject_id TEXT PRIMARY KEY,
                votes_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_vote_counts_count ON vote_counts(votes_count DESC);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            max_key_length,
        })
    }

    fn validate<'a>(&self, field: &str, value: &'a str) -> Result<&'a str, VoteError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(VoteError::InvalidInput(format!("{} must not be empty", field)));
        }
        if value.chars().count() > self.max_key_length {
            return Err(VoteError::InvalidInput(format!(
                "{} longer than {} characters",
                field, self.max_key_length
            )));
        }
        Ok(value)
    }

    /// Record today's (UTC) vote of `voter_key` for `subject_id`
    ///
    /// Returns the subject's count including this vote.
    pub fn vote(&self, subject_id: &str, voter_key: &str) -> Result<u64, VoteError> {
        self.vote_on_day(subject_id, voter_key, Utc::now().date_naive())
    }

    pub fn vote_on_day(&self, subject_id: &str, voter_key: &str, day: NaiveDate) -> Result<u64, VoteError> {
        let subject_id = self.validate("subject_id", subject_id)?;
        let voter_key = self.validate("voter_key", voter_key)?;
        let day = day.format("%Y-%m-%d").to_string();
        let now = Utc::now().to_rfc3339();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO vote_records (subject_id, voter_key, day, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![subject_id, voter_key, day, now],
        )?;

        if inserted == 0 {
            // Dropping the transaction rolls it back
            logger::debug(
                LogTag::Votes,
                &format!("{} already voted for {} on {}", voter_key, subject_id, day),
            );
            return Err(VoteError::AlreadyVoted {
                subject_id: subject_id.to_string(),
                voter_key: voter_key.to_string(),
                day,
            });
        }

        tx.execute(
            "INSERT INTO vote_counts (subject_id, votes_count, updated_at) VALUES (?1, 1, ?2)
             ON CONFLICT(subject_id) DO UPDATE SET
                 votes_count = votes_count + 1,
                 updated_at = excluded.updated_at",
            params![subject_id, now],
        )?;
        let count: i64 = tx.query_row(
            "SELECT votes_count FROM vote_counts WHERE subject_id = ?1",
            params![subject_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        logger::debug(
            LogTag::Votes,
            &format!("Vote recorded: {} -> {} ({})", voter_key, subject_id, day),
        );
        Ok(count.max(0) as u64)
    }

    /// Total counted votes for `subject_id` (0 when never voted)
    pub fn get_votes(&self, subject_id: &str) -> Result<u64, VoteError> {
        let subject_id = self.validate("subject_id", subject_id)?;
        let conn = self.conn.lock();
        let count: Option<i64> = conn
            .query_row(
                "SELECT votes_count FROM vote_counts WHERE subject_id = ?1",
                params![subject_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    pub fn votes_for_day(&self, subject_id: &str, day: NaiveDate) -> Result<u64, VoteError> {
        let subject_id = self.validate("subject_id", subject_id)?;
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vote_records WHERE subject_id = ?1 AND day = ?2",
            params![subject_id, day.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Subjects with the most votes, ties broken by subject id
    pub fn top_voted(&self, limit: usize) -> Result<Vec<VoteTally>, VoteError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT subject_id, votes_count FROM vote_counts
             ORDER BY votes_count DESC, subject_id ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(VoteTally {
                subject_id: row.get(0)?,
                votes_count: row.get::<_, i64>(1)?.max(0) as u64,
            })
        })?;

        let mut tallies = Vec::new();
        for row in rows {
            tallies.push(row?);
        }
        Ok(tallies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger() -> VoteLedger {
        VoteLedger::in_memory(32).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_second_vote_same_day_is_rejected() {
        let ledger = ledger();
        ledger.vote_on_day("bitcoin", "voter-1", day(1)).unwrap();

        let err = ledger.vote_on_day("bitcoin", "voter-1", day(1)).unwrap_err();
        assert_eq!(
            err,
            VoteError::AlreadyVoted {
                subject_id: "bitcoin".to_string(),
                voter_key: "voter-1".to_string(),
                day: "2024-05-01".to_string(),
            }
        );
        assert_eq!(ledger.get_votes("bitcoin").unwrap(), 1);
    }

    #[test]
    fn test_vote_returns_count_after_insert() {
        let ledger = ledger();
        assert_eq!(ledger.vote_on_day("solana", "voter-1", day(1)).unwrap(), 1);
        assert_eq!(ledger.vote_on_day("solana", "voter-2", day(1)).unwrap(), 2);
        assert_eq!(ledger.vote_on_day("bitcoin", "voter-1", day(1)).unwrap(), 1);
        assert_eq!(ledger.vote_on_day("solana", "voter-1", day(2)).unwrap(), 3);
        assert!(ledger.vote_on_day("solana", "voter-2", day(1)).is_err());
        assert_eq!(ledger.get_votes("solana").unwrap(), 3);
    }

    #[test]
    fn test_new_day_and_new_voter_both_count() {
        let ledger = ledger();
        ledger.vote_on_day("bitcoin", "voter-1", day(1)).unwrap();
        ledger.vote_on_day("bitcoin", "voter-1", day(2)).unwrap();
        ledger.vote_on_day("bitcoin", "voter-2", day(2)).unwrap();

        assert_eq!(ledger.get_votes("bitcoin").unwrap(), 3);
        assert_eq!(ledger.votes_for_day("bitcoin", day(2)).unwrap(), 2);
        assert_eq!(ledger.votes_for_day("bitcoin", day(3)).unwrap(), 0);
        assert_eq!(ledger.get_votes("ethereum").unwrap(), 0);
    }

    #[test]
    fn test_input_validation() {
        let ledger = ledger();
        assert!(matches!(
            ledger.vote("  ", "voter"),
            Err(VoteError::InvalidInput(_))
        ));
        assert!(matches!(
            ledger.vote("bitcoin", &"x".repeat(33)),
            Err(VoteError::InvalidInput(_))
        ));
        // Surrounding whitespace is not part of the key
        ledger.vote_on_day(" bitcoin ", "voter", day(1)).unwrap();
        assert_eq!(ledger.get_votes("bitcoin").unwrap(), 1);
    }

    #[test]
    fn test_top_voted_ordering() {
        let ledger = ledger();
        for voter in ["a", "b", "c"] {
            ledger.vote_on_day("solana", voter, day(1)).unwrap();
        }
        ledger.vote_on_day("bitcoin", "a", day(1)).unwrap();
        ledger.vote_on_day("avalanche", "a", day(1)).unwrap();

        let top = ledger.top_voted(2).unwrap();
        assert_eq!(
            top,
            vec![
                VoteTally { subject_id: "solana".to_string(), votes_count: 3 },
                VoteTally { subject_id: "avalanche".to_string(), votes_count: 1 },
            ]
        );
    }

    #[test]
    fn test_votes_persist_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("votes.db");
        {
            let ledger = VoteLedger::open(&path, 64).unwrap();
            ledger.vote("dogecoin", "voter").unwrap();
        }
        let ledger = VoteLedger::open(&path, 64).unwrap();
        assert_eq!(ledger.get_votes("dogecoin").unwrap(), 1);
        assert!(ledger.vote("dogecoin", "voter").is_err());
    }
}
