use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::server_utils::sanitize_name;
use crate::types::{LeaderboardEntry, LeaderboardResponse, SessionSummary};

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only text store, one `name<TAB>level<TAB>seconds` record per line.
pub struct Leaderboard {
    file_path: PathBuf,
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new(file_path: PathBuf) -> Self {
        let entries = load_entries(&file_path);
        Self { file_path, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(
        &mut self,
        name: &str,
        summary: &SessionSummary,
    ) -> Result<LeaderboardEntry, LeaderboardError> {
        let entry = LeaderboardEntry {
            name: sanitize_name(name),
            level: summary.level,
            duration_seconds: summary.duration_seconds,
        };

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| LeaderboardError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let io_error = |source| LeaderboardError::Io {
            path: self.file_path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .map_err(io_error)?;
        writeln!(
            file,
            "{}\t{}\t{}",
            entry.name, entry.level, entry.duration_seconds
        )
        .map_err(io_error)?;

        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> LeaderboardResponse {
        LeaderboardResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.top(requested_limit),
        }
    }

    /// Best runs first: deeper level, then faster, then name.
    pub fn top(&self, requested_limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let limit = requested_limit.unwrap_or(10).clamp(1, 100);
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            b.level
                .cmp(&a.level)
                .then_with(|| a.duration_seconds.cmp(&b.duration_seconds))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        entries.truncate(limit);
        entries
    }
}

fn load_entries(path: &Path) -> Vec<LeaderboardEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                eprintln!("[leaderboard] failed to read {}: {error}", path.display());
            }
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(entry) => entries.push(entry),
            None => eprintln!(
                "[leaderboard] skipping malformed line {} in {}",
                line_no + 1,
                path.display()
            ),
        }
    }
    entries
}

fn parse_line(line: &str) -> Option<LeaderboardEntry> {
    let mut fields = line.split('\t');
    let name = fields.next()?.trim();
    let level = fields.next()?.trim().parse::<u32>().ok()?;
    let duration_seconds = fields.next()?.trim().parse::<u64>().ok()?;
    if fields.next().is_some() || name.is_empty() {
        return None;
    }
    Some(LeaderboardEntry {
        name: sanitize_name(name),
        level,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(level: u32, duration_seconds: u64) -> SessionSummary {
        SessionSummary {
            level,
            duration_seconds,
            people_rescued: 0,
            lives_remaining: 0,
            reason: None,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u32>()
        );
        std::env::temp_dir().join(unique).join("leaderboard.txt")
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn record_appends_and_survives_reload() {
        let path = temp_file("leaderboard-record");
        let mut board = Leaderboard::new(path.clone());
        assert!(board.is_empty());
        board.record("Alice", &summary(3, 95)).expect("append");
        board.record("  Bob\t ", &summary(5, 200)).expect("append");

        let text = fs::read_to_string(&path).expect("file written");
        assert_eq!(text, "Alice\t3\t95\nBob\t5\t200\n");

        let reloaded = Leaderboard::new(path.clone());
        assert_eq!(reloaded.len(), 2);
        let top = reloaded.top(None);
        assert_eq!(top[0].name, "Bob");
        assert_eq!(top[1].name, "Alice");

        cleanup(&path);
    }

    #[test]
    fn top_orders_by_level_then_duration_then_name() {
        let path = temp_file("leaderboard-order");
        let mut board = Leaderboard::new(path.clone());
        board.record("slow", &summary(4, 300)).expect("append");
        board.record("fast", &summary(4, 120)).expect("append");
        board.record("deep", &summary(9, 999)).expect("append");
        board.record("beta", &summary(2, 50)).expect("append");
        board.record("Alpha", &summary(2, 50)).expect("append");

        let names: Vec<String> = board.top(None).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["deep", "fast", "slow", "Alpha", "beta"]);

        cleanup(&path);
    }

    #[test]
    fn load_skips_malformed_lines() {
        let path = temp_file("leaderboard-malformed");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = "Alice\t3\t40\nbroken line\nBob\tx\t10\n\nCarol\t2\t5\textra\nDan\t7\t70\n";
        fs::write(&path, raw).expect("write file");

        let board = Leaderboard::new(path.clone());
        assert_eq!(board.len(), 2);
        let top = board.top(Some(10));
        assert_eq!(top[0].name, "Dan");
        assert_eq!(top[1].name, "Alice");

        cleanup(&path);
    }

    #[test]
    fn limit_is_clamped() {
        let path = temp_file("leaderboard-limit");
        let mut board = Leaderboard::new(path.clone());
        for idx in 0..3 {
            board
                .record(&format!("P{idx}"), &summary(idx + 1, 10))
                .expect("append");
        }
        assert_eq!(board.build_response(Some(1)).entries.len(), 1);
        assert_eq!(board.build_response(Some(0)).entries.len(), 1);
        assert_eq!(board.build_response(Some(999)).entries.len(), 3);
        assert_eq!(board.build_response(None).entries.len(), 3);

        cleanup(&path);
    }

    #[test]
    fn missing_file_is_an_empty_board() {
        let board = Leaderboard::new(temp_file("leaderboard-missing"));
        assert!(board.is_empty());
        assert!(board.build_response(None).generated_at_iso.ends_with('Z'));
    }
}
