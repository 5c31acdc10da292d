use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::quiz::results::Summary;

/// Quiz-derived features, named the way the classifier's training data names them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureRow {
    pub age: u32,
    pub avg_reaction_time: f64,
    pub correct_answers: usize,
    pub wrong_answers: usize,
    pub mrt_score: f64,
}

impl FeatureRow {
    pub fn from_summary(age: u32, summary: &Summary) -> Self {
        Self {
            age,
            avg_reaction_time: summary.average_elapsed_seconds,
            correct_answers: summary.correct_count,
            wrong_answers: summary.wrong_count(),
            mrt_score: summary.accuracy_percent,
        }
    }
}

/// JSON-lines file that completed attempts are appended to.
pub struct FeatureLog {
    path: PathBuf,
}

impl FeatureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, row: &FeatureRow) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut line = serde_json::to_string(row)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_right() -> Summary {
        Summary {
            correct_count: 5,
            total_questions: 10,
            accuracy_percent: 50.0,
            total_elapsed_seconds: 31.0,
            average_elapsed_seconds: 2.75,
        }
    }

    #[test]
    fn row_is_derived_from_summary() {
        let row = FeatureRow::from_summary(71, &half_right());
        assert_eq!(
            row,
            FeatureRow {
                age: 71,
                avg_reaction_time: 2.75,
                correct_answers: 5,
                wrong_answers: 5,
                mrt_score: 50.0,
            }
        );
    }

    #[test]
    fn append_writes_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeatureLog::new(dir.path().join("exports").join("features.jsonl"));
        let row = FeatureRow::from_summary(64, &half_right());

        log.append(&row).unwrap();
        log.append(&row).unwrap();

        let contents = fs::read_to_string(dir.path().join("exports/features.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["age"], 64);
            assert_eq!(value["wrong_answers"], 5);
            assert!(value.get("dementia").is_none());
        }
    }
}
