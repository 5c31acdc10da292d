pub mod export;
pub mod results;
pub mod sequencer;
pub mod session;

use std::path::{Path, PathBuf};

/// Number of trials in one attempt.
pub const TOTAL_QUESTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("a quiz needs at least one question")]
    EmptyQuiz,
    #[error("trial pool has {pool_size} items but the quiz asks {total_questions} questions")]
    PoolTooSmall {
        pool_size: usize,
        total_questions: usize,
    },
}

/// Fails unless a pool of `pool_size` items can fill a quiz without repeats.
pub fn check_quiz_size(pool_size: usize, total_questions: usize) -> Result<(), QuizError> {
    if total_questions == 0 {
        return Err(QuizError::EmptyQuiz);
    }
    if pool_size < total_questions {
        return Err(QuizError::PoolTooSmall {
            pool_size,
            total_questions,
        });
    }
    Ok(())
}

/// One quiz item: a target stimulus and its two candidate answers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrialSpec {
    pub target: String,
    pub correct: String,
    pub wrong: String,
}

impl TrialSpec {
    pub fn new(target: impl Into<String>, correct: impl Into<String>, wrong: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            correct: correct.into(),
            wrong: wrong.into(),
        }
    }

    pub fn assets(&self) -> [&str; 3] {
        [&self.target, &self.correct, &self.wrong]
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrialPool {
    pub trials: Vec<TrialSpec>,
}

impl TrialPool {
    pub fn new(trials: Vec<TrialSpec>) -> Self {
        Self { trials }
    }

    /// The ten stimulus triples shipped in the image directory.
    pub fn reference() -> Self {
        let trials = (1..=10)
            .map(|i| {
                TrialSpec::new(
                    format!("target{}.png", i),
                    format!("correct{}.png", i),
                    format!("wrong{}.png", i),
                )
            })
            .collect();
        Self::new(trials)
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn check(&self, total_questions: usize) -> Result<(), QuizError> {
        check_quiz_size(self.len(), total_questions)
    }

    pub fn get(&self, index: usize) -> Option<&TrialSpec> {
        self.trials.get(index)
    }

    /// Asset files referenced by the pool that do not exist under `dir`.
    pub fn missing_assets(&self, dir: &Path) -> Vec<PathBuf> {
        self.trials
            .iter()
            .flat_map(|t| t.assets())
            .map(|asset| dir.join(asset))
            .filter(|path| !path.exists())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_pool_covers_every_question() {
        let pool = TrialPool::reference();
        assert_eq!(pool.len(), 10);
        assert!(pool.len() >= TOTAL_QUESTIONS);
        assert_eq!(
            pool.get(0),
            Some(&TrialSpec::new("target1.png", "correct1.png", "wrong1.png"))
        );
        assert_eq!(pool.get(9).map(|t| t.wrong.as_str()), Some("wrong10.png"));
    }

    #[test]
    fn check_accepts_reference_pool_and_rejects_oversized_quiz() {
        let pool = TrialPool::reference();
        assert_eq!(pool.check(TOTAL_QUESTIONS), Ok(()));
        assert_eq!(
            pool.check(11),
            Err(QuizError::PoolTooSmall {
                pool_size: 10,
                total_questions: 11
            })
        );
        assert_eq!(pool.check(0), Err(QuizError::EmptyQuiz));
    }

    #[test]
    fn missing_assets_lists_absent_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("target1.png"), b"png").unwrap();
        std::fs::write(dir.path().join("correct1.png"), b"png").unwrap();

        let pool = TrialPool::new(vec![TrialSpec::new("target1.png", "correct1.png", "wrong1.png")]);
        let missing = pool.missing_assets(dir.path());

        assert_eq!(missing, vec![dir.path().join("wrong1.png")]);
    }
}
