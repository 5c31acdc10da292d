use chrono::{DateTime, Utc};
use rand::Rng;

use crate::quiz::results::{ResultLog, Summary, TrialResult};
use crate::quiz::sequencer::{seconds_between, Sequencer, TrialPresentation};
use crate::quiz::{QuizError, TrialPool, TrialSpec, TOTAL_QUESTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InProgress,
    Completed,
}

/// One participant's attempt. Every chat owns its own instance.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuizSession {
    total_questions: usize,
    started: bool,
    session_started_at: Option<DateTime<Utc>>,
    sequencer: Sequencer,
    results: ResultLog,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(TOTAL_QUESTIONS)
    }
}

impl QuizSession {
    pub fn new(total_questions: usize) -> Self {
        Self {
            total_questions,
            started: false,
            session_started_at: None,
            sequencer: Sequencer::default(),
            results: ResultLog::default(),
        }
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    /// Starts the attempt with a freshly sampled trial order.
    /// On error the session stays not started.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        pool: &TrialPool,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), QuizError> {
        self.sequencer
            .start(pool.len(), self.total_questions, rng, now)?;
        self.results.reset();
        self.started = true;
        self.session_started_at = Some(now);
        log::debug!("Session started with plan {:?}", self.sequencer.plan());
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        if !self.started {
            Phase::NotStarted
        } else if self.sequencer.is_complete() {
            Phase::Completed
        } else {
            Phase::InProgress
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == Phase::Completed
    }

    pub fn current_index(&self) -> usize {
        self.sequencer.current_index()
    }

    pub fn plan(&self) -> &[usize] {
        self.sequencer.plan()
    }

    pub fn results(&self) -> &[TrialResult] {
        self.results.results()
    }

    /// # Panics
    ///
    /// When the session is not in progress.
    pub fn current_trial<'p>(&self, pool: &'p TrialPool) -> &'p TrialSpec {
        let index = self.sequencer.current_pool_index();
        match pool.get(index) {
            Some(trial) => trial,
            None => panic!("plan index {} is outside a pool of {}", index, pool.len()),
        }
    }

    pub fn presentation_for<R: Rng + ?Sized>(
        &mut self,
        trial: &TrialSpec,
        rng: &mut R,
    ) -> &TrialPresentation {
        self.sequencer.presentation_for(trial, rng)
    }

    pub fn cached_presentation(&self) -> Option<&TrialPresentation> {
        self.sequencer.cached_presentation()
    }

    /// Records the answer to the active trial and moves to the next one.
    ///
    /// # Panics
    ///
    /// When the session is not in progress.
    pub fn answer(&mut self, selection_is_correct: bool, now: DateTime<Utc>) -> &TrialResult {
        assert!(
            self.phase() == Phase::InProgress,
            "answer recorded with no active trial ({:?})",
            self.phase()
        );
        let (question_number, elapsed_seconds) = self.sequencer.advance(now);
        self.results.append(TrialResult {
            question_number,
            correct: selection_is_correct,
            elapsed_seconds,
        });
        &self.results.results()[self.results.len() - 1]
    }

    /// # Panics
    ///
    /// Before every question has been answered.
    pub fn summary(&self, now: DateTime<Utc>) -> Summary {
        let total_elapsed = self
            .session_started_at
            .map(|started_at| seconds_between(started_at, now))
            .unwrap_or(0.0);
        self.results.summary(self.total_questions, total_elapsed)
    }

    /// Returns to the not-started state; the next `start` draws a new plan.
    pub fn reset(&mut self) {
        self.results.reset();
        self.sequencer = Sequencer::default();
        self.started = false;
        self.session_started_at = None;
    }
}
