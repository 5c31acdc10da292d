use chrono::{DateTime, Utc};
use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::quiz::{check_quiz_size, QuizError, TrialSpec};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Choice {
    pub asset: String,
    pub is_correct: bool,
}

impl Choice {
    pub fn new(asset: String, is_correct: bool) -> Self {
        Self { asset, is_correct }
    }
}

/// Left/right placement of the two candidate answers of one trial.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrialPresentation {
    pub options: [Choice; 2],
}

impl TrialPresentation {
    pub fn shuffled<R: Rng + ?Sized>(trial: &TrialSpec, rng: &mut R) -> Self {
        let mut options = [
            Choice::new(trial.correct.clone(), true),
            Choice::new(trial.wrong.clone(), false),
        ];
        options.shuffle(rng);
        Self { options }
    }

    pub fn option(&self, slot: usize) -> Option<&Choice> {
        self.options.get(slot)
    }
}

/// Seconds from `from` to `to`, never negative even if the wall clock stepped back.
pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds() as f64;
    (millis / 1000.0).max(0.0)
}

/// Trial ordering and per-trial state of one attempt.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Sequencer {
    plan: Vec<usize>,
    current_index: usize,
    trial_started_at: Option<DateTime<Utc>>,
    presentation: Option<TrialPresentation>,
}

impl Sequencer {
    /// Draws a fresh plan of `total_questions` distinct indices below `pool_size`.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        pool_size: usize,
        total_questions: usize,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), QuizError> {
        check_quiz_size(pool_size, total_questions)?;

        self.plan = index::sample(rng, pool_size, total_questions).into_vec();
        self.current_index = 0;
        self.trial_started_at = Some(now);
        self.presentation = None;
        Ok(())
    }

    pub fn plan(&self) -> &[usize] {
        &self.plan
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_complete(&self) -> bool {
        !self.plan.is_empty() && self.current_index == self.plan.len()
    }

    /// Pool index of the active trial.
    ///
    /// # Panics
    ///
    /// When no trial is active, i.e. before `start` or after the last answer.
    pub fn current_pool_index(&self) -> usize {
        match self.plan.get(self.current_index) {
            Some(index) => *index,
            None => panic!(
                "no active trial: index {} of a {}-trial plan",
                self.current_index,
                self.plan.len()
            ),
        }
    }

    /// Returns the cached presentation of the active trial, shuffling it on first use.
    pub fn presentation_for<R: Rng + ?Sized>(
        &mut self,
        trial: &TrialSpec,
        rng: &mut R,
    ) -> &TrialPresentation {
        self.presentation
            .get_or_insert_with(|| TrialPresentation::shuffled(trial, rng))
    }

    pub fn cached_presentation(&self) -> Option<&TrialPresentation> {
        self.presentation.as_ref()
    }

    /// Closes the active trial and opens the next one.
    /// Returns the 1-based question number and the trial latency in seconds.
    ///
    /// # Panics
    ///
    /// When no trial is active.
    pub fn advance(&mut self, now: DateTime<Utc>) -> (usize, f64) {
        assert!(
            self.current_index < self.plan.len(),
            "answer recorded with no active trial"
        );
        let started_at = self.trial_started_at.unwrap_or(now);
        let elapsed = seconds_between(started_at, now);
        let question_number = self.current_index + 1;

        self.current_index += 1;
        self.trial_started_at = Some(now);
        self.presentation = None;
        (question_number, elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn trial() -> TrialSpec {
        TrialSpec::new("target1.png", "correct1.png", "wrong1.png")
    }

    #[test]
    fn plan_is_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut sequencer = Sequencer::default();
        for _ in 0..50 {
            sequencer.start(10, 10, &mut rng, Utc::now()).unwrap();
            let plan = sequencer.plan();
            assert_eq!(plan.len(), 10);
            assert!(plan.iter().all(|i| *i < 10));
            assert_eq!(plan.iter().collect::<HashSet<_>>().len(), 10);
        }
    }

    #[test]
    fn plan_can_draw_from_a_larger_pool() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sequencer = Sequencer::default();
        sequencer.start(25, 4, &mut rng, Utc::now()).unwrap();
        assert_eq!(sequencer.plan().len(), 4);
        assert!(sequencer.plan().iter().all(|i| *i < 25));
    }

    #[test]
    fn start_rejects_small_pool_and_empty_quiz() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sequencer = Sequencer::default();
        assert_eq!(
            sequencer.start(3, 10, &mut rng, Utc::now()),
            Err(QuizError::PoolTooSmall {
                pool_size: 3,
                total_questions: 10
            })
        );
        assert_eq!(
            sequencer.start(10, 0, &mut rng, Utc::now()),
            Err(QuizError::EmptyQuiz)
        );
        assert!(sequencer.plan().is_empty());
    }

    #[test]
    fn presentation_holds_until_advance() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sequencer = Sequencer::default();
        sequencer.start(10, 10, &mut rng, Utc::now()).unwrap();

        let first = sequencer.presentation_for(&trial(), &mut rng).clone();
        for _ in 0..20 {
            assert_eq!(sequencer.presentation_for(&trial(), &mut rng), &first);
        }

        sequencer.advance(Utc::now());
        assert!(sequencer.cached_presentation().is_none());
    }

    #[test]
    fn presentation_has_one_correct_and_one_wrong_option() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen_correct_first = false;
        let mut seen_wrong_first = false;
        for _ in 0..64 {
            let presentation = TrialPresentation::shuffled(&trial(), &mut rng);
            let correct = presentation.options.iter().filter(|c| c.is_correct).count();
            assert_eq!(correct, 1);
            if presentation.options[0].is_correct {
                assert_eq!(presentation.options[0].asset, "correct1.png");
                assert_eq!(presentation.options[1].asset, "wrong1.png");
                seen_correct_first = true;
            } else {
                assert_eq!(presentation.options[0].asset, "wrong1.png");
                seen_wrong_first = true;
            }
        }
        assert!(seen_correct_first && seen_wrong_first);
    }

    #[test]
    fn advance_reports_question_number_and_latency() {
        let mut rng = StdRng::seed_from_u64(9);
        let t0 = Utc::now();
        let mut sequencer = Sequencer::default();
        sequencer.start(10, 2, &mut rng, t0).unwrap();

        let (number, elapsed) = sequencer.advance(t0 + Duration::milliseconds(1500));
        assert_eq!(number, 1);
        assert!((elapsed - 1.5).abs() < 1e-9);

        let (number, elapsed) = sequencer.advance(t0 + Duration::milliseconds(1750));
        assert_eq!(number, 2);
        assert!((elapsed - 0.25).abs() < 1e-9);
        assert!(sequencer.is_complete());
    }

    #[test]
    fn latency_is_clamped_when_clock_steps_back() {
        let t0 = Utc::now();
        assert_eq!(seconds_between(t0, t0 - Duration::seconds(3)), 0.0);
    }

    #[test]
    #[should_panic(expected = "no active trial")]
    fn advance_past_the_end_panics() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut sequencer = Sequencer::default();
        sequencer.start(10, 1, &mut rng, Utc::now()).unwrap();
        sequencer.advance(Utc::now());
        sequencer.advance(Utc::now());
    }

    #[test]
    #[should_panic(expected = "no active trial")]
    fn current_pool_index_before_start_panics() {
        Sequencer::default().current_pool_index();
    }
}
