#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrialResult {
    pub question_number: usize,
    pub correct: bool,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Summary {
    pub correct_count: usize,
    pub total_questions: usize,
    pub accuracy_percent: f64,
    pub total_elapsed_seconds: f64,
    pub average_elapsed_seconds: f64,
}

impl Summary {
    pub fn wrong_count(&self) -> usize {
        self.total_questions - self.correct_count
    }
}

/// Append-only log of answered trials.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResultLog {
    results: Vec<TrialResult>,
}

impl ResultLog {
    pub fn append(&mut self, result: TrialResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// # Panics
    ///
    /// Unless exactly `total_questions` results have been recorded.
    pub fn summary(&self, total_questions: usize, total_elapsed_seconds: f64) -> Summary {
        assert!(
            total_questions > 0 && self.results.len() == total_questions,
            "summary requested after {} of {} answers",
            self.results.len(),
            total_questions
        );
        let correct_count = self.results.iter().filter(|r| r.correct).count();
        let latency_sum: f64 = self.results.iter().map(|r| r.elapsed_seconds).sum();

        Summary {
            correct_count,
            total_questions,
            accuracy_percent: 100.0 * correct_count as f64 / total_questions as f64,
            total_elapsed_seconds,
            average_elapsed_seconds: latency_sum / total_questions as f64,
        }
    }

    pub fn reset(&mut self) {
        self.results.clear();
    }
}
