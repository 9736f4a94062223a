use std::{collections::BTreeMap, fmt};

/// Expected-vs-predicted tallies for an evaluation run.
///
/// Labels keep the order in which they were first seen, whether as an
/// expected or a predicted label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: BTreeMap<(usize, usize), usize>,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&mut self, label: &str) -> usize {
        match self.labels.iter().position(|l| l == label) {
            Some(index) => index,
            None => {
                self.labels.push(label.to_string());
                self.labels.len() - 1
            }
        }
    }

    pub fn record(&mut self, expected: &str, predicted: &str) {
        let row = self.index_of(expected);
        let column = self.index_of(predicted);
        *self.counts.entry((row, column)).or_default() += 1;
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn count(&self, expected: &str, predicted: &str) -> usize {
        let row = self.labels.iter().position(|l| l == expected);
        let column = self.labels.iter().position(|l| l == predicted);
        match (row, column) {
            (Some(row), Some(column)) => self.counts.get(&(row, column)).copied().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn correct(&self) -> usize {
        self.counts
            .iter()
            .filter(|((row, column), _)| row == column)
            .map(|(_, count)| count)
            .sum()
    }

    /// Fraction of correct predictions; `None` before anything is recorded
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.correct() as f64 / total as f64)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(String::len)
            .chain(std::iter::once("expected \\ predicted".len()))
            .max()
            .unwrap_or(0);

        write!(f, "{:<width$}", "expected \\ predicted")?;
        for label in &self.labels {
            write!(f, " {label:>width$}")?;
        }
        writeln!(f)?;

        for (row, expected) in self.labels.iter().enumerate() {
            write!(f, "{expected:<width$}")?;
            for column in 0..self.labels.len() {
                let count = self.counts.get(&(row, column)).copied().unwrap_or(0);
                write!(f, " {count:>width$}")?;
            }
            writeln!(f)?;
        }

        match self.accuracy() {
            Some(accuracy) => write!(
                f,
                "accuracy: {:.1}% ({}/{})",
                accuracy * 100.0,
                self.correct(),
                self.total()
            ),
            None => write!(f, "accuracy: n/a (0 samples)"),
        }
    }
}
