use std::fmt;

/// Counts of (actual, predicted) label pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    classes: usize,
    // counts[actual][predicted]
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            counts: vec![vec![0; classes]; classes],
        }
    }

    /// Labels outside `0..classes` are ignored.
    pub fn from_labels(classes: usize, actual: &[usize], predicted: &[usize]) -> Self {
        let mut res = Self::new(classes);
        for (a, p) in actual.iter().zip(predicted.iter()) {
            res.add(*a, *p);
        }
        res
    }

    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.classes && predicted < self.classes {
            self.counts[actual][predicted] += 1;
        }
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.classes).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Share of predictions of `class` that were right.
    pub fn precision(&self, class: usize) -> f64 {
        let predicted: usize = (0..self.classes).map(|a| self.counts[a][class]).sum();
        ratio(self.counts[class][class], predicted)
    }

    /// Share of samples of `class` that were found.
    pub fn recall(&self, class: usize) -> f64 {
        let actual: usize = self.counts[class].iter().sum();
        ratio(self.counts[class][class], actual)
    }

    pub fn f1(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Confusion matrix (rows: actual, columns: predicted)")?;
        write!(f, "{:>8}", "")?;
        for p in 0..self.classes {
            write!(f, "{:>7}", p)?;
        }
        writeln!(f)?;
        for (a, row) in self.counts.iter().enumerate() {
            write!(f, "{:>8}", a)?;
            for count in row {
                write!(f, "{:>7}", count)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "{:>8}{:>11}{:>11}{:>11}", "class", "precision", "recall", "f1")?;
        for class in 0..self.classes {
            writeln!(
                f,
                "{:>8}{:>11.3}{:>11.3}{:>11.3}",
                class,
                self.precision(class),
                self.recall(class),
                self.f1(class)
            )?;
        }
        writeln!(
            f,
            "\nAccuracy: {:.2}% ({}/{})",
            100.0 * self.accuracy(),
            self.correct(),
            self.total()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_rates() {
        let actual = [0, 0, 1, 1, 2, 2];
        let predicted = [0, 1, 1, 1, 2, 0];
        let m = ConfusionMatrix::from_labels(3, &actual, &predicted);
        assert_eq!(m.total(), 6);
        assert_eq!(m.correct(), 4);
        assert!((m.accuracy() - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(m.count(0, 1), 1);
        assert!((m.precision(1) - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall(1) - 1.0).abs() < 1e-12);
        assert!((m.recall(0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_classes_do_not_divide_by_zero() {
        let m = ConfusionMatrix::from_labels(3, &[0], &[0]);
        assert_eq!(m.precision(2), 0.0);
        assert_eq!(m.recall(2), 0.0);
        assert_eq!(m.f1(2), 0.0);
        assert!(m.to_string().contains("Accuracy: 100.00%"));
    }

    #[test]
    fn out_of_range_labels_are_ignored() {
        let m = ConfusionMatrix::from_labels(2, &[0, 5], &[0, 1]);
        assert_eq!(m.total(), 1);
    }
}
