//! Mergeable summary statistics
//!
//! [`SummaryStats`] keeps a count, a compensated sum and Welford's running
//! mean and second moment. Two accumulators over disjoint rows can be
//! combined with [`SummaryStats::merge`] (Chan et al.), which lets the
//! aggregator process chunks independently.

/// Neumaier compensated summation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    /// Add one value
    pub fn add(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - total) + value;
        } else {
            self.compensation += (value - total) + self.sum;
        }
        self.sum = total;
    }

    /// Fold another partial sum into this one
    pub fn merge(&mut self, other: &CompensatedSum) {
        self.add(other.sum);
        self.compensation += other.compensation;
    }

    /// The corrected total
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Count, sum, mean and variance of a stream of values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryStats {
    count: u64,
    sum: CompensatedSum,
    mean: f64,
    m2: f64,
}

impl SummaryStats {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value. NaN marks a missing value and is skipped.
    pub fn push(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.count += 1;
        self.sum.add(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Combine with statistics over a disjoint set of values
    pub fn merge(&mut self, other: &SummaryStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let left = self.count as f64;
        let right = other.count as f64;
        let total = left + right;
        let delta = other.mean - self.mean;

        self.mean += delta * right / total;
        self.m2 += other.m2 + delta * delta * left * right / total;
        self.count += other.count;
        self.sum.merge(&other.sum);
    }

    /// Number of non-missing values seen
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Compensated sum, 0 when empty
    pub fn sum(&self) -> f64 {
        self.sum.value()
    }

    /// Arithmetic mean, NaN when empty
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum() / self.count as f64
        }
    }

    /// Sample variance (N-1), NaN with fewer than two values
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Sample standard deviation (N-1), NaN with fewer than two values
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl FromIterator<f64> for SummaryStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = SummaryStats::new();
        for value in iter {
            stats.push(value);
        }
        stats
    }
}
