//! Table-to-table transformation trait and chaining

use crate::error::Result;
use crate::table::Table;

/// A pure Table -> Table stage
pub trait TableTransform: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Produce a new table from `input`
    fn transform(&self, input: Table) -> Result<Table>;
}

/// Rows seen by one transform in a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    /// Name of the transform
    pub name: String,
    /// Rows before the transform ran
    pub rows_in: usize,
    /// Rows after the transform ran
    pub rows_out: usize,
}

/// A chain of transforms applied left to right
#[derive(Default)]
pub struct TransformChain {
    transforms: Vec<Box<dyn TableTransform>>,
}

impl TransformChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform to the end of the chain
    #[must_use]
    pub fn then<T: TableTransform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Names of the transforms, in order
    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Number of transforms
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Check if the chain has no transforms
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Run every transform and report row counts around each one
    pub fn apply_observed(&self, input: Table) -> Result<(Table, Vec<TransformOutcome>)> {
        let mut current = input;
        let mut outcomes = Vec::with_capacity(self.transforms.len());

        for transform in &self.transforms {
            let rows_in = current.row_count();
            current = transform.transform(current)?;
            let rows_out = current.row_count();
            tracing::debug!(step = transform.name(), rows_in, rows_out, "transform applied");
            outcomes.push(TransformOutcome {
                name: transform.name().to_string(),
                rows_in,
                rows_out,
            });
        }

        Ok((current, outcomes))
    }
}

impl TableTransform for TransformChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn transform(&self, input: Table) -> Result<Table> {
        self.apply_observed(input).map(|(table, _)| table)
    }
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformChain")
            .field("transforms", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnData;

    struct KeepEven;

    impl TableTransform for KeepEven {
        fn name(&self) -> &str {
            "keep_even"
        }

        fn transform(&self, input: Table) -> Result<Table> {
            let values = input.int64("n")?;
            let mask: Vec<bool> = values.iter().map(|v| v % 2 == 0).collect();
            input.select(&mask)
        }
    }

    struct Head(usize);

    impl TableTransform for Head {
        fn name(&self) -> &str {
            "head"
        }

        fn transform(&self, input: Table) -> Result<Table> {
            Ok(input.head(self.0))
        }
    }

    #[test]
    fn test_chain_applies_in_order() {
        let table = Table::from_columns([("n", ColumnData::Int64(vec![1, 2, 3, 4, 5, 6]))]).unwrap();
        let chain = TransformChain::new().then(KeepEven).then(Head(2));

        let (output, outcomes) = chain.apply_observed(table).unwrap();
        assert_eq!(output.int64("n").unwrap(), &[2, 4]);
        assert_eq!(chain.names(), vec!["keep_even", "head"]);
        assert_eq!(outcomes[0].rows_in, 6);
        assert_eq!(outcomes[0].rows_out, 3);
        assert_eq!(outcomes[1].rows_out, 2);
    }

    #[test]
    fn test_chain_propagates_errors() {
        let table = Table::from_columns([("m", ColumnData::Int64(vec![1]))]).unwrap();
        let chain = TransformChain::new().then(KeepEven);
        assert!(chain.transform(table).is_err());
    }
}
