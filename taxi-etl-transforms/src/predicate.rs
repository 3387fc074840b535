//! Column predicates evaluated against a [`Table`]
//!
//! Predicates are evaluated column-at-a-time into a row mask. Numeric
//! comparisons coerce `Int64`, `UInt8` and `Float64` values to `f64`, except
//! that an `Int64` column compared with an `Int64` scalar is compared
//! exactly. A comparison involving NaN is false for every operator but `!=`.

use std::cmp::Ordering;
use std::fmt;

use taxi_etl_core::{ColumnData, DataType, DayOfWeek, Error, Result, Table};

/// Comparison operator for column predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl Operator {
    /// Apply the operator to two values. Unordered values only satisfy `Ne`.
    pub fn compare<T: PartialOrd>(self, left: &T, right: &T) -> bool {
        match left.partial_cmp(right) {
            None => self == Operator::Ne,
            Some(ordering) => match self {
                Operator::Eq => ordering == Ordering::Equal,
                Operator::Ne => ordering != Ordering::Equal,
                Operator::Lt => ordering == Ordering::Less,
                Operator::Le => ordering != Ordering::Greater,
                Operator::Gt => ordering == Ordering::Greater,
                Operator::Ge => ordering != Ordering::Less,
            },
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::Ne => write!(f, "!="),
            Operator::Lt => write!(f, "<"),
            Operator::Le => write!(f, "<="),
            Operator::Gt => write!(f, ">"),
            Operator::Ge => write!(f, ">="),
        }
    }
}

/// Scalar value for predicates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// 64-bit integer
    Int64(i64),
    /// 64-bit float
    Float64(f64),
    /// 8-bit unsigned integer
    UInt8(u8),
    /// Day of week
    DayOfWeek(DayOfWeek),
}

impl Scalar {
    /// The data type of this value
    pub fn data_type(self) -> DataType {
        match self {
            Scalar::Int64(_) => DataType::Int64,
            Scalar::Float64(_) => DataType::Float64,
            Scalar::UInt8(_) => DataType::UInt8,
            Scalar::DayOfWeek(_) => DataType::DayOfWeek,
        }
    }

    fn as_f64(self) -> Option<f64> {
        match self {
            Scalar::Int64(v) => Some(v as f64),
            Scalar::Float64(v) => Some(v),
            Scalar::UInt8(v) => Some(f64::from(v)),
            Scalar::DayOfWeek(_) => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float64(value)
    }
}

impl From<u8> for Scalar {
    fn from(value: u8) -> Self {
        Scalar::UInt8(value)
    }
}

impl From<DayOfWeek> for Scalar {
    fn from(value: DayOfWeek) -> Self {
        Scalar::DayOfWeek(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::Float64(v) => write!(f, "{v}"),
            Scalar::UInt8(v) => write!(f, "{v}"),
            Scalar::DayOfWeek(v) => write!(f, "'{v}'"),
        }
    }
}

/// Predicate on a single column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPredicate {
    /// Column name
    pub column: String,
    /// Operator
    pub op: Operator,
    /// Value to compare against
    pub value: Scalar,
}

/// Predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Column comparison
    Column(ColumnPredicate),

    /// Column value is one of a set
    In {
        /// Column name
        column: String,
        /// Accepted values
        values: Vec<Scalar>,
    },

    /// AND of multiple predicates; empty means always true
    And(Vec<Predicate>),
}

impl Predicate {
    /// Build a column comparison
    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<Scalar>) -> Self {
        Predicate::Column(ColumnPredicate {
            column: column.into(),
            op,
            value: value.into(),
        })
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::compare(column, Operator::Gt, value)
    }

    /// `column >= value`
    pub fn ge(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::compare(column, Operator::Ge, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::compare(column, Operator::Lt, value)
    }

    /// `column <= value`
    pub fn le(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::compare(column, Operator::Le, value)
    }

    /// `column != value`
    pub fn ne(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::compare(column, Operator::Ne, value)
    }

    /// Build a set-membership predicate
    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an AND predicate, flattening nested ANDs
    pub fn and(predicates: Vec<Predicate>) -> Self {
        let mut flattened = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            match predicate {
                Predicate::And(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }
        if flattened.len() == 1 {
            flattened.remove(0)
        } else {
            Predicate::And(flattened)
        }
    }

    /// Evaluate into a row mask with one entry per table row
    pub fn evaluate(&self, table: &Table) -> Result<Vec<bool>> {
        match self {
            Predicate::Column(predicate) => {
                compare_column(table, &predicate.column, predicate.op, predicate.value)
            }
            Predicate::In { column, values } => {
                let mut mask = vec![false; table.row_count()];
                for &value in values {
                    let matches = compare_column(table, column, Operator::Eq, value)?;
                    for (slot, hit) in mask.iter_mut().zip(matches) {
                        *slot |= hit;
                    }
                }
                // Still resolve the column so an empty set reports a missing column
                table.column_by_name(column)?;
                Ok(mask)
            }
            Predicate::And(predicates) => {
                let mut mask = vec![true; table.row_count()];
                for predicate in predicates {
                    let other = predicate.evaluate(table)?;
                    for (slot, keep) in mask.iter_mut().zip(other) {
                        *slot &= keep;
                    }
                }
                Ok(mask)
            }
        }
    }

    /// Number of rows satisfying the predicate
    pub fn count(&self, table: &Table) -> Result<usize> {
        Ok(self.evaluate(table)?.into_iter().filter(|&keep| keep).count())
    }

    /// New table with only the rows satisfying the predicate
    pub fn filter(&self, table: &Table) -> Result<Table> {
        let mask = self.evaluate(table)?;
        table.select(&mask)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Column(p) => write!(f, "{} {} {}", p.column, p.op, p.value),
            Predicate::In { column, values } => {
                write!(f, "{column} IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Predicate::And(predicates) if predicates.is_empty() => write!(f, "TRUE"),
            Predicate::And(predicates) => {
                for (i, predicate) in predicates.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "({predicate})")?;
                }
                Ok(())
            }
        }
    }
}

fn compare_column(table: &Table, name: &str, op: Operator, value: Scalar) -> Result<Vec<bool>> {
    let column = table.column_by_name(name)?;
    let data = column.data();

    let mask = match (data, value) {
        (ColumnData::Int64(values), Scalar::Int64(rhs)) => {
            values.iter().map(|v| op.compare(v, &rhs)).collect()
        }
        (ColumnData::DayOfWeek(values), Scalar::DayOfWeek(rhs)) => {
            values.iter().map(|v| op.compare(v, &rhs)).collect()
        }
        _ => match (data, value.as_f64()) {
            (ColumnData::Float64(values), Some(rhs)) => {
                values.iter().map(|v| op.compare(v, &rhs)).collect()
            }
            (ColumnData::Int64(values), Some(rhs)) => {
                values.iter().map(|&v| op.compare(&(v as f64), &rhs)).collect()
            }
            (ColumnData::UInt8(values), Some(rhs)) => {
                values.iter().map(|&v| op.compare(&f64::from(v), &rhs)).collect()
            }
            _ => return Err(Error::type_mismatch(name, value.data_type(), data.data_type())),
        },
    };

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn trips() -> Table {
        Table::from_columns([
            ("trip_distance", ColumnData::Float64(vec![0.5, 12.0, f64::NAN, 6.0])),
            ("passenger_count", ColumnData::Int64(vec![1, 2, 3, 4])),
            ("hour", ColumnData::UInt8(vec![7, 12, 18, 23])),
            (
                "day_of_week",
                ColumnData::DayOfWeek(vec![
                    DayOfWeek::Monday,
                    DayOfWeek::Saturday,
                    DayOfWeek::Sunday,
                    DayOfWeek::Friday,
                ]),
            ),
        ])
        .unwrap()
    }

    #[test_case(Operator::Eq, 1.0, 1.0 => true)]
    #[test_case(Operator::Ne, 1.0, 2.0 => true)]
    #[test_case(Operator::Lt, 1.0, 2.0 => true)]
    #[test_case(Operator::Le, 2.0, 2.0 => true)]
    #[test_case(Operator::Gt, 2.0, 2.0 => false)]
    #[test_case(Operator::Ge, 2.0, 2.0 => true)]
    #[test_case(Operator::Gt, f64::NAN, 0.0 => false)]
    #[test_case(Operator::Ne, f64::NAN, 0.0 => true)]
    fn test_operator_compare(op: Operator, left: f64, right: f64) -> bool {
        op.compare(&left, &right)
    }

    #[test]
    fn test_numeric_coercion() {
        let table = trips();
        let mask = Predicate::gt("trip_distance", 5i64).evaluate(&table).unwrap();
        assert_eq!(mask, vec![false, true, false, true]);

        let mask = Predicate::ge("passenger_count", 2.5).evaluate(&table).unwrap();
        assert_eq!(mask, vec![false, false, true, true]);
    }

    #[test]
    fn test_membership() {
        let table = trips();
        let rush = Predicate::is_in("hour", [7u8, 8, 9, 17, 18, 19]);
        assert_eq!(rush.count(&table).unwrap(), 2);

        let weekend = Predicate::is_in("day_of_week", [DayOfWeek::Saturday, DayOfWeek::Sunday]);
        assert_eq!(weekend.evaluate(&table).unwrap(), vec![false, true, true, false]);

        let none = Predicate::is_in("hour", Vec::<u8>::new());
        assert_eq!(none.count(&table).unwrap(), 0);
    }

    #[test]
    fn test_and_and_filter() {
        let table = trips();
        let predicate = Predicate::and(vec![
            Predicate::gt("trip_distance", 5.0),
            Predicate::ge("passenger_count", 2i64),
        ]);
        let filtered = predicate.filter(&table).unwrap();
        assert_eq!(filtered.int64("passenger_count").unwrap(), &[2, 4]);
        assert_eq!(
            predicate.to_string(),
            "(trip_distance > 5) AND (passenger_count >= 2)"
        );
        assert_eq!(Predicate::and(vec![]).count(&table).unwrap(), 4);
    }

    #[test]
    fn test_errors() {
        let table = trips();
        assert!(matches!(
            Predicate::gt("fare", 1.0).evaluate(&table),
            Err(Error::ColumnNotFound(_))
        ));
        assert!(matches!(
            Predicate::is_in("trip_distance", [DayOfWeek::Monday]).evaluate(&table),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            Predicate::is_in("fare", Vec::<i64>::new()).evaluate(&table),
            Err(Error::ColumnNotFound(_))
        ));
    }
}
