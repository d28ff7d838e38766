use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Column, Field, FieldType, Record, Schema};

use super::{Buffered, MemoryScan, OpIterator, RecordSource};

/// Reduction computed by an [`Aggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Count,
    /// Sum divided by count, rounded toward zero
    Avg,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Count => "count",
            AggregateOp::Avg => "avg",
        };
        f.write_str(s)
    }
}

/// Running state of one group. Arithmetic wraps at 32 bits.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    value: Option<i32>,
    count: i32,
}

impl Accumulator {
    fn merge(&mut self, op: AggregateOp, v: i32) {
        self.count = self.count.wrapping_add(1);
        let value = match op {
            AggregateOp::Min => self.value.map_or(v, |cur| cur.min(v)),
            AggregateOp::Max => self.value.map_or(v, |cur| cur.max(v)),
            AggregateOp::Sum | AggregateOp::Avg => self.value.unwrap_or(0).wrapping_add(v),
            AggregateOp::Count => self.count,
        };
        self.value = Some(value);
    }

    fn result(&self, op: AggregateOp) -> i32 {
        match op {
            AggregateOp::Count => self.count,
            AggregateOp::Avg if self.count != 0 => self.value.unwrap_or(0).wrapping_div(self.count),
            _ => self.value.unwrap_or(0),
        }
    }
}

/// Computes one aggregate over a stream of records, optionally grouped by
/// one field.
///
/// Output records are `(group, aggregate)`, or just `(aggregate)` without
/// grouping. Only `Count` is defined over string fields.
#[derive(Debug, Clone)]
pub struct Aggregator {
    group_field: Option<usize>,
    agg_field: usize,
    op: AggregateOp,
    schema: Arc<Schema>,
    groups: HashMap<Option<Field>, Accumulator>,
    /// Group keys in first-seen order
    order: Vec<Option<Field>>,
}

impl Aggregator {
    /// Creates an aggregator for records of `input`.
    pub fn new(input: &Schema, group_field: Option<usize>, agg_field: usize, op: AggregateOp) -> Result<Self> {
        let agg_type = input.field_type(agg_field)?;
        if matches!(agg_type, FieldType::Str(_)) && op != AggregateOp::Count {
            return Err(DbError::UnsupportedAggregate(format!("{} over a string field", op)));
        }

        let agg_name = format!("{}({})", op, input.field_name(agg_field)?.unwrap_or("null"));
        let mut columns = Vec::with_capacity(2);
        if let Some(index) = group_field {
            let group_type = input.field_type(index)?;
            columns.push(match input.field_name(index)? {
                Some(name) => Column::new(name, group_type),
                None => Column::unnamed(group_type),
            });
        }
        columns.push(Column::new(agg_name, FieldType::Int));

        Ok(Self {
            group_field,
            agg_field,
            op,
            schema: Arc::new(Schema::new(columns)),
            groups: HashMap::new(),
            order: Vec::new(),
        })
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn agg_field(&self) -> usize {
        self.agg_field
    }

    /// Returns the schema of the output records.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Folds one record into its group.
    pub fn merge(&mut self, record: &Record) -> Result<()> {
        let key = match self.group_field {
            Some(index) => Some(record.field(index)?.clone()),
            None => None,
        };
        let v = match record.field(self.agg_field)? {
            Field::Int(v) => *v,
            Field::Str(_) if self.op == AggregateOp::Count => 0,
            Field::Str(_) => {
                return Err(DbError::UnsupportedAggregate(format!("{} over a string field", self.op)))
            }
        };

        let op = self.op;
        if !self.groups.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.groups.entry(key).or_default().merge(op, v);
        Ok(())
    }

    /// Returns one record per group seen so far.
    pub fn results(&self) -> Result<Vec<Record>> {
        self.order
            .iter()
            .filter_map(|key| self.groups.get(key).map(|acc| (key, acc)))
            .map(|(key, acc)| {
                let value = Field::Int(acc.result(self.op));
                let fields = match key {
                    Some(group) => vec![group.clone(), value],
                    None => vec![value],
                };
                Record::from_fields(Arc::clone(&self.schema), fields)
            })
            .collect()
    }

    /// Returns an unopened iterator over the current results.
    pub fn iterator(&self) -> Result<Buffered<MemoryScan>> {
        Ok(MemoryScan::new(Arc::clone(&self.schema), self.results()?).buffered())
    }

    /// Forgets every group.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.order.clear();
    }
}

/// Aggregates the records of its child.
///
/// Opening drains the child into an [`Aggregator`]; the groups are then
/// yielded one record each. Rewinding replays the groups without reading
/// the child again.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    aggregator: Aggregator,
    results: Option<Buffered<MemoryScan>>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let aggregator = Aggregator::new(child.schema(), group_field, agg_field, op)?;
        Ok(Self {
            child,
            aggregator,
            results: None,
        })
    }

    pub fn op(&self) -> AggregateOp {
        self.aggregator.op()
    }

    pub fn group_field(&self) -> Option<usize> {
        self.aggregator.group_field()
    }

    pub fn agg_field(&self) -> usize {
        self.aggregator.agg_field()
    }

    /// Returns the name of the group field in the output, if grouped.
    pub fn group_field_name(&self) -> Option<&str> {
        self.group_field()
            .and_then(|_| self.aggregator.schema().column(0))
            .and_then(Column::name)
    }

    /// Returns the name of the aggregate field in the output, e.g. `sum(price)`.
    pub fn aggregate_field_name(&self) -> Option<&str> {
        let schema = self.aggregator.schema();
        schema.column(schema.num_fields() - 1).and_then(Column::name)
    }
}

impl RecordSource for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.aggregator.clear();
        while let Some(record) = self.child.next()? {
            self.aggregator.merge(&record)?;
        }

        let mut results = self.aggregator.iterator()?;
        results.open()?;
        self.results = Some(results);
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Record>> {
        match self.results.as_mut() {
            Some(results) => results.next(),
            None => Ok(None),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match self.results.as_mut() {
            Some(results) => results.rewind(),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        self.results = None;
        self.child.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        self.aggregator.schema()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn grouped_input(rows: &[(i32, i32)]) -> (Arc<Schema>, Vec<Record>) {
        let schema = Schema::builder()
            .column("g", FieldType::Int)
            .column("v", FieldType::Int)
            .build_arc();
        let records = rows
            .iter()
            .map(|&(g, v)| Record::from_fields(schema.clone(), vec![g.into(), v.into()]).unwrap())
            .collect();
        (schema, records)
    }

    fn pairs(records: Vec<Record>) -> HashSet<(i32, i32)> {
        records
            .iter()
            .map(|r| {
                (
                    r.field(0).unwrap().as_int().unwrap(),
                    r.field(1).unwrap().as_int().unwrap(),
                )
            })
            .collect()
    }

    fn run(op: AggregateOp, group: Option<usize>, rows: &[(i32, i32)]) -> Vec<Record> {
        let (schema, records) = grouped_input(rows);
        let mut agg = Aggregator::new(&schema, group, 1, op).unwrap();
        for r in &records {
            agg.merge(r).unwrap();
        }
        agg.results().unwrap()
    }

    const ROWS: [(i32, i32); 5] = [(1, 10), (1, 20), (2, 5), (2, 8), (1, 3)];

    #[test]
    fn test_grouped_reductions() {
        let expect = |op, set: &[(i32, i32)]| {
            assert_eq!(pairs(run(op, Some(0), &ROWS)), set.iter().copied().collect::<HashSet<_>>());
        };
        expect(AggregateOp::Sum, &[(1, 33), (2, 13)]);
        expect(AggregateOp::Min, &[(1, 3), (2, 5)]);
        expect(AggregateOp::Max, &[(1, 20), (2, 8)]);
        expect(AggregateOp::Count, &[(1, 3), (2, 2)]);
        expect(AggregateOp::Avg, &[(1, 11), (2, 6)]);
    }

    #[test]
    fn test_ungrouped() {
        let results = run(AggregateOp::Avg, None, &ROWS);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].len(), 1);
        assert_eq!(results[0].field(0).unwrap(), &Field::Int(46 / 5));
    }

    #[test]
    fn test_sum_wraps() {
        let results = run(AggregateOp::Sum, None, &[(0, i32::MAX), (0, 1)]);
        assert_eq!(results[0].field(0).unwrap(), &Field::Int(i32::MIN));
    }

    #[test]
    fn test_string_fields() {
        let schema = Schema::builder()
            .column("dept", FieldType::Str(8))
            .column("name", FieldType::Str(8))
            .build_arc();
        assert!(matches!(
            Aggregator::new(&schema, Some(0), 1, AggregateOp::Sum),
            Err(DbError::UnsupportedAggregate(_))
        ));

        let mut agg = Aggregator::new(&schema, Some(0), 1, AggregateOp::Count).unwrap();
        for (dept, name) in [("eng", "ann"), ("ops", "bo"), ("eng", "cy")] {
            let r = Record::from_fields(schema.clone(), vec![dept.into(), name.into()]).unwrap();
            agg.merge(&r).unwrap();
        }

        let counts: HashSet<(String, i32)> = agg
            .results()
            .unwrap()
            .iter()
            .map(|r| {
                (
                    r.field(0).unwrap().as_str().unwrap().to_string(),
                    r.field(1).unwrap().as_int().unwrap(),
                )
            })
            .collect();
        let expected: HashSet<(String, i32)> = [("eng".to_string(), 2), ("ops".to_string(), 1)].into_iter().collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn test_output_names() {
        let (schema, records) = grouped_input(&ROWS);
        let child = Box::new(MemoryScan::new(schema, records).buffered());
        let agg = Aggregate::new(child, 1, Some(0), AggregateOp::Sum).unwrap();
        assert_eq!(agg.group_field_name(), Some("g"));
        assert_eq!(agg.aggregate_field_name(), Some("sum(v)"));
        assert_eq!(agg.schema().num_fields(), 2);
    }

    #[test]
    fn test_aggregate_operator_rewind() {
        let (schema, records) = grouped_input(&ROWS);
        let child = Box::new(MemoryScan::new(schema, records).buffered());
        let mut agg = Aggregate::new(child, 1, None, AggregateOp::Count).unwrap().buffered();

        agg.open().unwrap();
        let first = agg.next().unwrap().unwrap();
        assert_eq!(first.field(0).unwrap(), &Field::Int(5));
        assert!(agg.next().unwrap().is_none());

        agg.rewind().unwrap();
        assert_eq!(agg.next().unwrap(), Some(first));
        agg.close();
    }
}
