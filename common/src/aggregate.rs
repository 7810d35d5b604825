use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    record::{LookupError, Measurement, kind_name, resolve, to_label},
    spec::{AxisSpec, FilterSpec, StackSpec},
    util::last_segment,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("Record {index}: {source}")]
    Lookup {
        index: usize,
        #[source]
        source: LookupError,
    },
    #[error("Record {index}: value of `{path}` is not numeric ({kind})")]
    NotNumeric {
        index: usize,
        path: String,
        kind: &'static str,
    },
    #[error("No results matched the filter")]
    NoRecords,
    #[error("No results for group `{0}`")]
    MissingGroup(String),
    #[error("No `{stack}` result for group `{group}`, bar `{bar}`")]
    MissingEntry {
        group: String,
        bar: String,
        stack: String,
    },
    #[error("Group `{group}` has bars [{found}], expected [{expected}]")]
    NonUniformBars {
        group: String,
        found: String,
        expected: String,
    },
    #[error("{found} values given for a {groups}x{bars}x{stacks} cube")]
    ShapeMismatch {
        groups: usize,
        bars: usize,
        stacks: usize,
        found: usize,
    },
}

/// How bar labels are derived when the bar spec carries no explicit list
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BarSet {
    /// Sorted bars of the first group, other groups are assumed to match
    #[default]
    FirstGroup,
    /// Like [`BarSet::FirstGroup`] but every group must have exactly the same bars
    Uniform,
}

/// Dense `groups x bars x stacks` measurements with their axis labels
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCube {
    pub groups: Vec<String>,
    pub bars: Vec<String>,
    pub stacks: Vec<String>,
    values: Vec<f64>,
}

impl ResultCube {
    /// `values` holds one entry per (group, bar, stack), stacks varying fastest
    pub fn new(
        groups: Vec<String>,
        bars: Vec<String>,
        stacks: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self, AggregateError> {
        if values.len() != groups.len() * bars.len() * stacks.len() {
            return Err(AggregateError::ShapeMismatch {
                groups: groups.len(),
                bars: bars.len(),
                stacks: stacks.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            groups,
            bars,
            stacks,
            values,
        })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.groups.len(), self.bars.len(), self.stacks.len())
    }

    pub fn get(&self, group: usize, bar: usize, stack: usize) -> Option<f64> {
        let (groups, bars, stacks) = self.shape();
        if group >= groups || bar >= bars || stack >= stacks {
            return None;
        }
        self.values.get((group * bars + bar) * stacks + stack).copied()
    }

    /// Every value with its `(group, bar, stack)` index
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize, usize), f64)> + '_ {
        let (_, bars, stacks) = self.shape();
        self.values.iter().enumerate().map(move |(i, &value)| {
            let (cell, stack) = (i / stacks, i % stacks);
            ((cell / bars, cell % bars, stack), value)
        })
    }
}

type Table = HashMap<String, HashMap<String, HashMap<String, f64>>>;

pub fn aggregate(
    records: &[Value],
    filter: &FilterSpec,
    group: &AxisSpec,
    bar: &AxisSpec,
    stacks: &[StackSpec],
    bar_set: BarSet,
) -> Result<ResultCube, AggregateError> {
    let lookup = |index: usize| move |source| AggregateError::Lookup { index, source };

    let mut table = Table::new();
    let mut skipped = 0;
    for (index, record) in records.iter().enumerate() {
        let value = resolve(record, &filter.path).map_err(lookup(index))?;
        if to_label(value) != filter.expected {
            skipped += 1;
            continue;
        }

        let group_label = axis_label(record, group).map_err(lookup(index))?;
        let bar_label = axis_label(record, bar).map_err(lookup(index))?;
        for stack in stacks {
            let value = resolve(record, &stack.path).map_err(lookup(index))?;
            let number = Measurement::classify(value)
                .and_then(|m| m.reduce())
                .ok_or_else(|| AggregateError::NotNumeric {
                    index,
                    path: stack.path.to_string(),
                    kind: kind_name(value),
                })?;
            table
                .entry(group_label.clone())
                .or_default()
                .entry(bar_label.clone())
                .or_default()
                .insert(stack.label.clone(), number);
        }
    }
    info!(
        "Using {} of {} results ({skipped} filtered out)",
        records.len() - skipped,
        records.len()
    );
    if table.is_empty() {
        return Err(AggregateError::NoRecords);
    }

    let groups = match &group.labels {
        Some(labels) => labels.clone(),
        None => table.keys().cloned().sorted().collect(),
    };

    let bars = match &bar.labels {
        Some(labels) => labels.clone(),
        None => {
            let first = groups.first().ok_or(AggregateError::NoRecords)?;
            let bars = table
                .get(first)
                .ok_or_else(|| AggregateError::MissingGroup(first.clone()))?
                .keys()
                .cloned()
                .sorted()
                .collect::<Vec<_>>();
            if bar_set == BarSet::Uniform {
                check_uniform(&table, &groups, &bars)?;
            }
            bars
        }
    };

    let stack_labels = stacks.iter().map(|s| s.label.clone()).collect::<Vec<_>>();
    debug!("Groups: {groups:?}, bars: {bars:?}, stacks: {stack_labels:?}");

    let mut values = Vec::with_capacity(groups.len() * bars.len() * stack_labels.len());
    for group_label in &groups {
        let group_entry = table
            .get(group_label)
            .ok_or_else(|| AggregateError::MissingGroup(group_label.clone()))?;
        for bar_label in &bars {
            for stack_label in &stack_labels {
                let value = group_entry
                    .get(bar_label)
                    .and_then(|bar_entry| bar_entry.get(stack_label))
                    .ok_or_else(|| AggregateError::MissingEntry {
                        group: group_label.clone(),
                        bar: bar_label.clone(),
                        stack: stack_label.clone(),
                    })?;
                values.push(*value);
            }
        }
    }

    ResultCube::new(groups, bars, stack_labels, values)
}

fn axis_label(record: &Value, axis: &AxisSpec) -> Result<String, LookupError> {
    let value = resolve(record, &axis.path)?;
    Ok(last_segment(&to_label(value)).to_owned())
}

fn check_uniform(table: &Table, groups: &[String], bars: &[String]) -> Result<(), AggregateError> {
    let expected = bars.iter().collect::<HashSet<_>>();
    for group in groups {
        let Some(entry) = table.get(group) else {
            return Err(AggregateError::MissingGroup(group.clone()));
        };
        if entry.keys().collect::<HashSet<_>>() != expected {
            return Err(AggregateError::NonUniformBars {
                group: group.clone(),
                found: entry.keys().sorted().join(", "),
                expected: bars.join(", "),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::spec::parse_stacks;

    fn run(records: &[Value], group: &str, bar: &str, stacks: &str) -> Result<ResultCube, AggregateError> {
        aggregate(
            records,
            &FilterSpec::parse("mode=thrpt").unwrap(),
            &AxisSpec::parse(group).unwrap(),
            &AxisSpec::parse(bar).unwrap(),
            &parse_stacks(stacks).unwrap(),
            BarSet::FirstGroup,
        )
    }

    fn record(store: &str, query: &str, score: Value) -> Value {
        json!({
            "mode": "thrpt",
            "benchmark": format!("com.example.QueryBenchmark/{store}"),
            "params": {"query": query},
            "primaryMetric": {"score": score, "ingest": 1.0},
        })
    }

    #[test]
    fn builds_sorted_cube() {
        let records = vec![
            record("scan", "b", json!(4)),
            record("csc", "a", json!(1)),
            record("scan", "a", json!(3)),
            record("csc", "b", json!(2)),
            json!({"mode": "avgt"}),
        ];
        let cube = run(
            &records,
            "benchmark",
            "params/query",
            "primaryMetric/score=Query,primaryMetric/ingest=Ingest",
        )
        .unwrap();
        assert_eq!(cube.shape(), (2, 2, 2));
        assert_eq!(cube.groups, ["csc", "scan"]);
        assert_eq!(cube.bars, ["a", "b"]);
        assert_eq!(cube.stacks, ["Query", "Ingest"]);
        assert_eq!(cube.get(0, 0, 0), Some(1.0));
        assert_eq!(cube.get(0, 1, 0), Some(2.0));
        assert_eq!(cube.get(1, 0, 0), Some(3.0));
        assert_eq!(cube.get(1, 1, 0), Some(4.0));
        assert_eq!(cube.get(1, 1, 1), Some(1.0));
    }

    #[test]
    fn explicit_labels_override_sorting() {
        let records = vec![record("A", "q", json!(1)), record("Z", "q", json!(2))];
        let cube = run(&records, "benchmark=Z,A", "params/query", "primaryMetric/score=S").unwrap();
        assert_eq!(cube.groups, ["Z", "A"]);
        assert_eq!(cube.get(0, 0, 0), Some(2.0));
        assert_eq!(cube.get(1, 0, 0), Some(1.0));
    }

    #[test]
    fn explicit_labels_can_select_a_subset() {
        let records = vec![record("A", "q", json!(1)), record("Z", "q", json!(2))];
        let cube = run(&records, "benchmark=A", "params/query", "primaryMetric/score=S").unwrap();
        assert_eq!(cube.shape(), (1, 1, 1));
    }

    #[test]
    fn last_record_wins() {
        let records = vec![record("A", "q", json!(1)), record("A", "q", json!(7))];
        let cube = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap();
        assert_eq!(cube.get(0, 0, 0), Some(7.0));
    }

    #[test]
    fn list_metrics_are_averaged() {
        let records = vec![record("A", "q", json!([[1, 2], [3]]))];
        let cube = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap();
        assert_eq!(cube.get(0, 0, 0), Some(2.0));
    }

    #[test]
    fn numeric_filter_values_compare_as_text() {
        let records = vec![
            json!({"threads": 4, "name": "g", "bar": "b", "score": 1}),
            json!({"threads": 8, "name": "g", "bar": "b", "score": 2}),
        ];
        let cube = aggregate(
            &records,
            &FilterSpec::parse("threads=8").unwrap(),
            &AxisSpec::parse("name").unwrap(),
            &AxisSpec::parse("bar").unwrap(),
            &parse_stacks("score=S").unwrap(),
            BarSet::FirstGroup,
        )
        .unwrap();
        assert_eq!(cube.get(0, 0, 0), Some(2.0));
    }

    #[test]
    fn missing_filter_key_is_fatal() {
        let records = vec![record("A", "q", json!(1)), json!({"other": 1})];
        let err = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap_err();
        assert!(matches!(
            err,
            AggregateError::Lookup {
                index: 1,
                source: LookupError::MissingKey { .. }
            }
        ));
    }

    #[test]
    fn missing_combination_is_fatal() {
        let records = vec![
            record("A", "a", json!(1)),
            record("A", "b", json!(1)),
            record("B", "a", json!(1)),
        ];
        let err = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap_err();
        assert_eq!(
            err,
            AggregateError::MissingEntry {
                group: "B".to_owned(),
                bar: "b".to_owned(),
                stack: "S".to_owned(),
            }
        );
    }

    #[test]
    fn extra_bars_outside_first_group_are_dropped() {
        let records = vec![
            record("A", "a", json!(1)),
            record("B", "a", json!(2)),
            record("B", "b", json!(3)),
        ];
        let cube = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap();
        assert_eq!(cube.bars, ["a"]);
        assert_eq!(cube.get(1, 0, 0), Some(2.0));
    }

    #[test]
    fn uniform_mode_rejects_differing_bars() {
        let records = vec![
            record("A", "a", json!(1)),
            record("B", "a", json!(2)),
            record("B", "b", json!(3)),
        ];
        let err = aggregate(
            &records,
            &FilterSpec::parse("mode=thrpt").unwrap(),
            &AxisSpec::parse("benchmark").unwrap(),
            &AxisSpec::parse("params/query").unwrap(),
            &parse_stacks("primaryMetric/score=S").unwrap(),
            BarSet::Uniform,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AggregateError::NonUniformBars {
                group: "B".to_owned(),
                found: "a, b".to_owned(),
                expected: "a".to_owned(),
            }
        );
    }

    #[test]
    fn unknown_explicit_group_is_fatal() {
        let records = vec![record("A", "q", json!(1))];
        let err = run(&records, "benchmark=A,C", "params/query", "primaryMetric/score=S").unwrap_err();
        assert_eq!(err, AggregateError::MissingGroup("C".to_owned()));
    }

    #[test]
    fn no_matching_records() {
        let records = vec![json!({"mode": "avgt"})];
        let err = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap_err();
        assert_eq!(err, AggregateError::NoRecords);
    }

    #[test]
    fn non_numeric_metric() {
        let records = vec![record("A", "q", json!("fast"))];
        let err = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap_err();
        assert_eq!(
            err,
            AggregateError::NotNumeric {
                index: 0,
                path: "primaryMetric/score".to_owned(),
                kind: "string",
            }
        );
    }

    #[test]
    fn overflowing_series_is_not_numeric() {
        let records = vec![record("A", "q", json!([1e308, 1e308]))];
        let err = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap_err();
        assert_eq!(
            err,
            AggregateError::NotNumeric {
                index: 0,
                path: "primaryMetric/score".to_owned(),
                kind: "array",
            }
        );
    }

    #[test]
    fn infinite_string_is_not_numeric() {
        let records = vec![record("A", "q", json!("Infinity"))];
        let err = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap_err();
        assert!(matches!(err, AggregateError::NotNumeric { kind: "string", .. }));
    }

    #[test]
    fn cube_rejects_wrong_value_count() {
        let labels = |n: &str| vec![n.to_owned()];
        let err = ResultCube::new(labels("g"), labels("b"), labels("s"), vec![1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            AggregateError::ShapeMismatch {
                groups: 1,
                bars: 1,
                stacks: 1,
                found: 2,
            }
        );
    }

    #[test]
    fn cube_lookup_is_bounds_checked() {
        let labels = |prefix: &str, n: usize| -> Vec<String> {
            (0..n).map(|i| format!("{prefix}{i}")).collect()
        };
        let cube = ResultCube::new(
            labels("g", 2),
            labels("b", 2),
            labels("s", 3),
            (0..12).map(f64::from).collect(),
        )
        .unwrap();
        assert_eq!(cube.get(1, 0, 2), Some(8.0));
        // a stack index past the end must not alias into the next bar
        assert_eq!(cube.get(0, 0, 3), None);
        assert_eq!(cube.get(2, 0, 0), None);
        assert_eq!(cube.cells().nth(8), Some(((1, 0, 2), 8.0)));
        assert_eq!(cube.cells().count(), 12);
    }

    #[test]
    fn same_input_same_cube() {
        let records = vec![
            record("scan", "b", json!(4)),
            record("csc", "a", json!(1)),
            record("scan", "a", json!(3)),
            record("csc", "b", json!(2)),
        ];
        let first = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap();
        let second = run(&records, "benchmark", "params/query", "primaryMetric/score=S").unwrap();
        assert_eq!(first, second);
    }
}
