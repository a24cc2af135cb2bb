//! Threshold triggers over filter windows

use serde::Serialize;

use crate::expression::RelOp;

use super::window::{Aggregate, WindowAggregate};

/// A threshold condition on one aggregate of a filter's windows
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    trigger_id: u32,
    filter_id: u32,
    field_name: String,
    column: Option<usize>,
    aggregate: Aggregate,
    op: RelOp,
    threshold: f64,
}

impl Trigger {
    pub fn new(
        trigger_id: u32,
        filter_id: u32,
        field_name: impl Into<String>,
        column: Option<usize>,
        aggregate: Aggregate,
        op: RelOp,
        threshold: f64,
    ) -> Self {
        Self {
            trigger_id,
            filter_id,
            field_name: field_name.into(),
            column,
            aggregate,
            op,
            threshold,
        }
    }

    pub fn trigger_id(&self) -> u32 {
        self.trigger_id
    }

    pub fn filter_id(&self) -> u32 {
        self.filter_id
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn aggregate(&self) -> Aggregate {
        self.aggregate
    }

    pub fn op(&self) -> RelOp {
        self.op
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Checks the condition against one window.
    pub fn evaluate(&self, window: &WindowAggregate) -> Option<Alert> {
        let value = window.value(self.aggregate, self.column)?;
        if !self.op.compare(&value, &self.threshold) {
            return None;
        }

        Some(Alert {
            trigger_id: self.trigger_id,
            filter_id: self.filter_id,
            field_name: self.field_name.clone(),
            aggregate: self.aggregate,
            op: self.op,
            threshold: self.threshold,
            value,
            window_start_ms: window.start_ms(),
            window_end_ms: window.end_ms(),
        })
    }
}

/// A trigger condition that held for a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub trigger_id: u32,
    pub filter_id: u32,
    pub field_name: String,
    pub aggregate: Aggregate,
    pub op: RelOp,
    pub threshold: f64,
    /// Aggregate value that satisfied the condition
    pub value: f64,
    pub window_start_ms: u64,
    pub window_end_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, DataType, Schema, Value};

    fn window_with(values: &[i32]) -> WindowAggregate {
        let schema = Schema::new(&[ColumnDef::new("a", DataType::Int)]).unwrap();
        let mut window = WindowAggregate::new(0, 1000);
        for (i, v) in values.iter().enumerate() {
            let payload = schema.encode(&[Value::Int(*v)]).unwrap();
            window.add(&schema.apply(i as u64 * 4, &payload, 0).unwrap());
        }
        window
    }

    #[test]
    fn test_count_trigger() {
        let trigger = Trigger::new(0, 0, "A", Some(0), Aggregate::Count, RelOp::Ge, 3.0);
        assert!(trigger.evaluate(&window_with(&[1, 2])).is_none());

        let alert = trigger.evaluate(&window_with(&[1, 2, 3])).unwrap();
        assert_eq!(alert.value, 3.0);
        assert_eq!(alert.window_end_ms, 1000);
    }

    #[test]
    fn test_column_trigger() {
        let trigger = Trigger::new(1, 0, "A", Some(0), Aggregate::Max, RelOp::Gt, 10.0);
        assert!(trigger.evaluate(&window_with(&[5, 10])).is_none());
        assert_eq!(trigger.evaluate(&window_with(&[5, 11])).unwrap().value, 11.0);

        let unbound = Trigger::new(2, 0, "A", None, Aggregate::Sum, RelOp::Gt, 0.0);
        assert!(unbound.evaluate(&window_with(&[5])).is_none());
    }
}
