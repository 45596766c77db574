//! Result orderings

use std::cmp;
use std::fmt;

use cinnabar_exp::eval::operations::compare_order;
use cinnabar_exp::{evaluate, EvalContext, Expression, Value};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
    AscendingInsensitive,
    DescendingInsensitive,
}

impl SortOrder {
    pub fn is_ascending(self) -> bool {
        matches!(self, SortOrder::Ascending | SortOrder::AscendingInsensitive)
    }

    pub fn is_case_insensitive(self) -> bool {
        matches!(
            self,
            SortOrder::AscendingInsensitive | SortOrder::DescendingInsensitive
        )
    }
}

/// One sort key of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub expression: Expression,
    pub order: SortOrder,
}

impl Ordering {
    pub fn new(path: &str, order: SortOrder) -> Result<Self> {
        Ok(Self {
            expression: Expression::path(path)?,
            order,
        })
    }

    pub fn asc(path: &str) -> Result<Self> {
        Self::new(path, SortOrder::Ascending)
    }

    pub fn desc(path: &str) -> Result<Self> {
        Self::new(path, SortOrder::Descending)
    }

    fn key(&self, object: &Value, ctx: &EvalContext) -> Result<Value> {
        let value = evaluate(&self.expression, object, ctx)?;
        Ok(match value {
            Value::String(s) if self.order.is_case_insensitive() => Value::String(s.to_lowercase()),
            other => other,
        })
    }

    /// Compare two objects by this key. Nulls sort first in ascending
    /// order; values with no common order compare equal.
    pub fn compare(&self, a: &Value, b: &Value, ctx: &EvalContext) -> Result<cmp::Ordering> {
        Ok(compare_keys(self.order, &self.key(a, ctx)?, &self.key(b, ctx)?))
    }
}

fn compare_keys(order: SortOrder, a: &Value, b: &Value) -> cmp::Ordering {
    let ordering = match (a.is_null(), b.is_null()) {
        (true, true) => cmp::Ordering::Equal,
        (true, false) => cmp::Ordering::Less,
        (false, true) => cmp::Ordering::Greater,
        (false, false) => compare_order(a, b).unwrap_or(cmp::Ordering::Equal),
    };
    if order.is_ascending() {
        ordering
    } else {
        ordering.reverse()
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
            SortOrder::AscendingInsensitive => "asc ignore case",
            SortOrder::DescendingInsensitive => "desc ignore case",
        };
        write!(f, "{} {}", self.expression, suffix)
    }
}

/// Stable sort of `objects` by `orderings`, first key first.
pub fn order_list(objects: &mut Vec<Value>, orderings: &[Ordering], ctx: &EvalContext) -> Result<()> {
    if orderings.is_empty() {
        return Ok(());
    }
    let sorted = sort_by_orderings(objects.clone(), orderings, ctx, Value::clone)?;
    *objects = sorted;
    Ok(())
}

/// Stable sort of arbitrary items, each viewed as a [`Value`] through
/// `as_value`. All keys are evaluated before any comparison.
pub fn sort_by_orderings<T, F>(
    items: Vec<T>,
    orderings: &[Ordering],
    ctx: &EvalContext,
    as_value: F,
) -> Result<Vec<T>>
where
    F: Fn(&T) -> Value,
{
    if orderings.is_empty() {
        return Ok(items);
    }

    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let object = as_value(&item);
        let keys = orderings
            .iter()
            .map(|ordering| ordering.key(&object, ctx))
            .collect::<Result<Vec<_>>>()?;
        keyed.push((keys, item));
    }

    keyed.sort_by(|(a, _), (b, _)| {
        for (ordering, (a, b)) in orderings.iter().zip(a.iter().zip(b.iter())) {
            let step = compare_keys(ordering.order, a, b);
            if step != cmp::Ordering::Equal {
                return step;
            }
        }
        cmp::Ordering::Equal
    });

    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinnabar_exp::DataRow;

    fn row(name: &str, price: Option<i32>) -> Value {
        DataRow::new("Painting")
            .with("name", name)
            .with("price", price)
            .into_value()
    }

    fn names(objects: &[Value]) -> Vec<String> {
        objects
            .iter()
            .map(|o| match o {
                Value::Object(node) => node.property("name").as_str().unwrap_or_default().to_string(),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_sort_by_two_keys() {
        let ctx = EvalContext::new();
        let mut objects = vec![row("b", Some(2)), row("a", Some(2)), row("c", Some(1))];
        order_list(
            &mut objects,
            &[Ordering::desc("price").unwrap(), Ordering::asc("name").unwrap()],
            &ctx,
        )
        .unwrap();
        assert_eq!(names(&objects), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nulls_first_ascending() {
        let ctx = EvalContext::new();
        let mut objects = vec![row("x", Some(5)), row("y", None)];
        order_list(&mut objects, &[Ordering::asc("price").unwrap()], &ctx).unwrap();
        assert_eq!(names(&objects), vec!["y", "x"]);
    }

    #[test]
    fn test_case_insensitive() {
        let ctx = EvalContext::new();
        let mut objects = vec![row("b", None), row("A", None)];
        order_list(&mut objects, &[Ordering::asc("name").unwrap()], &ctx).unwrap();
        assert_eq!(names(&objects), vec!["A", "b"]);

        let ordering = Ordering::new("name", SortOrder::AscendingInsensitive).unwrap();
        let mut objects = vec![row("b", None), row("A", None), row("C", None)];
        order_list(&mut objects, &[ordering.clone()], &ctx).unwrap();
        assert_eq!(names(&objects), vec!["A", "b", "C"]);
        assert_eq!(ordering.to_string(), "name asc ignore case");
    }
}
