//! Filter Module
//! Multi-select criteria over categorical columns, producing filtered views.

use crate::data::value::{column_keys, has_column, GroupKey};
use crate::error::Result;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Selected values per column. A column with no entry is unrestricted;
/// an entry with an empty selection matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    selections: BTreeMap<String, BTreeSet<GroupKey>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `column` to the given values, replacing any earlier selection.
    pub fn select<I>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = GroupKey>,
    {
        self.selections
            .insert(column.to_string(), values.into_iter().collect());
        self
    }

    /// Remove the restriction on `column`.
    pub fn clear(&mut self, column: &str) -> &mut Self {
        self.selections.remove(column);
        self
    }

    pub fn selection(&self, column: &str) -> Option<&BTreeSet<GroupKey>> {
        self.selections.get(column)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.selections.is_empty()
    }

    /// Columns with a selection, in name order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.selections.keys().map(String::as_str)
    }

    /// Filtered view of `df`. Criteria on columns the frame lacks are ignored,
    /// so one set of criteria can be applied to every source of a dashboard.
    pub fn apply(&self, dataset: &str, df: &DataFrame) -> Result<DataFrame> {
        let active: Vec<(&String, &BTreeSet<GroupKey>)> = self
            .selections
            .iter()
            .filter(|(column, _)| has_column(df, column))
            .collect();
        if active.is_empty() {
            return Ok(df.clone());
        }

        let mut keep = vec![true; df.height()];
        for (column, selected) in active {
            let keys = column_keys(df, dataset, column)?;
            for (flag, key) in keep.iter_mut().zip(keys) {
                *flag = *flag && key.map_or(false, |k| selected.contains(&k));
            }
        }
        retain_rows(df, &keep)
    }
}

/// Rows of `df` whose flag is true.
pub fn retain_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    Ok(df.filter(&mask)?)
}

/// One filter control: the column, its label and the values to offer.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    pub column: String,
    pub label: String,
    pub values: Vec<GroupKey>,
}
