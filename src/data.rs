//! Price and return containers.
//!
//! [`PriceSeries`] holds raw aligned prices and may contain missing values.
//! [`ReturnMatrix`] is derived once from prices, is immutable, and hands out
//! borrowed [`ReturnWindow`] views so rolling computations never copy data.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::errors::{PortfolioError, PortfolioResult};
use crate::returns::cumulative_returns;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// True when `price` can take part in a return computation.
#[inline]
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Aligned price history for a set of assets.
///
/// Timestamps are strictly increasing and every column has one entry per
/// timestamp. Non-finite or non-positive prices are treated as missing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PriceSeries {
    assets: Vec<String>,
    timestamps: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl PriceSeries {
    /// Build from one column per asset.
    ///
    /// # Errors
    /// `EmptyInput` with no assets; `InvalidInput` for duplicate asset
    /// identifiers, a column/asset count mismatch, ragged columns, or
    /// timestamps that are not strictly increasing.
    pub fn new(
        assets: Vec<String>,
        timestamps: Vec<NaiveDate>,
        columns: Vec<Vec<f64>>,
    ) -> PortfolioResult<Self> {
        validate_layout(&assets, &timestamps, &columns)?;
        Ok(Self {
            assets,
            timestamps,
            columns,
        })
    }

    /// Align per-asset `(timestamp, price)` observations on the union of
    /// their timestamps. Gaps become missing values (`NaN`).
    ///
    /// # Errors
    /// `EmptyInput` with no assets; `InvalidInput` if an asset lists the same
    /// timestamp twice.
    pub fn from_observations(
        observations: &BTreeMap<String, Vec<(NaiveDate, f64)>>,
    ) -> PortfolioResult<Self> {
        if observations.is_empty() {
            return Err(PortfolioError::EmptyInput {
                context: "price observations".to_string(),
            });
        }

        let axis: Vec<NaiveDate> = observations
            .values()
            .flat_map(|obs| obs.iter().map(|(date, _)| *date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: BTreeMap<NaiveDate, usize> =
            axis.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut assets = Vec::with_capacity(observations.len());
        let mut columns = Vec::with_capacity(observations.len());
        for (asset, obs) in observations {
            let mut column = vec![f64::NAN; axis.len()];
            let mut seen = vec![false; axis.len()];
            for (date, price) in obs {
                // every date is in the axis by construction
                let idx = position[date];
                if seen[idx] {
                    return Err(PortfolioError::invalid_input(format!(
                        "asset {} has duplicate observations on {}",
                        asset, date
                    )));
                }
                seen[idx] = true;
                column[idx] = *price;
            }
            assets.push(asset.clone());
            columns.push(column);
        }

        Self::new(assets, axis, columns)
    }

    /// Asset identifiers in column order
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Timestamp axis
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Price column of asset `index`
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// Price column for a named asset
    pub fn column_by_name(&self, asset: &str) -> Option<&[f64]> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.columns[i].as_slice())
    }

    /// Number of assets
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Number of timestamp rows
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True with no rows
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// True when every price in `row` is valid
    pub fn row_is_complete(&self, row: usize) -> bool {
        self.columns.iter().all(|c| is_valid_price(c[row]))
    }

    /// Copy with every row containing a missing price removed.
    pub fn cleaned(&self) -> Self {
        let keep: Vec<usize> = (0..self.len()).filter(|&r| self.row_is_complete(r)).collect();
        Self {
            assets: self.assets.clone(),
            timestamps: keep.iter().map(|&r| self.timestamps[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| keep.iter().map(|&r| c[r]).collect())
                .collect(),
        }
    }
}

fn validate_layout(
    assets: &[String],
    timestamps: &[NaiveDate],
    columns: &[Vec<f64>],
) -> PortfolioResult<()> {
    if assets.is_empty() {
        return Err(PortfolioError::EmptyInput {
            context: "asset universe".to_string(),
        });
    }
    let mut seen = HashSet::with_capacity(assets.len());
    if let Some(dup) = assets.iter().find(|a| !seen.insert(a.as_str())) {
        return Err(PortfolioError::invalid_input(format!(
            "duplicate asset identifier: {}",
            dup
        )));
    }
    if columns.len() != assets.len() {
        return Err(PortfolioError::invalid_input(format!(
            "{} columns for {} assets",
            columns.len(),
            assets.len()
        )));
    }
    if let Some((asset, column)) = assets
        .iter()
        .zip(columns)
        .find(|(_, c)| c.len() != timestamps.len())
    {
        return Err(PortfolioError::invalid_input(format!(
            "column {} has {} rows, expected {}",
            asset,
            column.len(),
            timestamps.len()
        )));
    }
    if let Some(pair) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
        return Err(PortfolioError::invalid_input(format!(
            "timestamps not strictly increasing: {} then {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Log-return matrix, timestamps × assets, stored column-major.
///
/// Every entry is finite. Row `t` holds the return realized at `timestamps[t]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReturnMatrix {
    assets: Vec<String>,
    timestamps: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Build from finite return columns.
    ///
    /// # Errors
    /// Same layout checks as [`PriceSeries::new`], plus `InvalidInput` for any
    /// non-finite value and `InsufficientData` with zero rows.
    pub fn new(
        assets: Vec<String>,
        timestamps: Vec<NaiveDate>,
        columns: Vec<Vec<f64>>,
    ) -> PortfolioResult<Self> {
        validate_layout(&assets, &timestamps, &columns)?;
        if timestamps.is_empty() {
            return Err(PortfolioError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        for (asset, column) in assets.iter().zip(&columns) {
            crate::errors::validate_all_finite(column, asset)?;
        }
        Ok(Self {
            assets,
            timestamps,
            columns,
        })
    }

    /// Asset identifiers in column order
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Timestamp axis
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Return column of asset `index`
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// Return column for a named asset
    pub fn column_by_name(&self, asset: &str) -> Option<&[f64]> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.columns[i].as_slice())
    }

    /// Number of assets
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Number of return rows
    pub fn n_rows(&self) -> usize {
        self.timestamps.len()
    }

    /// Borrowed view of rows `start..end`.
    ///
    /// # Errors
    /// `InvalidInput` when the range is empty or out of bounds.
    pub fn window(&self, start: usize, end: usize) -> PortfolioResult<ReturnWindow<'_>> {
        if start >= end || end > self.n_rows() {
            return Err(PortfolioError::invalid_input(format!(
                "window {}..{} outside 0..{}",
                start,
                end,
                self.n_rows()
            )));
        }
        Ok(ReturnWindow {
            matrix: self,
            start,
            end,
        })
    }

    /// View over every row
    pub fn full_window(&self) -> ReturnWindow<'_> {
        ReturnWindow {
            matrix: self,
            start: 0,
            end: self.n_rows(),
        }
    }

    /// `(1 + r)` cumulative product per asset
    pub fn cumulative_returns(&self) -> BTreeMap<String, Vec<f64>> {
        self.assets
            .iter()
            .zip(&self.columns)
            .map(|(a, c)| (a.clone(), cumulative_returns(c)))
            .collect()
    }
}

/// Borrowed contiguous row range of a [`ReturnMatrix`].
#[derive(Debug, Clone, Copy)]
pub struct ReturnWindow<'a> {
    matrix: &'a ReturnMatrix,
    start: usize,
    end: usize,
}

impl<'a> ReturnWindow<'a> {
    /// Asset identifiers in column order
    pub fn assets(&self) -> &'a [String] {
        &self.matrix.assets
    }

    /// Timestamps covered by the window
    pub fn timestamps(&self) -> &'a [NaiveDate] {
        &self.matrix.timestamps[self.start..self.end]
    }

    /// Slice of asset `index` covered by the window
    pub fn column(&self, index: usize) -> &'a [f64] {
        &self.matrix.columns[index][self.start..self.end]
    }

    /// Iterate `(asset, column slice)` pairs
    pub fn columns(&self) -> impl Iterator<Item = (&'a str, &'a [f64])> + 'a {
        let (start, end) = (self.start, self.end);
        self.matrix
            .assets
            .iter()
            .zip(&self.matrix.columns)
            .map(move |(a, c)| (a.as_str(), &c[start..end]))
    }

    /// Number of assets
    pub fn n_assets(&self) -> usize {
        self.matrix.n_assets()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True with no rows
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// First row index in the parent matrix
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last row index in the parent matrix
    pub fn end(&self) -> usize {
        self.end
    }
}
