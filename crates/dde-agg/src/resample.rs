//! Subsequence selection for ordered time series.

use std::fmt;
use std::str::FromStr;

use dde_core::errors::{DdeError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Policy used to thin an ordered series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleUnit {
    /// Every N-th record by position.
    Interval,
    /// Exactly N evenly spaced records.
    Total,
    /// Records whose epoch advanced by at least N.
    Epoch,
    /// Records whose elapsed updates advanced by at least N.
    Update,
}

impl ResampleUnit {
    /// Every policy, in declaration order.
    pub const ALL: [ResampleUnit; 4] = [
        ResampleUnit::Interval,
        ResampleUnit::Total,
        ResampleUnit::Epoch,
        ResampleUnit::Update,
    ];

    /// Lowercase policy name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResampleUnit::Interval => "interval",
            ResampleUnit::Total => "total",
            ResampleUnit::Epoch => "epoch",
            ResampleUnit::Update => "update",
        }
    }
}

impl fmt::Display for ResampleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResampleUnit {
    type Err = DdeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ResampleUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == value.trim())
            .ok_or_else(|| {
                DdeError::Resample(
                    ErrorInfo::new("resample_unit", format!("unknown resampling unit '{value}'"))
                        .with_hint("expected one of interval, total, epoch, update"),
                )
            })
    }
}

fn resample_error(code: &str, message: impl Into<String>) -> DdeError {
    DdeError::Resample(ErrorInfo::new(code, message))
}

/// Checks that `keys` never decrease.
pub fn ensure_ordered(keys: &[u64]) -> Result<(), DdeError> {
    match keys.windows(2).position(|pair| pair[1] < pair[0]) {
        None => Ok(()),
        Some(idx) => Err(DdeError::Resample(
            ErrorInfo::new("resample_unordered", "series keys are not in order")
                .with_context("position", (idx + 1).to_string())
                .with_context("previous", keys[idx].to_string())
                .with_context("current", keys[idx + 1].to_string()),
        )),
    }
}

/// Returns the positions of the records retained from a series with the given keys.
///
/// `keys` hold the epoch for [`ResampleUnit::Epoch`] and elapsed updates for
/// [`ResampleUnit::Update`]; the positional policies only use their length.
/// The first and last records are always retained and positions never decrease.
/// [`ResampleUnit::Total`] yields exactly `resolution` positions, repeating
/// records when the series is shorter than that.
pub fn select_indices(
    keys: &[u64],
    unit: ResampleUnit,
    resolution: u64,
) -> Result<Vec<usize>, DdeError> {
    if resolution == 0 {
        return Err(resample_error(
            "resample_resolution",
            "resolution must be at least 1",
        ));
    }
    ensure_ordered(keys)?;
    let n = keys.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let last = n - 1;
    let indices = match unit {
        ResampleUnit::Interval => {
            let step = usize::try_from(resolution).unwrap_or(usize::MAX);
            (0..n).filter(|&i| i % step == 0 || i == last).collect()
        }
        ResampleUnit::Total => total_indices(n, resolution),
        ResampleUnit::Epoch | ResampleUnit::Update => {
            let mut kept = Vec::new();
            let mut previous = keys[0];
            for (i, &key) in keys.iter().enumerate() {
                if i == 0 || key >= previous.saturating_add(resolution) || i == last {
                    kept.push(i);
                    previous = key;
                }
            }
            kept
        }
    };
    Ok(indices)
}

fn total_indices(n: usize, total: u64) -> Vec<usize> {
    let last = n - 1;
    if total <= 1 {
        let mut ends = vec![0];
        if last > 0 {
            ends.push(last);
        }
        return ends;
    }
    let span = total as u128 - 1;
    (0..total as u128)
        .map(|x| (x * last as u128 / span) as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_keeps_multiples_and_ends() {
        let keys: Vec<u64> = (0..10).collect();
        assert_eq!(
            select_indices(&keys, ResampleUnit::Interval, 4).unwrap(),
            vec![0, 4, 8, 9]
        );
    }

    #[test]
    fn total_spreads_points_evenly() {
        let keys: Vec<u64> = (0..11).collect();
        assert_eq!(
            select_indices(&keys, ResampleUnit::Total, 3).unwrap(),
            vec![0, 5, 10]
        );
        assert_eq!(
            select_indices(&keys, ResampleUnit::Total, 1).unwrap(),
            vec![0, 10]
        );
    }

    #[test]
    fn total_repeats_records_of_short_series() {
        assert_eq!(
            select_indices(&[0, 1, 2], ResampleUnit::Total, 5).unwrap(),
            vec![0, 0, 1, 1, 2]
        );
        assert_eq!(
            select_indices(&[7], ResampleUnit::Total, 3).unwrap(),
            vec![0, 0, 0]
        );
    }

    #[test]
    fn epoch_gap_is_measured_from_last_kept() {
        let keys = [0, 1, 2, 5, 6, 7];
        assert_eq!(
            select_indices(&keys, ResampleUnit::Epoch, 3).unwrap(),
            vec![0, 3, 5]
        );
    }

    #[test]
    fn unordered_or_zero_resolution_is_rejected() {
        let err = select_indices(&[0, 2, 1], ResampleUnit::Epoch, 1).unwrap_err();
        assert_eq!(err.info().code, "resample_unordered");
        let err = select_indices(&[0, 1], ResampleUnit::Interval, 0).unwrap_err();
        assert_eq!(err.info().code, "resample_resolution");
    }

    #[test]
    fn units_parse_by_name() {
        assert_eq!("update".parse::<ResampleUnit>().unwrap(), ResampleUnit::Update);
        assert!("weekly".parse::<ResampleUnit>().is_err());
        assert!(select_indices(&[], ResampleUnit::Total, 5).unwrap().is_empty());
    }
}
