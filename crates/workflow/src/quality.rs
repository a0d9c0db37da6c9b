//! Field quality checks.

use ndarray::ArrayView2;
use serde::Serialize;

use crate::reader::Field;

/// Forecast and reference median magnitudes further apart than this factor
/// suggest the fields are in different units.
pub const MAX_SCALE_RATIO: f64 = 10.0;

/// Fewer finite values than this and no outlier test is made.
pub const MIN_OUTLIER_SAMPLE: usize = 3;

/// Optional checks on top of the missing/infinite scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityChecks {
    /// Inclusive range finite values are expected in.
    pub expected_range: Option<(f64, f64)>,
    /// Finite values more than this many standard deviations from the field
    /// mean count as outliers.
    pub outlier_sigma: Option<f64>,
}

/// Result of [`check_field`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FieldQuality {
    pub n_values: usize,
    pub n_missing: usize,
    /// No finite value at all.
    pub all_missing: bool,
    pub has_infinite: bool,
    /// Some finite value lies outside the expected range.
    pub out_of_range: bool,
    pub n_outliers: usize,
    /// Smallest and largest finite values, if any.
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldQuality {
    pub fn is_valid(&self) -> bool {
        !(self.all_missing || self.has_infinite || self.out_of_range || self.n_outliers > 0)
    }
}

/// Scans `values` for missing, infinite, out-of-range and outlying entries.
///
/// NaN and infinities both count as missing.
pub fn check_field(values: ArrayView2<'_, f64>, checks: &QualityChecks) -> FieldQuality {
    let mut quality = FieldQuality {
        n_values: values.len(),
        ..FieldQuality::default()
    };
    let mut sum = 0.0;
    for &v in values.iter() {
        if v.is_infinite() {
            quality.has_infinite = true;
        }
        if !v.is_finite() {
            quality.n_missing += 1;
            continue;
        }
        sum += v;
        quality.min = Some(quality.min.map_or(v, |m| m.min(v)));
        quality.max = Some(quality.max.map_or(v, |m| m.max(v)));
        if let Some((lo, hi)) = checks.expected_range
            && (v < lo || v > hi)
        {
            quality.out_of_range = true;
        }
    }
    quality.all_missing = quality.n_missing == quality.n_values;

    let n_finite = quality.n_values - quality.n_missing;
    if let Some(k) = checks.outlier_sigma
        && n_finite >= MIN_OUTLIER_SAMPLE
    {
        let mean = sum / n_finite as f64;
        let finite = || values.iter().copied().filter(|v| v.is_finite());
        let variance = finite().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n_finite as f64;
        let limit = k * variance.sqrt();
        quality.n_outliers = finite().filter(|v| (v - mean).abs() > limit).count();
    }
    quality
}

/// Units disagreement between a forecast and its reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitsMismatch {
    pub forecast_units: Option<String>,
    pub reference_units: Option<String>,
    /// Median `|forecast|` over median `|reference|` on the valid pairs.
    pub scale_ratio: Option<f64>,
}

impl UnitsMismatch {
    /// Both fields declare units and they differ.
    pub fn declared_differ(&self) -> bool {
        matches!(
            (&self.forecast_units, &self.reference_units),
            (Some(f), Some(r)) if f != r
        )
    }

    pub fn scale_suspect(&self) -> bool {
        self.scale_ratio
            .is_some_and(|r| !(1.0 / MAX_SCALE_RATIO..=MAX_SCALE_RATIO).contains(&r))
    }
}

/// Compares declared units and value scales of two same-shape fields.
///
/// Returns `None` when nothing looks wrong, including when there are no
/// valid pairs or either median magnitude is zero.
pub fn check_units(forecast: &Field, reference: &Field) -> Option<UnitsMismatch> {
    let mismatch = UnitsMismatch {
        forecast_units: forecast.units().map(str::to_string),
        reference_units: reference.units().map(str::to_string),
        scale_ratio: scale_ratio(forecast.values(), reference.values()),
    };
    (mismatch.declared_differ() || mismatch.scale_suspect()).then_some(mismatch)
}

/// Ratio of median absolute values over pairs where both are finite.
pub fn scale_ratio(
    forecast: ArrayView2<'_, f64>,
    reference: ArrayView2<'_, f64>,
) -> Option<f64> {
    let (f_abs, r_abs): (Vec<f64>, Vec<f64>) = forecast
        .iter()
        .zip(reference.iter())
        .filter(|(f, r)| f.is_finite() && r.is_finite())
        .map(|(f, r)| (f.abs(), r.abs()))
        .unzip();
    let (f_scale, r_scale) = (median(f_abs)?, median(r_abs)?);
    if f_scale == 0.0 || r_scale == 0.0 {
        return None;
    }
    Some(f_scale / r_scale)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let (lower, upper, _) = values.select_nth_unstable_by(n / 2, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return Some(upper);
    }
    let below = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((below + upper) / 2.0)
}
