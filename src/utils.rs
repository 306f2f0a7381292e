//! Time and number formatting plus small selection helpers shared by the
//! configuration layer, the runner and the reporters.

use std::collections::HashSet;
use std::hash::Hash;
use std::time::{SystemTime, UNIX_EPOCH};

const S: f64 = 1000.0;
const M: f64 = 60.0 * S;
const H: f64 = 60.0 * M;
const D: f64 = 24.0 * H;
const W: f64 = 7.0 * D;
const MO: f64 = 30.0 * D;
const Y: f64 = 365.0 * D;

// ============================================================================
// DURATIONS
// ============================================================================

/// One unit of [`format_time_duration`]: inputs in `[min, max)` milliseconds are
/// expressed as multiples of `min` (raw milliseconds when `min` is zero).
#[derive(Debug, Clone, PartialEq)]
pub struct DurationSegment {
    pub min: f64,
    pub max: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatTimeDurationOptions {
    pub spacer: String,
    pub decimal: String,
    pub decimal_places: u32,
    /// Segments in ascending order. The last one catches everything above.
    pub durations: Vec<DurationSegment>,
}

impl Default for FormatTimeDurationOptions {
    fn default() -> Self {
        let segment = |min, max, label| DurationSegment { min, max, label };
        Self {
            spacer: " ".into(),
            decimal: ".".into(),
            decimal_places: 2,
            durations: vec![
                segment(0.0, S, "ms"),
                segment(S, M, "s"),
                segment(M, H, "m"),
                segment(H, D, "h"),
                segment(D, W, "d"),
                segment(W, MO, "w"),
                segment(MO, Y, "mo"),
                segment(Y, f64::INFINITY, "y"),
            ],
        }
    }
}

/// A point in time or a raw millisecond value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Moment {
    At(SystemTime),
    Millis(f64),
    Unset,
}

impl Moment {
    pub fn as_millis(&self) -> Option<f64> {
        match self {
            Moment::At(time) => Some(
                time.duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as f64)
                    .unwrap_or(0.0),
            ),
            Moment::Millis(ms) => Some(*ms),
            Moment::Unset => None,
        }
    }
}

impl From<SystemTime> for Moment {
    fn from(time: SystemTime) -> Self {
        Moment::At(time)
    }
}

impl From<Option<SystemTime>> for Moment {
    fn from(time: Option<SystemTime>) -> Self {
        time.map_or(Moment::Unset, Moment::At)
    }
}

impl From<f64> for Moment {
    fn from(ms: f64) -> Self {
        Moment::Millis(ms)
    }
}

/// Rounds half away from zero to `decimal_places`.
pub fn round(input: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    (input * factor).round() / factor
}

/// Formats a millisecond duration with the default options.
///
/// ```rust
/// use barbell::utils::format_time_duration;
/// assert_eq!(format_time_duration(0.0), "0 ms");
/// assert_eq!(format_time_duration(1000.0), "1 s");
/// ```
pub fn format_time_duration(input_ms: f64) -> String {
    format_time_duration_with(input_ms, &FormatTimeDurationOptions::default())
}

pub fn format_time_duration_with(input_ms: f64, options: &FormatTimeDurationOptions) -> String {
    let Some(first) = options.durations.first() else {
        return String::new();
    };
    if input_ms.is_nan() || input_ms <= 0.0 {
        return format!("0{}{}", options.spacer, first.label);
    }

    let segment = options
        .durations
        .iter()
        .find(|s| input_ms >= s.min && input_ms < s.max)
        .or(options.durations.last())
        .unwrap_or(first);
    // The base unit is printed as given; larger units are rounded.
    let value = if segment.min > 0.0 {
        round(input_ms / segment.min, options.decimal_places)
    } else {
        input_ms
    };
    let text = value.to_string().replacen('.', &options.decimal, 1);
    format!("{}{}{}", text, options.spacer, segment.label)
}

/// Formats the span between the earliest and latest of `moments`. Unset moments
/// are ignored.
pub fn tell_time<I>(moments: I) -> String
where
    I: IntoIterator,
    I::Item: Into<Moment>,
{
    let millis: Vec<f64> = moments
        .into_iter()
        .filter_map(|m| m.into().as_millis())
        .collect();
    let end = millis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let start = millis.iter().copied().fold(f64::INFINITY, f64::min);
    if millis.is_empty() {
        return format_time_duration(0.0);
    }
    format_time_duration(end - start)
}

// ============================================================================
// NUMBERS
// ============================================================================

/// Groups the integer part of a number in thousands.
///
/// ```rust
/// use barbell::utils::format_number;
/// assert_eq!(format_number(123456789.0), "123,456,789");
/// ```
pub fn format_number(input: f64) -> String {
    format_number_with(input, ",", ".")
}

pub fn format_number_with(input: f64, delimiter: &str, decimal: &str) -> String {
    let text = input.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3 * delimiter.len());
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push_str(delimiter);
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{}{}{}{}", sign, grouped, decimal, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

// ============================================================================
// SELECTION
// ============================================================================

/// First candidate accepted by `validate`, otherwise the last candidate.
pub fn use_first_valid<T, I, F>(validate: F, candidates: I) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> bool,
{
    let mut last = None;
    for candidate in candidates {
        if validate(&candidate) {
            return Some(candidate);
        }
        last = Some(candidate);
    }
    last
}

/// First `Some` value.
pub fn use_first_defined<T, I>(candidates: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
{
    candidates.into_iter().flatten().next()
}

/// First non-empty vector, otherwise the last one (or an empty vector).
pub fn use_first_non_empty<T, I>(candidates: I) -> Vec<T>
where
    I: IntoIterator<Item = Vec<T>>,
{
    use_first_valid(|v: &Vec<T>| !v.is_empty(), candidates).unwrap_or_default()
}

/// Removes repeated items, keeping the first occurrence of each.
pub fn filter_unique<T, I>(input: I) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    input
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn round_to_places() {
        assert_eq!(round(1.23456789, 1), 1.2);
        assert_eq!(round(1.23456789, 2), 1.23);
        assert_eq!(round(1.23456789, 3), 1.235);
        assert_eq!(round(1.23456789, 4), 1.2346);
        assert_eq!(round(1.23456789, 0), 1.0);
    }

    #[test]
    fn format_time_duration_segments() {
        assert_eq!(format_time_duration(0.0), "0 ms");
        assert_eq!(format_time_duration(-5.0), "0 ms");
        assert_eq!(format_time_duration(999.0), "999 ms");
        assert_eq!(format_time_duration(12.3456), "12.3456 ms");
        assert_eq!(format_time_duration(1000.0), "1 s");
        assert_eq!(format_time_duration(M * 10.5), "10.5 m");
        assert_eq!(format_time_duration(H * 2.0), "2 h");
        assert_eq!(format_time_duration(D * 3.0), "3 d");
        assert_eq!(format_time_duration(W * 2.5), "2.5 w");
        assert_eq!(format_time_duration(MO * 2.0), "2 mo");
        assert_eq!(format_time_duration(Y * 400.0), "400 y");
    }

    #[test]
    fn format_time_duration_custom_options() {
        let options = FormatTimeDurationOptions {
            spacer: String::new(),
            decimal: ",".into(),
            decimal_places: 1,
            ..Default::default()
        };
        assert_eq!(format_time_duration_with(1550.0, &options), "1,6s");
    }

    #[test]
    fn tell_time_is_consistent_for_timestamps_and_durations() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let end = start + Duration::from_millis(1500);
        assert_eq!(tell_time([start, end]), "1.5 s");
        assert_eq!(tell_time([end, start]), "1.5 s");
        assert_eq!(tell_time([0.0, 1500.0]), "1.5 s");
        assert_eq!(tell_time([Some(start), None]), "0 ms");
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(123456789.0), "123,456,789");
        assert_eq!(format_number(12345.6789), "12,345.6789");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(-1234.5), "-1,234.5");
        assert_eq!(format_number_with(1234567.25, " ", ","), "1 234 567,25");
    }

    #[test]
    fn selection_helpers() {
        assert_eq!(use_first_valid(|x: &i64| *x > 0, [-1, 0, 3, 4]), Some(3));
        assert_eq!(use_first_valid(|x: &i64| *x > 10, [-1, 0, 3]), Some(3));
        assert_eq!(use_first_defined([None, Some(2), Some(3)]), Some(2));
        assert_eq!(use_first_defined::<i32, _>([None, None]), None);
        assert_eq!(
            use_first_non_empty([vec![], vec!["a"], vec!["b"]]),
            vec!["a"]
        );
        assert!(use_first_non_empty::<u8, _>([vec![], vec![]]).is_empty());
    }

    #[test]
    fn filter_unique_keeps_first_occurrence() {
        assert_eq!(filter_unique([3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
