//! Sample addressing: continuous time to discrete archived samples.

use crate::util::Chrono;
use super::TimeSampling;

/// Times closer than this to an archived sample snap onto it.
const CHRONO_EPSILON: Chrono = 1e-9;

/// Bracketing samples and interpolation weight for a query time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSampleInfo {
    /// Floor sample index.
    pub floor_index: usize,
    /// Ceil sample index.
    pub ceil_index: usize,
    /// Interpolation factor (0.0 = floor, 1.0 = ceil).
    pub alpha: f64,
}

impl TimeSampleInfo {
    /// Exact sample, no interpolation.
    pub fn exact(index: usize) -> Self {
        Self {
            floor_index: index,
            ceil_index: index,
            alpha: 0.0,
        }
    }

    /// Interpolation between two samples.
    pub fn lerp(floor: usize, ceil: usize, alpha: f64) -> Self {
        Self {
            floor_index: floor,
            ceil_index: ceil,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Check if this is an exact sample (no interpolation).
    pub fn is_exact(&self) -> bool {
        self.floor_index == self.ceil_index || self.alpha == 0.0
    }

    /// True when both bracketing indices match `other`.
    pub fn same_indices(&self, other: &Self) -> bool {
        self.floor_index == other.floor_index && self.ceil_index == other.ceil_index
    }

    /// Time span between the bracketing samples, scaled by alpha.
    pub fn time_offset(&self, sampling: &TimeSampling) -> Chrono {
        let span = sampling.sample_time(self.ceil_index) - sampling.sample_time(self.floor_index);
        span * self.alpha
    }
}

/// Map `time` onto the archived samples of `sampling`.
///
/// No extrapolation: times outside the archived range clamp to the boundary
/// sample with alpha 0.
pub fn resolve_sample_info(time: Chrono, sampling: &TimeSampling, num_samples: usize) -> TimeSampleInfo {
    if num_samples == 0 {
        return TimeSampleInfo::exact(0);
    }
    let last = num_samples - 1;

    let (floor, floor_time) = sampling.floor_index(time, num_samples);
    if time <= floor_time + CHRONO_EPSILON {
        return TimeSampleInfo::exact(floor);
    }
    if floor >= last {
        return TimeSampleInfo::exact(last);
    }

    let ceil = floor + 1;
    let ceil_time = sampling.sample_time(ceil);
    if (ceil_time - time).abs() <= CHRONO_EPSILON {
        return TimeSampleInfo::exact(ceil);
    }

    let span = ceil_time - floor_time;
    if span <= 0.0 {
        return TimeSampleInfo::exact(floor);
    }
    TimeSampleInfo::lerp(floor, ceil, (time - floor_time) / span)
}

/// Result of a [`SampleTimeResolver::resolve`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved {
    pub info: TimeSampleInfo,
    /// False when the bracketing indices match the previous call.
    pub changed: bool,
}

/// Sample resolver remembering the previous answer.
///
/// Lets per-frame consumers skip all work when a new query time still lands
/// between the same two samples.
#[derive(Clone, Debug, Default)]
pub struct SampleTimeResolver {
    last: Option<TimeSampleInfo>,
}

impl SampleTimeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `time`, reporting whether the indices moved since last call.
    pub fn resolve(&mut self, time: Chrono, sampling: &TimeSampling, num_samples: usize) -> Resolved {
        let info = resolve_sample_info(time, sampling, num_samples);
        let changed = !matches!(self.last, Some(prev) if prev.same_indices(&info));
        self.last = Some(info);
        Resolved { info, changed }
    }

    /// Previously resolved sample, if any.
    pub fn last(&self) -> Option<TimeSampleInfo> {
        self.last
    }

    /// Forget the previous answer so the next call always reports a change.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Whether an array sample broadcasts one value or holds one per element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// One value representing every element.
    Constant,
    /// One value per element.
    PerElement,
}

impl Cardinality {
    /// Classify a sample of `len` values against `element_count`.
    ///
    /// Returns None for shapes that are neither (including empty samples).
    pub fn classify(len: usize, element_count: usize) -> Option<Self> {
        match len {
            0 => None,
            n if n == element_count => Some(Self::PerElement),
            1 => Some(Self::Constant),
            _ => None,
        }
    }

    /// Source index for element `i`.
    #[inline]
    pub fn index(self, i: usize) -> usize {
        match self {
            Self::Constant => 0,
            Self::PerElement => i,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> TimeSampling {
        TimeSampling::uniform(1.0, 0.0)
    }

    #[test]
    fn test_exact_and_between() {
        let ts = frames();
        assert_eq!(resolve_sample_info(2.0, &ts, 5), TimeSampleInfo::exact(2));

        let info = resolve_sample_info(2.25, &ts, 5);
        assert_eq!((info.floor_index, info.ceil_index), (2, 3));
        assert!((info.alpha - 0.25).abs() < 1e-12);
        assert!(!info.is_exact());
    }

    #[test]
    fn test_clamps_outside_range() {
        let ts = frames();
        assert_eq!(resolve_sample_info(-4.0, &ts, 5), TimeSampleInfo::exact(0));
        assert_eq!(resolve_sample_info(4.5, &ts, 5), TimeSampleInfo::exact(4));
        assert_eq!(resolve_sample_info(100.0, &ts, 5), TimeSampleInfo::exact(4));
        assert_eq!(resolve_sample_info(1.0, &ts, 0), TimeSampleInfo::exact(0));
    }

    #[test]
    fn test_acyclic_bracketing() {
        let ts = TimeSampling::acyclic(vec![0.0, 0.5, 2.0]);
        let info = resolve_sample_info(1.25, &ts, 3);
        assert_eq!((info.floor_index, info.ceil_index), (1, 2));
        assert!((info.alpha - 0.5).abs() < 1e-12);
        assert!((info.time_offset(&ts) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_snaps_to_ceil() {
        let ts = TimeSampling::uniform(1.0 / 24.0, 0.0);
        let info = resolve_sample_info(3.0 / 24.0, &ts, 10);
        assert!(info.is_exact());
        assert_eq!(info.alpha, 0.0);
    }

    #[test]
    fn test_resolver_reports_changes() {
        let ts = frames();
        let mut resolver = SampleTimeResolver::new();
        assert!(resolver.resolve(1.2, &ts, 5).changed);
        assert!(!resolver.resolve(1.2, &ts, 5).changed);
        // Same bracket, different alpha: still unchanged.
        assert!(!resolver.resolve(1.7, &ts, 5).changed);
        assert!(resolver.resolve(2.1, &ts, 5).changed);

        resolver.reset();
        assert!(resolver.resolve(2.1, &ts, 5).changed);
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(Cardinality::classify(1, 5), Some(Cardinality::Constant));
        assert_eq!(Cardinality::classify(5, 5), Some(Cardinality::PerElement));
        assert_eq!(Cardinality::classify(1, 1), Some(Cardinality::PerElement));
        assert_eq!(Cardinality::classify(3, 5), None);
        assert_eq!(Cardinality::classify(0, 0), None);
        assert_eq!(Cardinality::Constant.index(7), 0);
    }
}
