//! Property-based tests for location measurements
//!
//! Invariants proven:
//! 1. Zero-window cursors return the nearest sample for every reducer
//! 2. Zero-extent intervals behave exactly like zero-window cursors
//! 3. Repeated calls on an unchanged signal are bit-identical
//! 4. Distance is symmetric, difference is antisymmetric
//! 5. Locations inside the domain measure the same in relative and absolute mode
//! 6. A pooled epoch mean is the sample-weighted mean of the interval means

use locus_measure::core::{difference, distance, reduce_epoch, reduce_interval, reduce_point};
use locus_measure::{
    Epoch, EpochSelection, IntervalLocator, LocationFn, MeasureOptions, PointLocator, Reducer,
    Signal, Unit,
};
use proptest::prelude::*;

fn signal_from(values: Vec<f64>) -> Signal {
    Signal::regular(0.0, 1.0, vec![values], Unit::MILLISECOND, Unit::MILLIVOLT).unwrap()
}

fn samples() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0f64..100.0, 20..60)
}

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

/// Equal values, with NaN matching NaN regardless of sign.
fn same(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
}

proptest! {
    /// Proves: a cursor without a window reduces to the nearest sample
    #[test]
    fn zero_window_is_nearest_sample(values in samples(), fraction in 0.0f64..1.0) {
        let signal = signal_from(values);
        let coordinate = fraction * (signal.len() - 1) as f64;
        let expected = signal.sample(signal.time_index(coordinate));
        for reducer in Reducer::presets() {
            let result = reduce_point(
                &reducer,
                &signal,
                &PointLocator::new(coordinate, 0.0),
                &MeasureOptions::default(),
            )
            .unwrap();
            prop_assert_eq!(result.values(), expected.as_slice(), "reducer {}", reducer);
        }
    }

    /// Proves: a zero-extent interval equals a zero-window cursor
    #[test]
    fn zero_extent_interval_matches_cursor(values in samples(), fraction in 0.0f64..1.0) {
        let signal = signal_from(values);
        let t = fraction * (signal.len() - 1) as f64;
        for reducer in Reducer::presets() {
            let point = reduce_point(
                &reducer,
                &signal,
                &PointLocator::new(t, 0.0),
                &MeasureOptions::default(),
            )
            .unwrap();
            let interval = reduce_interval(
                &reducer,
                &signal,
                &IntervalLocator::with_stop(t, t),
                &MeasureOptions::default(),
            )
            .unwrap();
            prop_assert_eq!(bits(point.values()), bits(interval.values()));
        }
    }

    /// Proves: identical calls return bit-identical results
    #[test]
    fn repeated_calls_are_identical(
        values in samples(),
        fraction in 0.0f64..1.0,
        window in 0.0f64..10.0,
    ) {
        let signal = signal_from(values);
        let locator = PointLocator::new(fraction * signal.len() as f64, window);
        for reducer in Reducer::presets() {
            let first = reduce_point(&reducer, &signal, &locator, &MeasureOptions::default()).unwrap();
            let second = reduce_point(&reducer, &signal, &locator, &MeasureOptions::default()).unwrap();
            prop_assert_eq!(bits(first.values()), bits(second.values()));
        }
    }

    /// Proves: distance(a, b) == distance(b, a) and difference(a, b) == -difference(b, a)
    #[test]
    fn pairwise_symmetry(
        values in samples(),
        fa in 0.0f64..1.0,
        fb in 0.0f64..1.0,
        window in 0.0f64..6.0,
        in_samples in any::<bool>(),
    ) {
        let signal = signal_from(values);
        let last = (signal.len() - 1) as f64;
        let a = PointLocator::new(fa * last, window).into();
        let b = PointLocator::new(fb * last, window).into();
        let options = MeasureOptions::default();

        let ab = distance(&signal, &a, &b, in_samples, &options).unwrap();
        let ba = distance(&signal, &b, &a, in_samples, &options).unwrap();
        prop_assert_eq!(ab.value.to_bits(), ba.value.to_bits());

        let func = LocationFn::average();
        let ab = difference(&signal, &a, &b, &func, None, &options).unwrap();
        let ba = difference(&signal, &b, &a, &func, None, &options).unwrap();
        let negated: Vec<f64> = ba.values().iter().map(|v| -v).collect();
        prop_assert!(same(ab.values(), &negated), "{:?} vs {:?}", ab.values(), negated);
    }

    /// Proves: relative remapping leaves in-domain locations untouched
    #[test]
    fn relative_matches_absolute_inside_domain(
        values in samples(),
        fraction in 0.0f64..1.0,
        window in 0.0f64..10.0,
    ) {
        let signal = signal_from(values);
        let half = window / 2.0;
        let coordinate = half + fraction * ((signal.len() - 1) as f64 - window);
        let locator = PointLocator::new(coordinate, window);
        for reducer in Reducer::presets() {
            let relative =
                reduce_point(&reducer, &signal, &locator, &MeasureOptions::default()).unwrap();
            let absolute =
                reduce_point(&reducer, &signal, &locator, &MeasureOptions::absolute()).unwrap();
            prop_assert_eq!(bits(relative.values()), bits(absolute.values()));
        }
    }

    /// Proves: pooled mean == sample-count-weighted mean of per-interval means
    #[test]
    fn pooled_mean_is_weighted(
        values in prop::collection::vec(-100.0f64..100.0, 40..60),
        starts in prop::collection::vec(0.0f64..25.0, 1..4),
        durations in prop::collection::vec(1.0f64..10.0, 4),
    ) {
        let signal = signal_from(values);
        let durations: Vec<f64> = durations[..starts.len()].to_vec();
        let epoch = Epoch::new(starts.clone(), durations.clone()).unwrap();
        let options = MeasureOptions::default();

        let each = reduce_epoch(&Reducer::Mean, &signal, &epoch, &EpochSelection::Each, &options)
            .unwrap();
        prop_assert_eq!(each.measures().len(), epoch.len());

        let counts: Vec<f64> = starts
            .iter()
            .zip(&durations)
            .map(|(s, d)| signal.slice_indices_open(*s, s + d).len() as f64)
            .collect();
        let total: f64 = counts.iter().sum();
        let weighted: f64 = each
            .measures()
            .iter()
            .zip(&counts)
            .map(|(m, n)| m.values()[0] * n)
            .sum::<f64>()
            / total;

        let pooled = reduce_epoch(&Reducer::Mean, &signal, &epoch, &EpochSelection::Pooled, &options)
            .unwrap();
        let pooled = pooled.as_single().unwrap().values()[0];
        prop_assert!((pooled - weighted).abs() < 1e-9, "{} vs {}", pooled, weighted);
    }
}
