//! End-to-end measurement scenarios on a 100-sample ramp.

use locus_measure::core::{
    distance, event_amplitudes, reduce, reduce_epoch, LocationFn,
};
use locus_measure::{
    measure_sweeps, Epoch, EpochSelection, ErrorKind, IntervalLocator, LocationMeasure, Locator,
    MeasureError, MeasureOptions, PointLocator, Reducer, Signal, Unit,
};

fn ramp() -> Signal {
    Signal::regular(
        0.0,
        1.0,
        vec![(0..100).map(|i| i as f64).collect()],
        Unit::MILLISECOND,
        Unit::MILLIVOLT,
    )
    .unwrap()
}

#[test]
fn test_cursor_mean_over_closed_window() {
    let result = reduce(
        &PointLocator::new(10.0, 4.0).into(),
        &Reducer::Mean,
        &ramp(),
        &EpochSelection::Each,
        &MeasureOptions::default(),
    )
    .unwrap();
    let measure = result.as_single().unwrap();
    assert_eq!(measure.values(), &[10.0]);
    assert_eq!(measure.unit(), Unit::MILLIVOLT);
}

#[test]
fn test_distance_in_samples() {
    let d = distance(
        &ramp(),
        &PointLocator::new(2.0, 0.0).into(),
        &PointLocator::new(80.0, 0.0).into(),
        true,
        &MeasureOptions::default(),
    )
    .unwrap();
    assert_eq!(d.value, 78.0);
}

#[test]
fn test_epoch_each_interval() {
    let epoch = Epoch::new(vec![0.0, 20.0], vec![5.0, 5.0]).unwrap();
    let result = reduce_epoch(
        &Reducer::Mean,
        &ramp(),
        &epoch,
        &EpochSelection::Each,
        &MeasureOptions::default(),
    )
    .unwrap();
    let values: Vec<f64> = result.measures().iter().map(|m| m.values()[0]).collect();
    assert_eq!(values, vec![2.0, 22.0]);
}

#[test]
fn test_empty_epoch_is_nan_in_signal_unit() {
    let result = reduce(
        &Epoch::empty().into(),
        &Reducer::Mean,
        &ramp(),
        &EpochSelection::Pooled,
        &MeasureOptions::default(),
    )
    .unwrap();
    let measure = result.as_single().unwrap();
    assert!(measure.values()[0].is_nan());
    assert_eq!(measure.unit(), Unit::MILLIVOLT);
}

#[test]
fn test_odd_event_locators_are_value_errors() {
    let locators: Vec<Locator> = vec![
        PointLocator::new(1.0, 0.0).into(),
        PointLocator::new(2.0, 0.0).into(),
        PointLocator::new(3.0, 0.0).into(),
    ];
    let err = event_amplitudes(
        &ramp(),
        &locators,
        &LocationFn::average(),
        None,
        &MeasureOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MeasureError::OddLocatorCount { count: 3 }));
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn test_epoch_locator_in_pairwise_is_type_error() {
    let err = distance(
        &ramp(),
        &Epoch::empty().into(),
        &PointLocator::new(2.0, 0.0).into(),
        false,
        &MeasureOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_locator_units_are_converted() {
    // 4 ms expressed in seconds on a millisecond signal
    let locator = PointLocator::new(0.010, 0.004).with_unit(Unit::SECOND);
    let result = reduce(
        &locator.into(),
        &Reducer::Max,
        &ramp(),
        &EpochSelection::Each,
        &MeasureOptions::default(),
    )
    .unwrap();
    assert_eq!(result.as_single().unwrap().values(), &[12.0]);
}

#[test]
fn test_recipe_replays_on_shifted_sweeps() {
    // Sweeps recorded later in the session start at a later time; relative
    // mode maps the same cursor into each sweep's own domain.
    let sweeps: Vec<Signal> = (0..3)
        .map(|k| {
            Signal::regular(
                100.0 * k as f64,
                1.0,
                vec![(0..100).map(|i| i as f64 * (k + 1) as f64).collect()],
                Unit::MILLISECOND,
                Unit::MILLIVOLT,
            )
            .unwrap()
        })
        .collect();

    let amplitude = LocationMeasure::difference(
        "amplitude",
        LocationFn::average(),
        None,
        IntervalLocator::with_stop(0.0, 4.0),
        PointLocator::new(50.0, 2.0),
    )
    .unwrap();
    let outcome = measure_sweeps(&amplitude, &sweeps);
    let values: Vec<f64> = outcome
        .entries
        .iter()
        .map(|e| e.measures[0].values()[0])
        .collect();
    assert_eq!(values, vec![48.0, 96.0, 144.0]);

    let absolute = amplitude.clone().with_relative(false);
    let outcome = measure_sweeps(&absolute, &sweeps);
    assert!(outcome.entries[1].measures[0].is_nan());
}
