use trend_rank::error::TrendError;
use trend_rank::fit::{evaluate, fit};
use trend_rank::model::{samples_from_pairs, Sample};

fn exact_series(y0: f64, rate: f64, t0: f64) -> Vec<Sample> {
    (0..=160)
        .map(|i| {
            let t = i as f64 * 0.25;
            Sample::new(t, y0 * (1.0 + rate).powf(t - t0))
        })
        .collect()
}

fn noisy_series(scale: f64) -> Vec<Sample> {
    (0..60)
        .map(|i| {
            let t = i as f64 / 12.0;
            let noise = 1.0 + 0.03 * (1.7 * i as f64).sin();
            Sample::new(t, scale * 100.0 * 1.05f64.powf(t) * noise)
        })
        .collect()
}

#[test]
fn perfect_exponential_is_recovered() {
    let samples = exact_series(50.0, 0.07, 3.0);
    let trend = fit(&samples).expect("fit should succeed");
    assert!((trend.rate() - 0.07).abs() < 1e-9, "rate={}", trend.rate());
    assert!(trend.stdev() < 1e-9, "stdev={}", trend.stdev());
    // Every origin ties on a perfect fit; the last sample is scanned first.
    assert_eq!(trend.t0(), 40.0);
    assert!((trend.value_at(3.0) - 50.0).abs() < 1e-6);
}

#[test]
fn ten_percent_per_period_scenario() {
    let samples = samples_from_pairs(&[0.0, 1.0, 2.0], &[100.0, 110.0, 121.0]).unwrap();
    let trend = fit(&samples).unwrap();
    assert!((trend.rate() - 0.10).abs() < 1e-12);
    assert!(trend.stdev() < 1e-12);
    assert_eq!(trend.t0(), 2.0);
    assert_eq!(trend.y0(), 121.0);
}

#[test]
fn declining_series_has_negative_rate() {
    let samples = exact_series(80.0, -0.2, 0.0);
    let trend = fit(&samples).unwrap();
    assert!((trend.rate() + 0.2).abs() < 1e-9);
}

#[test]
fn stdev_is_scale_invariant_and_y0_scales() {
    let base = fit(&noisy_series(1.0)).unwrap();
    let scaled = fit(&noisy_series(3.7)).unwrap();
    assert!(base.stdev() > 1e-3);
    assert!((base.stdev() - scaled.stdev()).abs() < 1e-12);
    assert!((base.rate() - scaled.rate()).abs() < 1e-12);
    assert_eq!(base.t0(), scaled.t0());
    assert!((scaled.y0() / base.y0() - 3.7).abs() < 1e-12);
}

#[test]
fn origin_is_a_sample_and_selection_is_deterministic() {
    let samples = noisy_series(1.0);
    let first = fit(&samples).unwrap();
    let second = fit(&samples).unwrap();
    assert_eq!(first, second);

    let origin = samples
        .iter()
        .find(|s| s.t == first.t0())
        .expect("origin should be one of the sample times");
    assert_eq!(origin.y, first.y0());
}

#[test]
fn winner_has_lowest_stdev_among_candidates() {
    let samples = noisy_series(1.0);
    let trend = fit(&samples).unwrap();
    let last = samples[samples.len() - 1];
    let from_last = evaluate(&samples, last.t, last.y).unwrap();
    assert!(trend.stdev() <= from_last.stdev + 1e-12);
    for k in 0..16 {
        let s = samples[samples.len() * k / 16];
        let c = evaluate(&samples, s.t, s.y).unwrap();
        assert!(trend.stdev() <= c.stdev + 1e-12, "k={}", k);
    }
}

#[test]
fn two_samples_give_an_exact_fit() {
    let samples = samples_from_pairs(&[0.0, 1.0], &[100.0, 110.0]).unwrap();
    let trend = fit(&samples).unwrap();
    assert!((trend.rate() - 0.10).abs() < 1e-12);
    assert!(trend.stdev() < 1e-12);
}

#[test]
fn invalid_inputs_are_rejected() {
    let cases: Vec<Vec<Sample>> = vec![
        vec![],
        vec![Sample::new(0.0, 1.0)],
        vec![Sample::new(0.0, 1.0), Sample::new(1.0, 0.0)],
        vec![Sample::new(0.0, -5.0), Sample::new(1.0, 2.0)],
        vec![Sample::new(0.0, 1.0), Sample::new(1.0, f64::NAN)],
        vec![Sample::new(0.0, 1.0), Sample::new(f64::INFINITY, 2.0)],
        vec![Sample::new(2.0, 1.0), Sample::new(2.0, 3.0), Sample::new(2.0, 4.0)],
    ];
    for (i, samples) in cases.iter().enumerate() {
        match fit(samples) {
            Err(TrendError::InvalidInput(_)) => {}
            other => panic!("case {} expected InvalidInput, got {:?}", i, other),
        }
    }
}

#[test]
fn overflowing_fit_is_reported_as_degenerate() {
    let samples = samples_from_pairs(&[0.0, 1e307], &[1e-300, 1e300]).unwrap();
    match fit(&samples) {
        Err(TrendError::DegenerateFit(_)) => {}
        other => panic!("expected DegenerateFit, got {:?}", other),
    }
}
