//! Properties of the zero-phase smoothing filter.

use safety_oracle::analysis::{batch_filter, FilterState};

#[test]
fn identity_below_seven_samples() {
    let inputs: [&[f64]; 4] = [&[], &[42.0], &[1.0, -1.0, 1.0], &[9.0, 3.0, 7.0, 1.0, 5.0, 2.0]];
    for input in inputs {
        assert_eq!(batch_filter(input), input.to_vec());
    }
}

#[test]
fn seven_samples_are_filtered() {
    let input = [0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0];
    let output = batch_filter(&input);
    assert_eq!(output.len(), 7);
    assert_ne!(output, input.to_vec());
    assert!(output[3] < 10.0);
}

#[test]
fn length_matches_for_many_sizes() {
    for len in 0..100 {
        let series: Vec<f64> = (0..len).map(|i| (i as f64).sin()).collect();
        assert_eq!(batch_filter(&series).len(), len);
    }
}

#[test]
fn constant_series_unchanged() {
    let series = vec![1234.5; 50];
    for (got, want) in batch_filter(&series).iter().zip(&series) {
        assert!((got - want).abs() < 1e-6, "{got} vs {want}");
    }
}

#[test]
fn output_is_finite_for_finite_input() {
    let series: Vec<f64> = (0..40).map(|i| if i % 7 == 0 { 1e6 } else { 1.0 }).collect();
    assert!(batch_filter(&series).iter().all(|v| v.is_finite()));
}

#[test]
fn filter_state_single_pass_converges() {
    let mut state = FilterState::new();
    let step: Vec<f64> = std::iter::repeat(0.0)
        .take(5)
        .chain(std::iter::repeat(1.0).take(60))
        .collect();
    let out = state.pass(&step);
    assert!(out[..5].iter().all(|v| v.abs() < 1e-12));
    assert!((out[out.len() - 1] - 1.0).abs() < 1e-6);
}
