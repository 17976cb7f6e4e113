use super::Statistics;
use proptest::prelude::*;

fn close(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

#[test]
pub fn n_counts_every_sample() {
    for samples in [vec![], vec![1.0], vec![0.0, 3.0], vec![0.0, 0.0, 0.0, 7.5, 1.5]] {
        assert_eq!(Statistics::compute(&samples).n, samples.len());
    }
}

#[test]
pub fn all_zero_samples() {
    let stats = Statistics::compute(&[0.0; 4]);

    assert_eq!(
        stats,
        Statistics {
            n: 4,
            ..Default::default()
        }
    );
    assert!(stats.is_zero());
}

#[test]
pub fn zeros_are_excluded_from_order_statistics() {
    let stats = Statistics::compute(&[0.0, 2.0, 4.0, 6.0]);

    assert_eq!(stats.n, 4);
    assert!(close(stats.mean, 3.0));
    assert!(close(stats.median, 4.0));
    assert!(close(stats.min, 2.0));
    assert!(close(stats.max, 6.0));
    // quartiles over [2, 4, 6] are 3 and 5
    assert!(close(stats.iqr, 2.0));
    assert!(close(stats.qcod, 25.0));
    assert!(!stats.is_zero());
}

#[test]
pub fn single_sample_has_no_deviation() {
    let stats = Statistics::compute(&[5.0]);

    assert_eq!(stats.n, 1);
    assert!(close(stats.mean, 5.0));
    assert_eq!(stats.stdev, 0.0);
    assert_eq!(stats.cv, 0.0);
    assert_eq!(stats.iqr, 0.0);
    assert_eq!(stats.qcod, 0.0);
    assert!(close(stats.median, 5.0));
    assert!(close(stats.min, 5.0));
    assert!(close(stats.max, 5.0));
}

#[test]
pub fn dispersion() {
    let stats = Statistics::compute(&[1.0, 2.0, 3.0, 4.0, 5.0]);

    assert!(close(stats.stdev, 2.5f64.sqrt()));
    assert!(close(stats.cv, 2.5f64.sqrt() / 3.0 * 100.0));
    assert!(close(stats.median, 3.0));
    assert!(close(stats.iqr, 2.0));
    assert!(close(stats.qcod, 100.0 * 2.0 / 6.0));
}

#[test]
pub fn values_follow_header_order() {
    let stats = Statistics::compute(&[2.0, 4.0]);
    let values = stats.values();

    assert_eq!(values[0], 2.0);
    assert!(close(values[1], 3.0));
    assert!(close(values[6], 3.0));
    assert_eq!(values[7], 2.0);
    assert_eq!(values[8], 4.0);
}

// sample sequences with a fair share of failed (zero) runs
fn sample_sequences() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![Just(0.0), 0.001f64..1e6], 0..50)
}

proptest! {
    #[test]
    fn n_is_the_sequence_length(samples in sample_sequences()) {
        prop_assert_eq!(Statistics::compute(&samples).n, samples.len());
    }

    #[test]
    fn all_zero_sequences_have_zero_statistics(k in 0usize..50) {
        prop_assert_eq!(
            Statistics::compute(&vec![0.0; k]),
            Statistics { n: k, ..Default::default() }
        );
    }

    #[test]
    fn order_statistics_ignore_zeros(samples in sample_sequences()) {
        let measured = samples.iter().copied().filter(|value| *value != 0.0).collect::<Vec<_>>();
        prop_assume!(!measured.is_empty());
        let stats = Statistics::compute(&samples);

        prop_assert_eq!(stats.min, measured.iter().copied().fold(f64::INFINITY, f64::min));
        prop_assert_eq!(stats.max, measured.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        prop_assert!(stats.min > 0.0);
        prop_assert!(stats.min <= stats.median && stats.median <= stats.max);
    }
}
