#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use thresh_core::{RealArray, ResolvedConfig, ThresholdOptions, WorkerPolicy, threshold_with_config};

#[derive(Debug, Arbitrary)]
struct TransformInput {
    first: f64,
    second: Option<f64>,
    use_absolute: bool,
    treat_as_minimum: bool,
    workers: u8,
    values: Vec<f64>,
}

fuzz_target!(|input: TransformInput| {
    let config = match input.second {
        Some(second) => ResolvedConfig::pair(input.first, second, input.use_absolute),
        None => ResolvedConfig::single(input.first, input.use_absolute, input.treat_as_minimum),
    };
    let Ok(config) = config else {
        return;
    };

    let values: Vec<f64> = input.values.into_iter().take(1024).collect();
    let array = RealArray::from_vec(values.clone());
    let workers = WorkerPolicy::Exact(usize::from(input.workers.max(1)));
    let options = ThresholdOptions::default().with_workers(workers);

    let once = threshold_with_config(&array, &config, &options).expect("valid config never fails");
    assert_eq!(once.shape(), array.shape());
    for (x, y) in values.iter().zip(once.data()) {
        if x.is_nan() {
            assert!(y.is_nan(), "NaN must pass through");
        }
    }

    let twice = threshold_with_config(&once, &config, &options).expect("valid config never fails");
    for (a, b) in once.data().iter().zip(twice.data()) {
        assert!(a == b || (a.is_nan() && b.is_nan()), "idempotence violated: {a} vs {b}");
    }
});
