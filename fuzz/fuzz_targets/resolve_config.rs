#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use thresh_core::{ThresholdArg, Thresholds, resolve_config};
use thresh_runtime::RuntimeMode;

#[derive(Debug, Arbitrary)]
enum RawArg {
    Value(f64),
    Token(String),
}

#[derive(Debug, Arbitrary)]
struct ResolveInput {
    hardened: bool,
    args: Vec<RawArg>,
}

fuzz_target!(|input: ResolveInput| {
    let mode = if input.hardened {
        RuntimeMode::Hardened
    } else {
        RuntimeMode::Strict
    };
    let args: Vec<ThresholdArg> = input
        .args
        .into_iter()
        .take(8)
        .map(|arg| match arg {
            RawArg::Value(v) => ThresholdArg::Value(v),
            RawArg::Token(t) => ThresholdArg::Token(t),
        })
        .collect();

    if let Ok(validated) = resolve_config(&args, mode) {
        match validated.config.thresholds() {
            Thresholds::Single(t) => assert!(!t.is_nan()),
            Thresholds::Pair { low, high } => {
                assert!(low <= high, "pair must be sorted");
                if validated.config.use_absolute() {
                    assert_eq!(low < 0.0, high < 0.0, "abs pair must not straddle zero");
                }
            }
        }
    }
});
