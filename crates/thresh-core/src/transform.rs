//! Threshold transform entrypoints.
//!
//! The array entrypoints clip a copy of the input with one [`ClipPolicy`]
//! and push a [`ThresholdTrace`] into a process-wide bounded ledger.
//! [`threshold_in_place`] skips the trace. Large buffers are split into
//! chunks on rayon's global pool; the result is bit-identical to a serial
//! pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thresh_runtime::{RuntimeMode, TraceLedger};

use crate::array::{InputArray, RealArray};
use crate::config::{ResolvedConfig, ThresholdArg, resolve_config};
use crate::error::{ThresholdError, ThresholdResult};
use crate::policy::ClipPolicy;

/// Below this many elements `WorkerPolicy::Auto` stays on the calling thread.
pub const PARALLEL_MIN_LEN: usize = 1 << 16;

const TRACE_CAPACITY: usize = 4096;

/// Worker control policy for transform execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerPolicy {
    /// Serial for small inputs, rayon's pool width otherwise.
    #[default]
    Auto,
    /// Split the buffer into this many chunks (capped at its length). Chunks
    /// are scheduled on rayon's global pool, so this does not fix a thread
    /// count.
    Exact(usize),
    /// Like `Exact`, but never more chunks than the pool has threads.
    Max(usize),
}

/// Options shared by the threshold entrypoints.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThresholdOptions {
    pub mode: RuntimeMode,
    pub workers: WorkerPolicy,
}

impl ThresholdOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: WorkerPolicy) -> Self {
        self.workers = workers;
        self
    }
}

/// Structured record of one transform call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTrace {
    pub operation_id: String,
    pub policy: &'static str,
    pub shape: Vec<usize>,
    pub n: usize,
    pub replaced: usize,
    pub nan_count: usize,
    pub mode: RuntimeMode,
    pub workers: usize,
    pub timing_ns: u64,
}

impl ThresholdTrace {
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

static TRACE_LOG: OnceLock<Mutex<TraceLedger<ThresholdTrace>>> = OnceLock::new();
static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

fn trace_log() -> &'static Mutex<TraceLedger<ThresholdTrace>> {
    TRACE_LOG.get_or_init(|| Mutex::new(TraceLedger::new(TRACE_CAPACITY)))
}

fn next_operation_id() -> String {
    let next = OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("thr-op-{next:016x}")
}

fn record_trace(trace: ThresholdTrace) {
    if let Ok(mut log) = trace_log().lock() {
        log.record(trace);
    }
}

#[cfg(test)]
fn recorded_trace(operation_id: &str) -> Option<ThresholdTrace> {
    let log = trace_log().lock().ok()?;
    log.iter().find(|t| t.operation_id == operation_id).cloned()
}

/// Drain every recorded trace, oldest first.
#[must_use]
pub fn take_threshold_traces() -> Vec<ThresholdTrace> {
    trace_log()
        .lock()
        .map_or_else(|_| Vec::new(), |mut log| log.drain())
}

/// Resolve `args`, check the element type, then clip `input`.
///
/// All failures are raised before any element is touched.
pub fn threshold(
    input: &InputArray,
    args: &[ThresholdArg],
    options: &ThresholdOptions,
) -> ThresholdResult<RealArray> {
    validate_workers(options.workers)?;
    let validated = resolve_config(args, options.mode)?;
    let real = input.to_real()?;
    let (output, _) = run_threshold(real, &validated.config, options);
    Ok(output)
}

/// Clip an already-real array with a pre-resolved configuration.
pub fn threshold_with_config(
    input: &RealArray,
    config: &ResolvedConfig,
    options: &ThresholdOptions,
) -> ThresholdResult<RealArray> {
    threshold_traced(input, config, options).map(|(output, _)| output)
}

/// Same as [`threshold_with_config`], also returning the call's trace.
pub fn threshold_traced(
    input: &RealArray,
    config: &ResolvedConfig,
    options: &ThresholdOptions,
) -> ThresholdResult<(RealArray, ThresholdTrace)> {
    validate_workers(options.workers)?;
    Ok(run_threshold(input.clone(), config, options))
}

/// Clip a flat buffer in place on the calling thread. Returns the number of
/// replaced elements. No trace is recorded.
pub fn threshold_in_place(values: &mut [f64], config: &ResolvedConfig) -> usize {
    ClipPolicy::from_config(config).apply_slice(values)
}

fn run_threshold(
    mut array: RealArray,
    config: &ResolvedConfig,
    options: &ThresholdOptions,
) -> (RealArray, ThresholdTrace) {
    let policy = ClipPolicy::from_config(config);
    let nan_count = array.data.iter().filter(|x| x.is_nan()).count();
    let chunks = effective_workers(options.workers, array.data.len());

    let started = Instant::now();
    let replaced = if chunks <= 1 {
        policy.apply_slice(&mut array.data)
    } else {
        let chunk_len = array.data.len().div_ceil(chunks);
        array
            .data
            .par_chunks_mut(chunk_len)
            .map(|chunk| policy.apply_slice(chunk))
            .sum::<usize>()
    };
    let timing_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);

    let trace = ThresholdTrace {
        operation_id: next_operation_id(),
        policy: policy.name(),
        shape: array.shape.clone(),
        n: array.data.len(),
        replaced,
        nan_count,
        mode: options.mode,
        workers: chunks,
        timing_ns,
    };
    record_trace(trace.clone());
    (array, trace)
}

fn effective_workers(policy: WorkerPolicy, len: usize) -> usize {
    let requested = match policy {
        WorkerPolicy::Auto if len < PARALLEL_MIN_LEN => 1,
        WorkerPolicy::Auto => rayon::current_num_threads(),
        WorkerPolicy::Exact(n) => n,
        WorkerPolicy::Max(n) => n.min(rayon::current_num_threads()),
    };
    requested.clamp(1, len.max(1))
}

fn validate_workers(policy: WorkerPolicy) -> ThresholdResult<()> {
    match policy {
        WorkerPolicy::Auto => Ok(()),
        WorkerPolicy::Exact(0) | WorkerPolicy::Max(0) => {
            Err(ThresholdError::InvalidWorkers { requested: 0 })
        }
        WorkerPolicy::Exact(_) | WorkerPolicy::Max(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ElementBuffer;

    const LADDER: [f64; 5] = [-5.0, -1.0, 0.0, 1.0, 5.0];

    fn run(input: &[f64], args: &[ThresholdArg]) -> Vec<f64> {
        threshold(
            &InputArray::from_vec(input.to_vec()),
            args,
            &ThresholdOptions::default(),
        )
        .expect("threshold should succeed")
        .into_vec()
    }

    #[test]
    fn scalar_floor_scenario() {
        let out = threshold(
            &InputArray::scalar(-5.0),
            &[1.0.into()],
            &ThresholdOptions::default(),
        )
        .expect("scalar floor");
        assert!(out.shape().is_empty());
        assert_eq!(out.data(), &[1.0]);
    }

    #[test]
    fn scalar_ceiling_scenarios() {
        assert_eq!(run(&[-5.0], &[1.0.into(), "max".into()]), vec![-5.0]);
        assert_eq!(run(&[5.0], &[1.0.into(), "max".into()]), vec![1.0]);
    }

    #[test]
    fn abs_minimum_scenario() {
        assert_eq!(
            run(&LADDER, &[1.0.into(), "abs".into()]),
            vec![-5.0, -1.0, 1.0, 1.0, 5.0]
        );
    }

    #[test]
    fn abs_maximum_scenario() {
        assert_eq!(
            run(&LADDER, &[1.0.into(), "max".into(), "abs".into()]),
            vec![-1.0, -1.0, 0.0, 1.0, 1.0]
        );
    }

    #[test]
    fn two_sided_clamp_scenario() {
        assert_eq!(
            run(&[-3.0, 0.0, 3.0], &[1.0.into(), 2.0.into()]),
            vec![1.0, 1.0, 2.0]
        );
    }

    #[test]
    fn banded_absolute_scenario() {
        assert_eq!(
            run(&LADDER, &[1.0.into(), 2.0.into(), "abs".into()]),
            vec![-2.0, -1.0, 1.0, 1.0, 2.0]
        );
    }

    #[test]
    fn collapse_matches_single_abs_maximum() {
        let input = [-6.0, -4.0, -3.5, 0.0, 2.0, 4.0, 9.0];
        let collapsed = run(&input, &[(-3.0).into(), 4.0.into(), "abs".into()]);
        let single = run(&input, &[4.0.into(), "abs".into(), "maximum".into()]);
        assert_eq!(collapsed, single);
        assert_eq!(collapsed, vec![-4.0, -4.0, -3.5, 0.0, 2.0, 4.0, 4.0]);
    }

    #[test]
    fn shape_is_preserved_for_nd_input() {
        let input = InputArray::new(
            vec![2, 3],
            ElementBuffer::F64(vec![-2.0, -1.0, 0.0, 1.0, 2.0, 3.0]),
        )
        .expect("valid 2x3");
        let out = threshold(&input, &[0.5.into()], &ThresholdOptions::default()).expect("floor");
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.data(), &[0.5, 0.5, 0.5, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn integer_input_is_promoted() {
        let input =
            InputArray::new(vec![4], ElementBuffer::I64(vec![-3, 0, 2, 9])).expect("valid");
        let out = threshold(&input, &[0.into(), 5.into()], &ThresholdOptions::default())
            .expect("clamp");
        assert_eq!(out.data(), &[0.0, 0.0, 2.0, 5.0]);
    }

    #[test]
    fn complex_input_is_type_error() {
        let input = InputArray::new(vec![2], ElementBuffer::Complex(vec![(0.0, 1.0); 2]))
            .expect("valid shape");
        let err = threshold(&input, &[1.0.into()], &ThresholdOptions::default())
            .expect_err("complex rejected");
        assert!(matches!(err, ThresholdError::NonRealInput { .. }));
    }

    #[test]
    fn config_errors_surface_before_type_errors() {
        let input = InputArray::new(vec![1], ElementBuffer::Complex(vec![(0.0, 1.0)]))
            .expect("valid shape");
        let err = threshold(&input, &[], &ThresholdOptions::default()).expect_err("no threshold");
        assert_eq!(err, ThresholdError::MissingThreshold);
    }

    #[test]
    fn nan_elements_pass_through() {
        let out = run(&[f64::NAN, -2.0, f64::NAN], &[1.0.into(), 2.0.into()]);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 1.0);
        assert!(out[2].is_nan());
    }

    #[test]
    fn zero_workers_are_rejected() {
        let config = ResolvedConfig::single(0.0, false, true).expect("valid");
        let options = ThresholdOptions::default().with_workers(WorkerPolicy::Exact(0));
        let err = threshold_with_config(&RealArray::from_vec(vec![1.0]), &config, &options)
            .expect_err("zero workers");
        assert_eq!(err, ThresholdError::InvalidWorkers { requested: 0 });
    }

    #[test]
    fn parallel_matches_serial() {
        let data: Vec<f64> = (0..10_001).map(|i| (i as f64 - 5000.0) * 0.37).collect();
        let input = RealArray::from_vec(data.clone());
        let config = ResolvedConfig::pair(40.0, 300.0, true).expect("valid");

        let serial = threshold_with_config(&input, &config, &ThresholdOptions::default())
            .expect("serial");
        let parallel = threshold_with_config(
            &input,
            &config,
            &ThresholdOptions::default().with_workers(WorkerPolicy::Exact(7)),
        )
        .expect("parallel");
        assert_eq!(serial, parallel);

        let mut in_place = data;
        threshold_in_place(&mut in_place, &config);
        assert_eq!(serial.data(), in_place.as_slice());
    }

    #[test]
    fn traced_call_reports_counts() {
        let config = ResolvedConfig::single(1.0, true, false).expect("valid");
        let input = RealArray::new(vec![5], vec![-5.0, -1.0, f64::NAN, 1.0, 5.0]).expect("valid");
        let options = ThresholdOptions::default().with_mode(RuntimeMode::Hardened);
        let (_, trace) = threshold_traced(&input, &config, &options).expect("traced");
        assert_eq!(trace.policy, "abs_ceiling");
        assert_eq!(trace.replaced, 2);
        assert_eq!(trace.nan_count, 1);
        assert_eq!(trace.workers, 1);
        assert!(trace.operation_id.starts_with("thr-op-"));

        let parsed: serde_json::Value =
            serde_json::from_str(&trace.to_json_line()).expect("valid JSON");
        assert_eq!(parsed["policy"], "abs_ceiling");
        assert_eq!(parsed["mode"], "Hardened");
        assert_eq!(parsed["shape"], serde_json::json!([5]));
    }

    // Serializes the tests that drain the shared ledger against those that
    // look up their own trace in it.
    static LEDGER_GUARD: Mutex<()> = Mutex::new(());

    fn ledger_guard() -> std::sync::MutexGuard<'static, ()> {
        LEDGER_GUARD
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[test]
    fn every_call_records_its_trace() {
        let _guard = ledger_guard();
        let config = ResolvedConfig::single(0.0, false, true).expect("valid");
        let (_, trace) = threshold_traced(
            &RealArray::from_vec(vec![-1.0, 2.0, f64::NAN]),
            &config,
            &ThresholdOptions::default(),
        )
        .expect("traced");
        let recorded = recorded_trace(&trace.operation_id).expect("trace must be in the ledger");
        assert_eq!(recorded, trace);
        assert_eq!(recorded.policy, "floor");
        assert_eq!(recorded.replaced, 1);
        assert_eq!(recorded.nan_count, 1);
    }

    #[test]
    fn take_threshold_traces_drains_recorded_calls() {
        let _guard = ledger_guard();
        let config = ResolvedConfig::pair(-1.0, 1.0, false).expect("valid");
        let (_, first) = threshold_traced(
            &RealArray::from_vec(vec![5.0]),
            &config,
            &ThresholdOptions::default(),
        )
        .expect("traced");
        let (_, second) = threshold_traced(
            &RealArray::from_vec(vec![-5.0, 0.5]),
            &config,
            &ThresholdOptions::default(),
        )
        .expect("traced");

        let drained = take_threshold_traces();
        let first_at = drained
            .iter()
            .position(|t| t.operation_id == first.operation_id)
            .expect("first trace drained");
        let second_at = drained
            .iter()
            .position(|t| t.operation_id == second.operation_id)
            .expect("second trace drained");
        assert!(first_at < second_at, "traces drain oldest first");
        assert!(recorded_trace(&first.operation_id).is_none());
        assert!(recorded_trace(&second.operation_id).is_none());
    }

    #[test]
    fn empty_array_is_a_no_op() {
        let config = ResolvedConfig::pair(0.0, 1.0, false).expect("valid");
        let input = RealArray::new(vec![0, 4], Vec::new()).expect("empty");
        let (out, trace) = threshold_traced(&input, &config, &ThresholdOptions::default())
            .expect("empty ok");
        assert!(out.is_empty());
        assert_eq!(out.shape(), &[0, 4]);
        assert_eq!(trace.replaced, 0);
    }

    #[test]
    fn effective_workers_never_exceed_length() {
        assert_eq!(effective_workers(WorkerPolicy::Exact(8), 3), 3);
        assert_eq!(effective_workers(WorkerPolicy::Auto, 10), 1);
        assert_eq!(effective_workers(WorkerPolicy::Exact(4), 0), 1);
        // Exact counts chunks, not threads; Max is bounded by the pool.
        assert_eq!(effective_workers(WorkerPolicy::Exact(64), 1 << 20), 64);
        assert!(
            effective_workers(WorkerPolicy::Max(usize::MAX), 1 << 20)
                <= rayon::current_num_threads()
        );
    }
}
