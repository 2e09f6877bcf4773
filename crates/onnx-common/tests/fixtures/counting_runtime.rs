//! Fake runtime that counts session construction and destruction
//!
//! Sessions built by [`CountingRuntime`] understand two graphs:
//!
//! - TopK: inputs `logits` and `k`, outputs `values` and `indices`, computed
//!   with a stable sort (lower index first on ties).
//! - Identity: input `input` copied to output `output`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use onnx_common::{Error, ModelConfig, NativeSession, NativeTensor, NativeTensorMut, Result, Runtime};

/// Shared construction / destruction counters
#[derive(Debug, Clone, Default)]
pub struct Counters {
    built: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl Counters {
    /// Sessions successfully built
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    /// Sessions destroyed
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Sessions currently alive
    pub fn live(&self) -> usize {
        self.built() - self.dropped()
    }

    /// Build attempts, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Runtime double for lifecycle tests
#[derive(Debug, Clone, Default)]
pub struct CountingRuntime {
    counters: Counters,
    failures_remaining: Arc<AtomicUsize>,
}

impl CountingRuntime {
    /// Runtime whose builds always succeed
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime whose first `failures` builds fail
    pub fn failing_first(failures: usize) -> Self {
        let runtime = Self::default();
        runtime.failures_remaining.store(failures, Ordering::SeqCst);
        runtime
    }

    /// Counter handle that stays valid after the runtime moves into a model
    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }
}

impl Runtime for CountingRuntime {
    type Session = FakeSession;

    fn build_session(&self, config: &ModelConfig) -> Result<FakeSession> {
        let counters = &self.counters;
        counters.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Runtime(format!("cannot load {}", config.source())));
        }

        counters.built.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            counters: counters.clone(),
            runs: 0,
        })
    }
}

/// Session built by [`CountingRuntime`]
#[derive(Debug)]
pub struct FakeSession {
    counters: Counters,
    /// Completed runs on this session
    pub runs: usize,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

fn find_input<'s, 'a>(inputs: &'s [NativeTensor<'a>], name: &str) -> Option<&'s NativeTensor<'a>> {
    inputs.iter().find(|tensor| tensor.name() == name)
}

fn output_index(outputs: &[NativeTensorMut<'_>], name: &str) -> Result<usize> {
    outputs
        .iter()
        .position(|tensor| tensor.name() == name)
        .ok_or_else(|| Error::Runtime(format!("missing output {}", name)))
}

fn run_top_k(
    logits: &NativeTensor<'_>,
    k: &NativeTensor<'_>,
    outputs: &mut [NativeTensorMut<'_>],
) -> Result<()> {
    let scores = logits
        .as_slice::<f32>()
        .ok_or_else(|| Error::Runtime("logits must be f32".to_string()))?;
    let k = k
        .as_slice::<i64>()
        .and_then(|k| k.first().copied())
        .ok_or_else(|| Error::Runtime("k must be a one-element i64 tensor".to_string()))? as usize;
    let lane = logits.dims().last().unwrap_or(0);

    let mut values = Vec::new();
    let mut indices = Vec::new();
    if lane > 0 {
        for row in scores.chunks(lane) {
            let mut order: Vec<usize> = (0..lane).collect();
            order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
            for &idx in order.iter().take(k) {
                values.push(row[idx]);
                indices.push(idx as i64);
            }
        }
    }

    let values_at = output_index(outputs, "values")?;
    outputs[values_at]
        .as_mut_slice::<f32>()
        .ok_or_else(|| Error::Runtime("values must be f32".to_string()))?
        .copy_from_slice(&values);

    let indices_at = output_index(outputs, "indices")?;
    outputs[indices_at]
        .as_mut_slice::<i64>()
        .ok_or_else(|| Error::Runtime("indices must be i64".to_string()))?
        .copy_from_slice(&indices);
    Ok(())
}

fn run_identity(input: &NativeTensor<'_>, outputs: &mut [NativeTensorMut<'_>]) -> Result<()> {
    let source = input
        .as_slice::<f32>()
        .ok_or_else(|| Error::Runtime("input must be f32".to_string()))?;
    let at = output_index(outputs, "output")?;
    outputs[at]
        .as_mut_slice::<f32>()
        .ok_or_else(|| Error::Runtime("output must be f32".to_string()))?
        .copy_from_slice(source);
    Ok(())
}

impl NativeSession for FakeSession {
    fn run(&mut self, inputs: &[NativeTensor<'_>], outputs: &mut [NativeTensorMut<'_>]) -> Result<()> {
        match (find_input(inputs, "logits"), find_input(inputs, "k"), find_input(inputs, "input")) {
            (Some(logits), Some(k), _) => run_top_k(logits, k, outputs)?,
            (_, _, Some(input)) => run_identity(input, outputs)?,
            _ => return Err(Error::Runtime("unknown graph inputs".to_string())),
        }
        self.runs += 1;
        Ok(())
    }
}
