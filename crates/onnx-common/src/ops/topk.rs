//! TopK along the last axis through the packaged graph
//!
//! The auxiliary session and the one-element `k` buffer are built on a
//! thread's first call and reused by later calls on that thread. They never
//! move between threads.

use std::any::Any;
use std::cell::RefCell;

use super::topk_graph::{self, INPUT_K, INPUT_LOGITS, OUTPUT_INDICES, OUTPUT_VALUES};
use crate::model::ModelConfig;
use crate::runtime::{NativeSession, Runtime};
use crate::tensor::{Dimensions, Tensor};
use crate::{Error, Result};

/// Result of a TopK call
#[derive(Debug)]
pub struct TopKOutput {
    /// Selected scores, descending within each lane
    pub values: Tensor<f32>,
    /// Last-axis positions of the selected scores
    pub indices: Tensor<i64>,
}

struct ThreadSlot {
    session: Box<dyn Any>,
    k: Tensor<i64>,
}

thread_local! {
    static TOPK_SLOT: RefCell<Option<ThreadSlot>> = const { RefCell::new(None) };
}

impl ThreadSlot {
    fn build<R>(runtime: &R) -> Result<Self>
    where
        R: Runtime,
        R::Session: 'static,
    {
        let config = ModelConfig::builder()
            .with_model_bytes(topk_graph::model_bytes())
            .build()?;
        let session = runtime.build_session(&config)?;
        let k = Tensor::zeros([1usize], true)?;
        tracing::debug!("Created TopK session for thread {:?}", std::thread::current().id());
        Ok(Self {
            session: Box::new(session),
            k,
        })
    }

    fn run<S: NativeSession + 'static>(
        &mut self,
        input: &Tensor<f32>,
        k: usize,
        values: &mut Tensor<f32>,
        indices: &mut Tensor<i64>,
    ) -> Result<()> {
        let session = self
            .session
            .downcast_mut::<S>()
            .ok_or_else(|| Error::Runtime("cached TopK session has an unexpected type".to_string()))?;
        self.k.as_mut_slice()[0] = k as i64;

        let inputs = [input.as_native(INPUT_LOGITS), self.k.as_native(INPUT_K)];
        let mut outputs = [
            values.as_native_mut(OUTPUT_VALUES),
            indices.as_native_mut(OUTPUT_INDICES),
        ];
        session.run(&inputs, &mut outputs)
    }
}

fn output_dims(dims: &Dimensions, k: usize) -> Result<Dimensions> {
    let last = dims
        .last()
        .ok_or_else(|| Error::ShapeContract("top_k needs an input with at least one axis".to_string()))?;
    if k > last {
        return Err(Error::ShapeContract(format!(
            "k = {} exceeds the last axis extent {} of {}",
            k, last, dims
        )));
    }
    Ok(dims.with_last(k))
}

/// Top `k` values and their indices along the last axis of `input`.
///
/// Runs the packaged TopK graph on a session built by `runtime`, cached for
/// the calling thread. Both outputs have the input's shape with the last
/// extent replaced by `k` and are allocated fresh, pinned when `pinned` is
/// set. Values are sorted descending; tie order is whatever the graph
/// produces.
///
/// Fails with [`Error::ShapeContract`] when `k` exceeds the last extent or
/// the input has no axes.
pub fn top_k_with<R>(runtime: &R, input: &Tensor<f32>, k: usize, pinned: bool) -> Result<TopKOutput>
where
    R: Runtime,
    R::Session: 'static,
{
    let out_dims = output_dims(input.dims(), k)?;
    let mut values = Tensor::<f32>::zeros(out_dims.clone(), pinned)?;
    let mut indices = Tensor::<i64>::zeros(out_dims, pinned)?;

    // Taken out of the slot for the duration of the run and always put back.
    let mut slot = match TOPK_SLOT.with(|cell| cell.borrow_mut().take()) {
        Some(slot) if slot.session.is::<R::Session>() => slot,
        _ => ThreadSlot::build(runtime)?,
    };
    let result = slot.run::<R::Session>(input, k, &mut values, &mut indices);
    TOPK_SLOT.with(|cell| *cell.borrow_mut() = Some(slot));
    result?;

    Ok(TopKOutput { values, indices })
}

/// [`top_k_with`] on the ONNX Runtime backend
#[cfg(feature = "onnxruntime")]
pub fn top_k(input: &Tensor<f32>, k: usize, pinned: bool) -> Result<TopKOutput> {
    top_k_with(&crate::backend::OrtRuntime::default(), input, k, pinned)
}

#[cfg(feature = "onnxruntime")]
impl Tensor<f32> {
    /// Top `k` values and indices along the last axis; see [`top_k_with`]
    pub fn top_k(&self, k: usize, pinned: bool) -> Result<TopKOutput> {
        top_k(self, k, pinned)
    }
}

/// Drop the calling thread's TopK session, if one was built.
///
/// Returns whether a session was released.
pub fn release_thread_session() -> bool {
    let released = TOPK_SLOT.with(|cell| cell.borrow_mut().take()).is_some();
    if released {
        tracing::debug!("Released TopK session for thread {:?}", std::thread::current().id());
    }
    released
}
