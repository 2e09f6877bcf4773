//! Numeric operators on bridge tensors
//!
//! Activations run directly on the ndarray view. TopK runs a packaged graph
//! through a [`Runtime`](crate::runtime::Runtime).

mod softmax;
pub mod topk;
pub mod topk_graph;

#[cfg(feature = "onnxruntime")]
pub use topk::top_k;
pub use topk::{release_thread_session, top_k_with, TopKOutput};
