//! TopK engine: shape contract, per-thread session cache, output binding

mod fixtures;

use fixtures::counting_runtime::CountingRuntime;
use onnx_common::{release_thread_session, top_k_with, Error, Tensor};

#[test]
fn test_top_two_of_five() {
    let runtime = CountingRuntime::new();
    let input = Tensor::from_slice([5usize], &[3.0f32, 1.0, 4.0, 1.0, 5.0], false).unwrap();

    let out = top_k_with(&runtime, &input, 2, false).unwrap();
    assert_eq!(out.values.as_slice(), &[5.0, 4.0]);
    assert_eq!(out.indices.as_slice(), &[4, 2]);
    assert_eq!(out.values.dims().as_native(), &[2]);

    release_thread_session();
}

#[test]
fn test_batched_lanes() {
    let runtime = CountingRuntime::new();
    let input = Tensor::from_slice(
        [2usize, 4],
        &[0.1f32, 0.9, 0.3, 0.2, 7.0, -1.0, 8.0, 0.0],
        true,
    )
    .unwrap();

    let out = top_k_with(&runtime, &input, 3, true).unwrap();
    assert_eq!(out.values.dims().as_native(), &[2, 3]);
    assert_eq!(out.indices.as_slice(), &[1, 2, 3, 2, 0, 3]);
    assert_eq!(out.values.as_slice(), &[0.9, 0.3, 0.2, 8.0, 7.0, 0.0]);
    assert!(out.values.is_pinned());
    assert!(out.indices.is_pinned());

    release_thread_session();
}

#[test]
fn test_session_built_once_per_thread() {
    let runtime = CountingRuntime::new();
    let counters = runtime.counters();
    let input = Tensor::from_slice([3usize], &[1.0f32, 2.0, 3.0], false).unwrap();

    for k in 0..=3 {
        let out = top_k_with(&runtime, &input, k, false).unwrap();
        assert_eq!(out.indices.len(), k);
    }
    assert_eq!(counters.built(), 1);

    // A second thread builds its own session.
    let thread_runtime = runtime.clone();
    std::thread::spawn(move || {
        let input = Tensor::from_slice([2usize], &[1.0f32, 0.0], false).unwrap();
        let out = top_k_with(&thread_runtime, &input, 1, false).unwrap();
        assert_eq!(out.indices.as_slice(), &[0]);
        // Released explicitly so the drop is counted before join returns.
        assert!(release_thread_session());
    })
    .join()
    .unwrap();
    assert_eq!(counters.built(), 2);

    assert!(release_thread_session());
    assert_eq!(counters.live(), 0);
}

#[test]
fn test_k_larger_than_axis_is_rejected_before_running() {
    let runtime = CountingRuntime::new();
    let counters = runtime.counters();
    let input = Tensor::<f32>::zeros([2usize, 3], false).unwrap();

    let err = top_k_with(&runtime, &input, 4, false).unwrap_err();
    assert!(matches!(err, Error::ShapeContract(_)));
    assert_eq!(counters.attempts(), 0);
}

#[test]
fn test_build_failure_is_retried_next_call() {
    let runtime = CountingRuntime::failing_first(1);
    let counters = runtime.counters();
    let input = Tensor::from_slice([2usize], &[1.0f32, 2.0], false).unwrap();

    assert!(matches!(top_k_with(&runtime, &input, 1, false), Err(Error::Runtime(_))));
    let out = top_k_with(&runtime, &input, 1, false).unwrap();
    assert_eq!(out.indices.as_slice(), &[1]);
    assert_eq!(counters.attempts(), 2);

    release_thread_session();
}

#[test]
fn test_ties_keep_graph_order() {
    let runtime = CountingRuntime::new();
    let input = Tensor::from_slice([4usize], &[2.0f32, 5.0, 2.0, 5.0], false).unwrap();

    let out = top_k_with(&runtime, &input, 3, false).unwrap();
    assert_eq!(out.values.as_slice(), &[5.0, 5.0, 2.0]);
    assert_eq!(out.indices.as_slice(), &[1, 3, 0]);

    release_thread_session();
}

#[cfg(feature = "onnxruntime")]
#[test]
#[ignore = "requires the ONNX Runtime native library"]
fn test_packaged_graph_on_onnxruntime() {
    let input = Tensor::from_slice([5usize], &[3.0f32, 1.0, 4.0, 1.0, 5.0], false).unwrap();

    let out = input.top_k(2, false).unwrap();
    assert_eq!(out.values.as_slice(), &[5.0, 4.0]);
    assert_eq!(out.indices.as_slice(), &[4, 2]);

    let batched = Tensor::from_slice([2usize, 3], &[1.0f32, 3.0, 2.0, 6.0, 5.0, 4.0], true).unwrap();
    let out = onnx_common::top_k(&batched, 1, true).unwrap();
    assert_eq!(out.indices.as_slice(), &[1, 0]);

    assert!(release_thread_session());
}

#[cfg(feature = "onnxruntime")]
#[test]
#[ignore = "requires the ONNX Runtime native library"]
fn test_onnxruntime_writes_results_into_bound_buffers() {
    use onnx_common::ops::topk_graph::{model_bytes, INPUT_K, INPUT_LOGITS, OUTPUT_INDICES, OUTPUT_VALUES};
    use onnx_common::{ModelConfig, NativeSession, NativeTensorMut, OrtRuntime, Runtime};

    let config = ModelConfig::builder().with_model_bytes(model_bytes()).build().unwrap();
    let mut session = OrtRuntime.build_session(&config).unwrap();

    let logits = Tensor::from_slice([2usize, 3], &[1.0f32, 3.0, 2.0, 6.0, 5.0, 4.0], true).unwrap();
    let k = Tensor::from_slice([1usize], &[2i64], true).unwrap();

    // Caller-owned result storage, sentinel-filled so an unwritten slot shows.
    let mut values = vec![f32::NAN; 4];
    let mut indices = vec![-1i64; 4];
    let values_ptr = values.as_ptr();
    {
        let mut outputs = [
            NativeTensorMut::from_slice(OUTPUT_VALUES, [2usize, 2], &mut values).unwrap(),
            NativeTensorMut::from_slice(OUTPUT_INDICES, [2usize, 2], &mut indices).unwrap(),
        ];
        session
            .run(&[logits.as_native(INPUT_LOGITS), k.as_native(INPUT_K)], &mut outputs)
            .unwrap();
    }

    assert_eq!(values.as_ptr(), values_ptr);
    assert_eq!(values, vec![3.0, 2.0, 6.0, 5.0]);
    assert_eq!(indices, vec![1, 2, 0, 1]);
}
