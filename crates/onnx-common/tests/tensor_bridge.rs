//! Numeric and native views over one buffer

use onnx_common::tensor::{allocate_filled, allocate_pinned_filled, element_count, PINNED_ALIGNMENT};
use onnx_common::{DataType, Dimensions, NativeTensor, Tensor, TensorError};

#[test]
fn test_aliasing_both_directions() {
    let mut tensor = Tensor::<f32>::zeros([2usize, 3], true).unwrap();

    tensor.view_mut()[&[1usize, 2][..]] = 7.0;
    assert_eq!(tensor.as_native("x").as_slice::<f32>().unwrap()[5], 7.0);

    tensor.as_native_mut("x").as_mut_slice::<f32>().unwrap()[1] = -2.5;
    assert_eq!(tensor.view()[&[0usize, 1][..]], -2.5);
}

#[test]
fn test_element_counts() {
    assert_eq!(Dimensions::from([4usize, 1, 1, 4]).total_element_count(), 16);
    assert_eq!(Dimensions::from(Vec::<usize>::new()).total_element_count(), 0);
    assert_eq!(element_count(&[4i32, 1, 1, 4]), 16);
    assert_eq!(element_count::<i64>(&[]), 0);
}

#[test]
fn test_dimension_widths_agree() {
    let dims = Dimensions::from([2i32, 3, 5]);
    assert_eq!(dims.as_native(), &[2, 3, 5]);
    assert_eq!(dims.as_i32(), &[2, 3, 5]);
    assert_eq!(dims.to_i64().unwrap(), vec![2, 3, 5]);
    assert_eq!(dims.to_string(), "[2, 3, 5]");
}

#[test]
fn test_reinterpret_on_twelve_elements() {
    let tensor = Tensor::<f32>::zeros([12usize], false).unwrap();
    assert!(tensor.reinterpret("r", [3usize, 4]).is_ok());

    let err = tensor.reinterpret("r", [3usize, 5]).unwrap_err();
    assert!(matches!(err, TensorError::SizeMismatch { expected: 15, actual: 12, .. }));
}

#[test]
fn test_reinterpret_never_lies_about_length() {
    let tensor = Tensor::<f32>::zeros([12usize], false).unwrap();

    for dims in [vec![1usize << 63, 2], vec![usize::MAX, usize::MAX], vec![(1usize << 62) + 3, 4]] {
        let err = tensor.reinterpret("r", dims).unwrap_err();
        assert!(matches!(err, TensorError::ShapeOverflow { .. }));
    }

    let view = tensor.reinterpret("r", [2usize, 6]).unwrap();
    assert_eq!(view.dims().checked_element_count(), Some(view.data().len()));
}

#[test]
fn test_overflowing_shapes_fail_cleanly() {
    let err = Tensor::<f32>::zeros([usize::MAX, 2], false).unwrap_err();
    assert!(matches!(err, TensorError::ShapeOverflow { .. }));
    assert!(Tensor::<f32>::zeros([1usize << 63, 2], true).is_err());

    let data = [0.0f32; 4];
    let err = NativeTensor::from_slice("x", [1usize << 62, 4, 1], &data).unwrap_err();
    assert!(matches!(err, TensorError::ShapeOverflow { .. }));

    assert!(matches!(
        Dimensions::from([1usize << 63]).to_i64(),
        Err(TensorError::ShapeOverflow { .. })
    ));
    assert!(matches!(
        Dimensions::try_from_i32([3, -2]),
        Err(TensorError::NegativeExtent { axis: 1, extent: -2 })
    ));
}

#[test]
fn test_copy_from_reproduces_source() {
    let data = [0.5f32, -1.0, 2.0, 4.0, 8.0, 16.0];
    let source = NativeTensor::from_slice("external", [3usize, 2], &data).unwrap();

    let copy = Tensor::<f32>::copy_from(&source, true).unwrap();
    assert_eq!(copy.dims(), source.dims());
    assert_eq!(copy.as_slice(), &data);
    assert_ne!(copy.as_slice().as_ptr(), data.as_ptr());
    assert_eq!(copy.as_native("copy").data_type(), DataType::F32);
}

#[test]
fn test_pinned_buffers_are_page_aligned() {
    let tensor = Tensor::<i64>::filled([3usize, 7], 9, true).unwrap();
    assert!(tensor.is_pinned());
    assert_eq!(tensor.buffer().as_ptr() as usize % PINNED_ALIGNMENT, 0);
    assert!(tensor.as_slice().iter().all(|&v| v == 9));

    let buffer = allocate_pinned_filled(10, 1.5f64).unwrap();
    assert_eq!(buffer.as_ptr() as usize % PINNED_ALIGNMENT, 0);

    let plain = allocate_filled(4, 3u8, false).unwrap();
    assert!(!plain.is_pinned());
    assert_eq!(plain.as_slice(), &[3, 3, 3, 3]);
}

#[test]
fn test_pinned_address_stable_across_moves() {
    let tensor = Tensor::<f32>::zeros([64usize], true).unwrap();
    let before = tensor.as_slice().as_ptr();
    let moved = vec![tensor];
    assert_eq!(moved[0].as_slice().as_ptr(), before);
}

#[test]
fn test_uninit_fully_overwritten() {
    // SAFETY: every element is written before any read.
    let mut tensor = unsafe { Tensor::<u8>::uninit([4usize], false) }.unwrap();
    tensor.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
    assert_eq!(tensor.view().sum(), 10);
}

#[test]
fn test_softmax_through_both_views() {
    let mut tensor = Tensor::from_slice([1usize, 4], &[0.0f32, 0.0, 0.0, 0.0], false).unwrap();
    tensor.softmax_in_place();
    let native = tensor.as_native("probs");
    assert!(native
        .as_slice::<f32>()
        .unwrap()
        .iter()
        .all(|&p| (p - 0.25).abs() < 1e-6));
}
