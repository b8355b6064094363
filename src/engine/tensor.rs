//! Copying between ndarray buffers and OpenVINO tensors

use anyhow::Result;
use ndarray::{Array4, ArrayView4};
use openvino::{ElementType, Shape, Tensor};

/// Build an f32 OpenVINO tensor from an NCHW view (any memory layout)
pub fn to_tensor(view: ArrayView4<f32>) -> Result<Tensor> {
    let dims: Vec<i64> = view.shape().iter().map(|&d| d as i64).collect();
    let shape = Shape::new(&dims)?;
    let mut tensor = Tensor::new(ElementType::F32, &shape)?;

    // Logical iteration order is row-major regardless of the view's strides
    let data: Vec<f32> = view.iter().copied().collect();
    unsafe {
        let tensor_data = tensor.get_raw_data_mut()?.as_mut_ptr() as *mut f32;
        std::ptr::copy_nonoverlapping(data.as_ptr(), tensor_data, data.len());
    }

    Ok(tensor)
}

/// Read tensor data as f32 vector
pub fn read_f32(tensor: &Tensor) -> Result<Vec<f32>> {
    let shape = tensor.get_shape()?;
    let dims: Vec<i64> = shape.get_dimensions().to_vec();
    let total_elements: i64 = dims.iter().product();

    let data: Vec<f32> = unsafe {
        let ptr = tensor.get_raw_data()?.as_ptr() as *const f32;
        std::slice::from_raw_parts(ptr, total_elements as usize).to_vec()
    };

    Ok(data)
}

/// Read an NCHW f32 tensor into an owned array
pub fn read_array4(tensor: &Tensor) -> Result<Array4<f32>> {
    let shape = tensor.get_shape()?;
    let dims = shape.get_dimensions();
    if dims.len() != 4 {
        anyhow::bail!("Expected a 4-D output tensor, got shape {:?}", dims);
    }
    let dims = (
        dims[0] as usize,
        dims[1] as usize,
        dims[2] as usize,
        dims[3] as usize,
    );
    let data = read_f32(tensor)?;
    Ok(Array4::from_shape_vec(dims, data)?)
}
