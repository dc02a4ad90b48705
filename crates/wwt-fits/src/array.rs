use ndarray::{Array, ArrayD, ArrayViewD, IxDyn};

use crate::error::{Error, Result};
use crate::image::DecodedImage;

/// Shape in C order: `[NAXISn, ..., NAXIS1]`.
fn c_order_shape(image: &DecodedImage) -> Vec<usize> {
    image.axes().sizes().iter().rev().copied().collect()
}

fn shape_error(e: ndarray::ShapeError) -> Error {
    Error::InvalidValue {
        keyword: "NAXISn",
        value: e.to_string(),
    }
}

impl DecodedImage {
    /// Raw samples as an owned n-dimensional array, slowest axis first.
    pub fn to_array(&self) -> Result<ArrayD<f64>> {
        Array::from_shape_vec(IxDyn(&c_order_shape(self)), self.pixels().to_vec())
            .map_err(shape_error)
    }

    /// Borrowed view of the raw samples with the same layout as [`to_array`](Self::to_array).
    pub fn array_view(&self) -> Result<ArrayViewD<'_, f64>> {
        ArrayViewD::from_shape(IxDyn(&c_order_shape(self)), self.pixels()).map_err(shape_error)
    }
}
