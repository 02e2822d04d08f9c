//! PyDIP Rust core
//!
//! A strided N-dimensional image container with shared-buffer views, tensor
//! (multi-channel) pixels and mask indexing, plus a display mapper that turns
//! any such image into an 8-bit grey or RGB raster. Python bindings are
//! provided via PyO3 and WASM bindings for JavaScript.
//!
//! ## Image Model
//! - **Sizes**: any number of dimensions, dimension 0 fastest (x, y, z, ...)
//! - **Tensor**: every pixel holds a scalar, vector or matrix of samples
//! - **Data types**: binary, 8 to 64 bit integers, float and complex
//!
//! Indexing with [`Range`] produces views that share the buffer of the image
//! they were taken from; writes through a view are visible in the parent.
//!
//! ## Display
//! [`image_display`] projects an image onto one or two axes, reduces complex
//! values and maps intensities onto `[0, 255]` according to a [`RangeMode`].
//! Rasters can be rendered through a [`ColorMap`].
//!
//! ## Feature Flags
//! - `python`: PyO3 extension module `pydip_rust`
//! - `wasm`: wasm-bindgen exports

pub mod display;
pub mod error;
pub mod image;
pub mod io;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use crate::display::{
    apply_color_map, image_display, ColorMap, ColorSpaceConverter, ComplexMode, DisplayParams,
    DisplayRaster, ImageDisplay, Limits, ProjectionMode, RangeMode,
};
pub use crate::error::{DipError, Result};
pub use crate::image::{DataType, Image, PixelValue, Range, Sample, Tensor};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{Element, IntoPyArray, PyArray2, PyArrayDyn, PyReadonlyArrayDyn};
    use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
    use pyo3::prelude::*;

    use crate::display::{ColorMap, DisplayParams, DisplayRaster, ImageDisplay, RangeMode};
    use crate::error::DipError;
    use crate::image::{BufferElement, Image};

    impl From<DipError> for PyErr {
        fn from(err: DipError) -> PyErr {
            let message = err.to_string();
            match err {
                DipError::Index { .. } => PyIndexError::new_err(message),
                DipError::DimensionMismatch { .. }
                | DipError::LengthMismatch { .. }
                | DipError::TensorMismatch { .. }
                | DipError::InvalidAxis(_)
                | DipError::InvalidProjection(_)
                | DipError::InvalidParameter(_)
                | DipError::EmptyInput(_) => PyValueError::new_err(message),
                _ => PyRuntimeError::new_err(message),
            }
        }
    }

    /// Options shared by the display functions, parsed from Python keywords.
    #[allow(clippy::too_many_arguments)]
    fn display_params(
        range: &str,
        complex_mode: &str,
        projection: &str,
        coordinates: Vec<usize>,
        dim1: usize,
        dim2: Option<usize>,
        limits: Option<(f64, f64)>,
    ) -> PyResult<DisplayParams> {
        let range = match limits {
            Some((lower, upper)) => RangeMode::Manual { lower, upper },
            None => range.parse()?,
        };
        Ok(DisplayParams {
            range,
            complex_mode: complex_mode.parse()?,
            projection: projection.parse()?,
            coordinates,
            dim1,
            dim2,
            color_map: None,
        })
    }

    fn display_array<'py, T: BufferElement + Element>(
        py: Python<'py>,
        array: PyReadonlyArrayDyn<'py, T>,
        channels_last: bool,
        params: &DisplayParams,
    ) -> PyResult<Bound<'py, PyArrayDyn<u8>>> {
        let image = Image::from_ndarray(array.as_array(), channels_last)?;
        let raster: DisplayRaster = ImageDisplay::new(&image, params.clone()).output()?;
        Ok(raster.into_pixels().into_pyarray(py))
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Map a UINT8 array to an 8-bit display raster.
    ///
    /// Array axes are in NumPy order (the last axis is x). With
    /// `channels_last`, the last axis holds tensor elements.
    ///
    /// # Arguments
    /// * `image` - Input array
    /// * `range` - Range mode name (`"lin"`, `"percentile"`, `"8bit"`, ...)
    /// * `limits` - Explicit `(lower, upper)`, overrides `range`
    /// * `complex_mode` - Ignored for real input
    /// * `projection` - `"slice"`, `"max"` or `"mean"`
    /// * `coordinates` - Slice position
    /// * `dim1`, `dim2` - Displayed axes, in image (x-first) order
    #[pyfunction]
    #[pyo3(signature = (image, range="lin", limits=None, complex_mode="abs", projection="mean",
                        coordinates=vec![], dim1=0, dim2=Some(1), channels_last=false))]
    #[allow(clippy::too_many_arguments)]
    pub fn image_display<'py>(
        py: Python<'py>,
        image: PyReadonlyArrayDyn<'py, u8>,
        range: &str,
        limits: Option<(f64, f64)>,
        complex_mode: &str,
        projection: &str,
        coordinates: Vec<usize>,
        dim1: usize,
        dim2: Option<usize>,
        channels_last: bool,
    ) -> PyResult<Bound<'py, PyArrayDyn<u8>>> {
        let params = display_params(range, complex_mode, projection, coordinates, dim1, dim2, limits)?;
        display_array(py, image, channels_last, &params)
    }

    /// Map a float64 array to an 8-bit display raster.
    ///
    /// Same options as `image_display`.
    #[pyfunction]
    #[pyo3(signature = (image, range="lin", limits=None, complex_mode="abs", projection="mean",
                        coordinates=vec![], dim1=0, dim2=Some(1), channels_last=false))]
    #[allow(clippy::too_many_arguments)]
    pub fn image_display_f64<'py>(
        py: Python<'py>,
        image: PyReadonlyArrayDyn<'py, f64>,
        range: &str,
        limits: Option<(f64, f64)>,
        complex_mode: &str,
        projection: &str,
        coordinates: Vec<usize>,
        dim1: usize,
        dim2: Option<usize>,
        channels_last: bool,
    ) -> PyResult<Bound<'py, PyArrayDyn<u8>>> {
        let params = display_params(range, complex_mode, projection, coordinates, dim1, dim2, limits)?;
        display_array(py, image, channels_last, &params)
    }

    // ========================================================================
    // Color maps
    // ========================================================================

    /// Render a grey display raster through a named color map.
    ///
    /// Returns the input shape with a trailing axis of 3.
    #[pyfunction]
    pub fn apply_color_map<'py>(
        py: Python<'py>,
        raster: PyReadonlyArrayDyn<'py, u8>,
        color_map: &str,
    ) -> PyResult<Bound<'py, PyArrayDyn<u8>>> {
        let map: ColorMap = color_map.parse()?;
        let input = raster.as_array();
        let indices: Vec<u8> = input.iter().copied().collect();
        let mut shape = input.shape().to_vec();
        shape.push(3);
        let rgb = ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(&shape), map.apply_to_slice(&indices))
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(rgb.into_pyarray(py))
    }

    /// The 256x3 lookup table of a named color map.
    #[pyfunction]
    pub fn color_map_lut<'py>(py: Python<'py>, color_map: &str) -> PyResult<Bound<'py, PyArray2<u8>>> {
        let map: ColorMap = color_map.parse()?;
        let lut = ndarray::Array2::from_shape_fn((256, 3), |(i, c)| map.color(i as u8)[c]);
        Ok(lut.into_pyarray(py))
    }

    #[pymodule]
    pub fn pydip_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Display
        m.add_function(wrap_pyfunction!(image_display, m)?)?;
        m.add_function(wrap_pyfunction!(image_display_f64, m)?)?;

        // Color maps
        m.add_function(wrap_pyfunction!(apply_color_map, m)?)?;
        m.add_function(wrap_pyfunction!(color_map_lut, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::pydip_rust;
