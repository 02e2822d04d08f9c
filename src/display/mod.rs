//! Display mapping: turn an arbitrary image into an 8-bit grey or RGB raster.
//!
//! ## Pipeline
//!
//! 1. Pick the displayed axes (`dim1` horizontal, `dim2` vertical or none). A
//!    slice with a coordinate for every axis except `dim1` shows a 1-D profile
//! 2. Collapse the other axes by slicing, maximum or mean ([`ProjectionMode`])
//! 3. Reduce tensor images to three channels: sRGB passes through, other color
//!    spaces go through a [`ColorSpaceConverter`], anything else shows
//!    selected channels as red, green and blue
//! 4. Reduce complex samples to real values ([`ComplexMode`])
//! 5. Map onto `[0, 255]` with the limits of the [`RangeMode`]
//!
//! Binary images ignore the range and show as 0 and 255. When a slice is shown
//! out of a higher-dimensional image, data-derived limits come from the whole
//! image so that stepping through slices keeps the same mapping.
//!
//! ## Example
//!
//! ```ignore
//! use pydip_rust::display::{image_display, DisplayParams, RangeMode};
//!
//! let params = DisplayParams { range: RangeMode::Percentile, ..Default::default() };
//! let raster = image_display(&img, &params)?;
//! ```

pub mod colormap;
mod mapping;
pub mod params;
mod projection;

use ndarray::{ArrayD, IxDyn};

use crate::error::{DipError, Result};
use crate::image::{DataType, Image, PixelValue, Tensor};

pub use colormap::{apply_color_map, ColorMap};
pub use mapping::Limits;
pub use params::{ComplexMode, DisplayParams, ProjectionMode, RangeMode};

use mapping::{data_limits, map_binary, real_values, Scaling};
use projection::{project, resolve_coordinates};

/// Conversion of tensor images from a named color space to sRGB.
///
/// The display mapper has no color science of its own; hosts that know about
/// color spaces other than sRGB plug their conversion in here.
pub trait ColorSpaceConverter {
    /// Number of channels of `color_space`, or `None` if it is unknown.
    fn channels(&self, color_space: &str) -> Option<usize>;

    /// Convert `image`, which is in its own color space, to a 3-channel sRGB image.
    fn to_srgb(&self, image: &Image) -> Result<Image>;
}

fn is_srgb(color_space: &str) -> bool {
    color_space == "sRGB" || color_space == "RGB"
}

// ============================================================================
// Output raster
// ============================================================================

/// 8-bit display output.
///
/// The array has shape `(height, width)` for 2-D output or `(length,)` for
/// 1-D output, with a trailing axis of 3 for RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayRaster {
    pixels: ArrayD<u8>,
    channels: usize,
}

impl DisplayRaster {
    /// Wrap display values laid out in raster order (dimension 0 fastest).
    fn from_plane(sizes: &[usize], channels: usize, data: Vec<u8>) -> Result<Self> {
        let mut shape: Vec<usize> = sizes.iter().rev().copied().collect();
        if channels > 1 {
            shape.push(channels);
        }
        let found = data.len();
        let pixels = ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|_| DipError::LengthMismatch {
            expected: shape.iter().product(),
            found,
        })?;
        Ok(DisplayRaster { pixels, channels })
    }

    pub fn pixels(&self) -> &ArrayD<u8> {
        &self.pixels
    }

    pub fn into_pixels(self) -> ArrayD<u8> {
        self.pixels
    }

    /// 1 for grey, 3 for RGB.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_rgb(&self) -> bool {
        self.channels == 3
    }

    /// Number of spatial axes, 1 or 2.
    pub fn dimensionality(&self) -> usize {
        self.pixels.ndim() - usize::from(self.channels > 1)
    }

    pub fn width(&self) -> usize {
        let shape = self.pixels.shape();
        if self.dimensionality() == 2 {
            shape[1]
        } else {
            shape[0]
        }
    }

    pub fn height(&self) -> usize {
        if self.dimensionality() == 2 {
            self.pixels.shape()[0]
        } else {
            1
        }
    }

    /// Render a grey raster through a color map. RGB rasters are returned as is.
    pub fn apply_color_map(&self, map: ColorMap) -> DisplayRaster {
        if self.is_rgb() {
            return self.clone();
        }
        let indices: Vec<u8> = self.pixels.iter().copied().collect();
        let rgb = map.apply_to_slice(&indices);
        let mut shape = self.pixels.shape().to_vec();
        shape.push(3);
        match ArrayD::from_shape_vec(IxDyn(&shape), rgb) {
            Ok(pixels) => DisplayRaster { pixels, channels: 3 },
            Err(_) => self.clone(),
        }
    }
}

// ============================================================================
// ImageDisplay
// ============================================================================

/// Resolved view parameters for one image.
#[derive(Debug)]
struct Plan {
    axes: Vec<usize>,
    projection: ProjectionMode,
    complex_mode: ComplexMode,
    coordinates: Vec<usize>,
    global_stretch: bool,
}

/// Display mapper for one image.
///
/// Holds the image and the display parameters; every call to [`output`]
/// recomputes the raster from the current image contents.
///
/// [`output`]: ImageDisplay::output
pub struct ImageDisplay<'a> {
    image: &'a Image,
    params: DisplayParams,
    converter: Option<&'a dyn ColorSpaceConverter>,
    channels: [Option<usize>; 3],
}

impl<'a> ImageDisplay<'a> {
    pub fn new(image: &'a Image, params: DisplayParams) -> Self {
        ImageDisplay {
            image,
            params,
            converter: None,
            channels: [Some(0), Some(1), Some(2)],
        }
    }

    /// Use `converter` for images whose color space is not sRGB.
    pub fn with_converter(mut self, converter: &'a dyn ColorSpaceConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Tensor elements shown as red, green and blue for images without a
    /// usable color space. `None`, or an element the image does not have,
    /// shows as black.
    pub fn with_channels(mut self, red: Option<usize>, green: Option<usize>, blue: Option<usize>) -> Self {
        self.channels = [red, green, blue];
        self
    }

    pub fn params(&self) -> &DisplayParams {
        &self.params
    }

    fn display_axes(&self) -> Result<Vec<usize>> {
        let sizes = self.image.sizes();
        let ndims = sizes.len();
        let dim1 = self.params.dim1;
        if dim1 >= ndims {
            return Err(DipError::InvalidAxis(format!("dim1 = {dim1} for a {ndims}-D image")));
        }
        // Slice coordinates for every axis but dim1 select a profile.
        let profile = self.params.projection == ProjectionMode::Slice
            && ndims > 1
            && self.params.coordinates.len() == ndims - 1;
        let axes = match self.params.dim2 {
            None => vec![dim1],
            Some(_) if profile => vec![dim1],
            Some(_) if ndims == 1 => vec![dim1],
            Some(dim2) if dim2 >= ndims => {
                return Err(DipError::InvalidAxis(format!("dim2 = {dim2} for a {ndims}-D image")));
            }
            Some(dim2) if dim2 == dim1 => {
                // Allowed only when the image is really 1-D.
                let extended: Vec<usize> = (0..ndims).filter(|&d| sizes[d] > 1).collect();
                if extended.len() > 1 {
                    return Err(DipError::InvalidAxis("dim1 and dim2 must differ".into()));
                }
                vec![extended.first().copied().unwrap_or(dim1)]
            }
            Some(dim2) => vec![dim1, dim2],
        };
        Ok(axes)
    }

    fn plan(&self) -> Result<Plan> {
        if self.image.number_of_pixels() <= 1 {
            return Err(DipError::EmptyInput(format!(
                "cannot display an image of {} pixels",
                self.image.number_of_pixels()
            )));
        }
        let axes = self.display_axes()?;
        let collapsed = self.image.dimensionality() > axes.len();
        let projection = if collapsed { self.params.projection } else { ProjectionMode::Slice };
        let coordinates = if self.params.projection == ProjectionMode::Slice {
            resolve_coordinates(self.image, &axes, &self.params.coordinates)?
        } else {
            Vec::new()
        };
        let complex_mode = if projection == ProjectionMode::Max {
            ComplexMode::Magnitude
        } else {
            self.params.complex_mode
        };
        let plan = Plan {
            global_stretch: collapsed && projection == ProjectionMode::Slice,
            axes,
            projection,
            complex_mode,
            coordinates,
        };
        log::debug!("display plan: {plan:?}");
        Ok(plan)
    }

    /// Reduce a tensor image to one or three channels.
    fn display_channels(&self, image: &Image) -> Result<Image> {
        if image.is_scalar() {
            return Ok(image.clone());
        }
        let elements = image.tensor_elements();
        let space = image.color_space();
        if is_srgb(space) && elements == 3 {
            return Ok(image.clone());
        }
        if !space.is_empty() && !is_srgb(space) {
            match self.converter.filter(|c| c.channels(space) == Some(elements)) {
                Some(converter) => {
                    let rgb = converter.to_srgb(image)?;
                    if rgb.tensor_elements() != 3 {
                        return Err(DipError::TensorMismatch {
                            expected: 3,
                            found: rgb.tensor_elements(),
                        });
                    }
                    return Ok(rgb);
                }
                None => log::warn!("no conversion from color space '{space}' to sRGB, showing channels"),
            }
        }
        let out = Image::create(image.sizes(), Tensor::vector(3), image.data_type())?;
        for (k, source) in self.channels.iter().enumerate() {
            if let Some(c) = source.filter(|&c| c < elements) {
                out.tensor_element(k as isize)?
                    .copy_from(&image.tensor_element(c as isize)?)?;
            }
        }
        Ok(out)
    }

    fn limits_for(&self, plan: &Plan, shown: &Image) -> Result<Limits> {
        if let Some((lower, upper)) = self.params.range.fixed_limits() {
            return Ok(Limits::new(lower, upper));
        }
        let source = if plan.global_stretch {
            self.display_channels(self.image)?
        } else {
            shown.clone()
        };
        let limits = data_limits(&real_values(&source.samples(), plan.complex_mode), self.params.range);
        log::debug!("display limits [{}, {}]", limits.lower, limits.upper);
        Ok(limits)
    }

    /// The projected plane before channel reduction and intensity mapping.
    pub fn slice(&self) -> Result<Image> {
        let plan = self.plan()?;
        project(self.image, &plan.axes, plan.projection, &plan.coordinates)
    }

    /// Limits the current parameters map to 0 and 255.
    pub fn limits(&self) -> Result<Limits> {
        let plan = self.plan()?;
        let shown = self.display_channels(&project(self.image, &plan.axes, plan.projection, &plan.coordinates)?)?;
        self.limits_for(&plan, &shown)
    }

    /// Compute the display raster.
    pub fn output(&self) -> Result<DisplayRaster> {
        let plan = self.plan()?;
        let plane = project(self.image, &plan.axes, plan.projection, &plan.coordinates)?;
        let shown = self.display_channels(&plane)?;
        let samples = shown.samples();
        let mapped = if shown.data_type().is_binary() {
            map_binary(&samples)
        } else {
            let limits = self.limits_for(&plan, &shown)?;
            Scaling::new(self.params.range, limits).map_all(&real_values(&samples, plan.complex_mode))
        };
        DisplayRaster::from_plane(shown.sizes(), shown.tensor_elements(), mapped)
    }

    /// Display value of a single pixel value under the current mapping.
    ///
    /// # Arguments
    /// * `value` - One sample per tensor element of the image, or a single
    ///   sample used for all of them
    ///
    /// # Returns
    /// One display value for scalar images, three otherwise.
    pub fn map_pixel(&self, value: impl Into<PixelValue>) -> Result<Vec<u8>> {
        let plan = self.plan()?;
        let value: PixelValue = value.into();
        let samples = value.broadcast_to(self.image.tensor_elements())?;
        let data_type = match self.image.data_type() {
            DataType::Bin => DataType::Bin,
            dt if dt.is_complex() => DataType::C64,
            _ => DataType::F64,
        };
        let mut pixel = Image::from_samples(&[1], self.image.tensor(), data_type, &samples)?;
        pixel.set_color_space(self.image.color_space());
        let shown = self.display_channels(&pixel)?;
        let samples = shown.samples();
        if data_type == DataType::Bin {
            return Ok(map_binary(&samples));
        }
        let plane = project(self.image, &plan.axes, plan.projection, &plan.coordinates)?;
        let limits = self.limits_for(&plan, &self.display_channels(&plane)?)?;
        Ok(Scaling::new(self.params.range, limits).map_all(&real_values(&samples, plan.complex_mode)))
    }
}

/// Map `image` to an 8-bit raster in one call.
///
/// # Arguments
/// * `image` - Any image with at least two pixels
/// * `params` - Display options
///
/// # Returns
/// A grey raster for scalar images, an RGB raster otherwise.
pub fn image_display(image: &Image, params: &DisplayParams) -> Result<DisplayRaster> {
    ImageDisplay::new(image, params.clone()).output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Range;
    use num_complex::Complex32;

    fn params(range: RangeMode) -> DisplayParams {
        DisplayParams {
            range,
            ..Default::default()
        }
    }

    fn gradient() -> Image {
        // 4x2: value = x + 4y, 0..7
        Image::from_vec(&[4, 2], Tensor::scalar(), (0u8..8).collect()).unwrap()
    }

    #[test]
    fn test_linear_stretch_2d() {
        let raster = image_display(&gradient(), &params(RangeMode::Linear)).unwrap();
        assert_eq!(raster.pixels().shape(), &[2, 4]);
        assert_eq!((raster.width(), raster.height()), (4, 2));
        assert_eq!(raster.pixels()[[0, 0]], 0);
        assert_eq!(raster.pixels()[[1, 3]], 255);
        // 4 of 7 steps: 145.7
        assert_eq!(raster.pixels()[[1, 0]], 146);
    }

    #[test]
    fn test_swapped_axes() {
        let p = DisplayParams {
            range: RangeMode::Normal,
            dim1: 1,
            dim2: Some(0),
            ..Default::default()
        };
        let raster = image_display(&gradient(), &p).unwrap();
        assert_eq!(raster.pixels().shape(), &[4, 2]);
        assert_eq!(raster.pixels()[[3, 1]], 7);
    }

    #[test]
    fn test_profile_along_dim1() {
        let p = DisplayParams {
            range: RangeMode::Manual { lower: 0.0, upper: 255.0 },
            projection: ProjectionMode::Slice,
            coordinates: vec![1],
            dim2: None,
            ..Default::default()
        };
        let raster = image_display(&gradient(), &p).unwrap();
        assert_eq!(raster.dimensionality(), 1);
        assert_eq!(raster.pixels().as_slice().unwrap(), &[4, 5, 6, 7]);
    }

    #[test]
    fn test_profile_from_coordinates() {
        let p = DisplayParams {
            range: RangeMode::Manual { lower: 0.0, upper: 255.0 },
            projection: ProjectionMode::Slice,
            coordinates: vec![1],
            ..Default::default()
        };
        assert_eq!(p.dim2, Some(1));
        let raster = image_display(&gradient(), &p).unwrap();
        assert_eq!(raster.dimensionality(), 1);
        assert_eq!(raster.pixels().as_slice().unwrap(), &[4, 5, 6, 7]);

        let column = DisplayParams { dim1: 1, coordinates: vec![2], ..p };
        let raster = image_display(&gradient(), &column).unwrap();
        assert_eq!(raster.pixels().as_slice().unwrap(), &[2, 6]);
    }

    #[test]
    fn test_coordinates_checked_for_slices_only() {
        let img = gradient();
        let mean = DisplayParams {
            range: RangeMode::Normal,
            projection: ProjectionMode::Mean,
            coordinates: vec![5, 5, 5],
            ..Default::default()
        };
        let raster = image_display(&img, &mean).unwrap();
        assert_eq!(raster.pixels().shape(), &[2, 4]);
        assert_eq!(raster.pixels()[[1, 3]], 7);

        let slice = DisplayParams {
            projection: ProjectionMode::Slice,
            ..mean.clone()
        };
        assert!(matches!(image_display(&img, &slice), Err(DipError::InvalidProjection(_))));

        let cube = Image::new(&[2, 2, 2], DataType::U8).unwrap();
        let slice = DisplayParams {
            projection: ProjectionMode::Slice,
            coordinates: vec![1, 1, 1, 1],
            ..Default::default()
        };
        assert!(matches!(image_display(&cube, &slice), Err(DipError::InvalidProjection(_))));
        assert!(image_display(&cube, &DisplayParams { projection: ProjectionMode::Max, ..slice }).is_ok());
    }

    #[test]
    fn test_global_stretch_for_slices() {
        let data: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let img = Image::from_vec(&[2, 2, 2], Tensor::scalar(), data).unwrap();
        let p = DisplayParams {
            projection: ProjectionMode::Slice,
            coordinates: vec![0],
            ..Default::default()
        };
        let display = ImageDisplay::new(&img, p);
        assert_eq!(display.limits().unwrap(), Limits::new(0.0, 7.0));
        let slice = display.slice().unwrap();
        assert_eq!(slice.sizes(), &[2, 2]);
        assert!(slice.shares_data(&img));

        // Projections stretch the projected plane only.
        let p = DisplayParams {
            projection: ProjectionMode::Max,
            ..Default::default()
        };
        assert_eq!(ImageDisplay::new(&img, p).limits().unwrap(), Limits::new(4.0, 7.0));
    }

    #[test]
    fn test_invalid_axes_and_sizes() {
        let img = gradient();
        let p = DisplayParams { dim1: 2, ..Default::default() };
        assert!(matches!(image_display(&img, &p), Err(DipError::InvalidAxis(_))));
        let p = DisplayParams { dim2: Some(0), ..Default::default() };
        assert!(matches!(image_display(&img, &p), Err(DipError::InvalidAxis(_))));

        let single = Image::new(&[1, 1], DataType::U8).unwrap();
        assert!(matches!(image_display(&single, &DisplayParams::default()), Err(DipError::EmptyInput(_))));
    }

    #[test]
    fn test_equal_axes_on_degenerate_image() {
        let img = Image::from_vec(&[1, 3], Tensor::scalar(), vec![0u8, 10, 20]).unwrap();
        let p = DisplayParams { dim2: Some(0), ..Default::default() };
        let raster = image_display(&img, &p).unwrap();
        assert_eq!(raster.pixels().as_slice().unwrap(), &[0, 128, 255]);
    }

    #[test]
    fn test_binary_ignores_range() {
        let img = gradient().greater(3u8).unwrap();
        let raster = image_display(&img, &params(RangeMode::Bits16)).unwrap();
        assert_eq!(raster.pixels()[[0, 3]], 0);
        assert_eq!(raster.pixels()[[1, 0]], 255);
    }

    #[test]
    fn test_complex_modes() {
        let data = vec![Complex32::new(3.0, 4.0), Complex32::new(0.0, 0.0)];
        let img = Image::from_vec(&[2], Tensor::scalar(), data).unwrap();
        let mut p = params(RangeMode::Manual { lower: 0.0, upper: 10.0 });
        assert_eq!(image_display(&img, &p).unwrap().pixels().as_slice().unwrap(), &[128, 0]);
        p.complex_mode = ComplexMode::Real;
        assert_eq!(image_display(&img, &p).unwrap().pixels().as_slice().unwrap(), &[77, 0]);
        p.complex_mode = ComplexMode::Imag;
        assert_eq!(image_display(&img, &p).unwrap().pixels().as_slice().unwrap(), &[102, 0]);
    }

    #[test]
    fn test_tensor_channel_selection() {
        let img = Image::create(&[2, 2], Tensor::vector(2), DataType::U8).unwrap();
        img.tensor_element(0).unwrap().fill(255u8).unwrap();
        img.tensor_element(1).unwrap().at(&[Range::single(0), Range::all()]).unwrap().fill(255u8).unwrap();
        let raster = image_display(&img, &params(RangeMode::Normal)).unwrap();
        assert!(raster.is_rgb());
        assert_eq!(raster.pixels().shape(), &[2, 2, 3]);
        assert_eq!(raster.pixels()[[0, 0, 0]], 255);
        assert_eq!(raster.pixels()[[0, 0, 1]], 255);
        assert_eq!(raster.pixels()[[0, 1, 1]], 0);
        assert_eq!(raster.pixels()[[0, 0, 2]], 0);

        let swapped = ImageDisplay::new(&img, params(RangeMode::Normal))
            .with_channels(Some(1), None, Some(0))
            .output()
            .unwrap();
        assert_eq!(swapped.pixels()[[0, 1, 0]], 0);
        assert_eq!(swapped.pixels()[[0, 1, 2]], 255);
    }

    struct Bgr;

    impl ColorSpaceConverter for Bgr {
        fn channels(&self, color_space: &str) -> Option<usize> {
            (color_space == "BGR").then_some(3)
        }

        fn to_srgb(&self, image: &Image) -> Result<Image> {
            let mut rgb = image.tensor_element_range(Range::new(2, 0, 1))?.copy()?;
            rgb.set_color_space("sRGB");
            Ok(rgb)
        }
    }

    #[test]
    fn test_color_space_conversion() {
        let mut img = Image::create(&[2, 1], Tensor::vector(3), DataType::U8).unwrap();
        img.set_color_space("BGR");
        img.fill([10u8, 20, 30]).unwrap();
        let display = ImageDisplay::new(&img, params(RangeMode::Normal)).with_converter(&Bgr);
        let raster = display.output().unwrap();
        assert_eq!(raster.pixels()[[0, 0, 0]], 30);
        assert_eq!(raster.pixels()[[0, 0, 2]], 10);
        assert_eq!(display.map_pixel([1u8, 2, 3]).unwrap(), vec![3, 2, 1]);
    }

    #[test]
    fn test_map_pixel() {
        let img = gradient();
        let display = ImageDisplay::new(&img, params(RangeMode::Linear));
        assert_eq!(display.map_pixel(7u8).unwrap(), vec![255]);
        assert_eq!(display.map_pixel(3.5f64).unwrap(), vec![128]);
        assert_eq!(display.map_pixel(100.0f64).unwrap(), vec![255]);
    }

    #[test]
    fn test_color_map_on_raster() {
        let raster = image_display(&gradient(), &params(RangeMode::Modulo)).unwrap();
        let rgb = raster.apply_color_map(ColorMap::Label);
        assert_eq!(rgb.pixels().shape(), &[2, 4, 3]);
        assert_eq!(rgb.pixels()[[0, 1, 0]], 255);
        assert_eq!(rgb.apply_color_map(ColorMap::Grey), rgb);
    }
}
