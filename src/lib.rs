//! pixmix is a 2-D raster compositing and sampling engine.
//!
//! Images are described over caller memory in one of many pixel formats, optionally with a
//! transform, filter, repeat mode, alpha map and dither mode. [`composite`] combines a source,
//! an optional mask and a destination with any of the Porter-Duff or blend [`Operator`]s:
//!
//! - Describe images with [`describe_image`] (or [`Image::new_owned`] / [`Image::solid`])
//! - Configure sampling with the `Image::set_*` mutators
//! - Call [`composite`], or [`composite_with`] for an explicitly configured [`Engine`]
#![forbid(unsafe_code)]

mod foundation;

pub mod composite;
pub mod filter;
pub mod format;
pub mod image;
pub mod operator;
pub mod pipeline;

pub use crate::composite::{composite, composite_with};
pub use crate::filter::{Kernel, convolution_params, separable_params};
pub use crate::format::{ChannelOrder, PixelFormat};
pub use crate::foundation::error::{PixError, PixResult};
pub use crate::foundation::fixed::{
    FIXED_E, FIXED_HALF, FIXED_ONE, Fixed, Transform, double_to_fixed, fixed_frac,
    fixed_to_double, fixed_to_int, int_to_fixed,
};
pub use crate::foundation::math::{
    Argb, add_channel, alpha, blue, divide_channel, float_to_unorm, green, multiply_channel,
    pack_argb, red, un8x4_add_un8x4, un8x4_mul_un8, un8x4_mul_un8_add_un8x4,
    un8x4_mul_un8_add_un8x4_mul_un8, un8x4_mul_un8x4, un8x4_mul_un8x4_add_un8x4,
    un8x4_mul_un8x4_add_un8x4_mul_un8, unorm_to_float, unorm_to_unorm,
};
pub use crate::image::{
    AlphaMap, FilterKind, FilterParams, Flags, Image, PixelBuffer, Repeat, describe_image,
};
pub use crate::operator::Operator;
pub use crate::pipeline::dispatch::{Engine, EngineOpts};
pub use crate::pipeline::dither::{DitherMode, dither};
pub use crate::pipeline::iter::{Precision, Scanline};
