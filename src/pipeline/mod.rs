//! Scanline machinery: fetch/store, sampling, dithering, combiners and dispatch.

pub mod combine;
pub mod combine_float;
pub mod dispatch;
pub mod dither;
pub mod fast_path;
pub mod general;
pub mod iter;
pub mod sampler;
