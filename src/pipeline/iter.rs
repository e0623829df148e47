//! Row-at-a-time fetch and store against described images.
//!
//! Narrow rows hold packed `a8r8g8b8` words, wide rows hold [`Argb`] floats. Alpha maps are
//! merged on every fetch and written back on every store.

use crate::foundation::error::{PixError, PixResult};
use crate::foundation::math::{Argb, alpha};
use crate::image::{Image, Repeat};
use crate::pipeline::dither::dither_row;

/// Which pixel representation a row is fetched in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precision {
    Narrow,
    Wide,
}

/// One call-local row of pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum Scanline {
    Narrow(Vec<u32>),
    Wide(Vec<Argb>),
}

impl Scanline {
    /// A zeroed (transparent) row, reserved fallibly.
    pub fn transparent(precision: Precision, width: usize) -> PixResult<Self> {
        Ok(match precision {
            Precision::Narrow => Self::Narrow(zeroed(width)?),
            Precision::Wide => Self::Wide(zeroed(width)?),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Narrow(v) => v.len(),
            Self::Wide(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn precision(&self) -> Precision {
        match self {
            Self::Narrow(_) => Precision::Narrow,
            Self::Wide(_) => Precision::Wide,
        }
    }
}

pub(crate) fn zeroed<T: Default + Clone>(width: usize) -> PixResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(width).map_err(|e| {
        tracing::warn!(width, "scanline allocation failed");
        PixError::from(e)
    })?;
    v.resize(width, T::default());
    Ok(v)
}

/// A pixel representation the iterator and sampler can move around.
pub(crate) trait Pixel: Copy + Default {
    /// Reads the in-bounds pixel at `(x, y)`, replacing alpha from the alpha map if any.
    fn fetch(image: &Image<'_>, x: usize, y: usize) -> Self;
}

impl Pixel for u32 {
    #[inline]
    fn fetch(image: &Image<'_>, x: usize, y: usize) -> Self {
        let p = image.format().read_narrow(image.row(y), x);
        match image.alpha_map() {
            None => p,
            Some(map) => {
                let a = map_pixel(map.image(), x, y, map.origin())
                    .map(|m: u32| alpha(m))
                    .unwrap_or(0);
                (p & 0x00ff_ffff) | (a << 24)
            }
        }
    }
}

impl Pixel for Argb {
    #[inline]
    fn fetch(image: &Image<'_>, x: usize, y: usize) -> Self {
        let mut p = image.format().read_wide(image.row(y), x);
        if let Some(map) = image.alpha_map() {
            p.a = map_pixel(map.image(), x, y, map.origin())
                .map(|m: Argb| m.a)
                .unwrap_or(0.0);
        }
        p
    }
}

/// Pixel of an alpha map at owner coordinates `(x, y)`; `None` outside the map.
fn map_pixel<P: MapRead>(map: &Image<'_>, x: usize, y: usize, origin: (i32, i32)) -> Option<P> {
    let mx = x as i64 - i64::from(origin.0);
    let my = y as i64 - i64::from(origin.1);
    if mx < 0 || my < 0 || mx >= i64::from(map.width()) || my >= i64::from(map.height()) {
        return None;
    }
    Some(P::read(map, mx as usize, my as usize))
}

trait MapRead {
    fn read(map: &Image<'_>, x: usize, y: usize) -> Self;
}

impl MapRead for u32 {
    fn read(map: &Image<'_>, x: usize, y: usize) -> Self {
        map.format().read_narrow(map.row(y), x)
    }
}

impl MapRead for Argb {
    fn read(map: &Image<'_>, x: usize, y: usize) -> Self {
        map.format().read_wide(map.row(y), x)
    }
}

/// Maps a coordinate into `0..size` under `repeat`; `None` when it falls outside and the
/// image does not repeat.
#[inline]
pub fn repeat_coord(repeat: Repeat, c: i32, size: i32) -> Option<i32> {
    match repeat {
        Repeat::None => (0..size).contains(&c).then_some(c),
        Repeat::Normal => Some(c.rem_euclid(size)),
        Repeat::Pad => Some(c.clamp(0, size - 1)),
        Repeat::Reflect => {
            let c = c.rem_euclid(size * 2);
            Some(if c >= size { size * 2 - c - 1 } else { c })
        }
    }
}

/// Fetches `out.len()` untransformed pixels starting at `(x, y)`, honouring the repeat mode.
pub(crate) fn fetch_untransformed<P: Pixel>(image: &Image<'_>, x: i32, y: i32, out: &mut [P]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let repeat = image.repeat();
    let Some(y) = repeat_coord(repeat, y, h) else {
        out.fill(P::default());
        return;
    };
    for (i, slot) in out.iter_mut().enumerate() {
        let sx = x.wrapping_add(i as i32);
        *slot = match repeat_coord(repeat, sx, w) {
            Some(sx) => P::fetch(image, sx as usize, y as usize),
            None => P::default(),
        };
    }
}

/// Fetches one untransformed row in the requested precision.
pub fn fetch(
    image: &Image<'_>,
    x: i32,
    y: i32,
    width: usize,
    precision: Precision,
) -> PixResult<Scanline> {
    let mut line = Scanline::transparent(precision, width)?;
    match &mut line {
        Scanline::Narrow(buf) => fetch_untransformed(image, x, y, buf),
        Scanline::Wide(buf) => fetch_untransformed(image, x, y, buf),
    }
    Ok(line)
}

fn check_span(image: &Image<'_>, x: i32, y: i32, width: usize) -> PixResult<(usize, usize)> {
    let in_range = x >= 0
        && y >= 0
        && (y as u32) < image.height()
        && (x as u64 + width as u64) <= u64::from(image.width());
    if !in_range {
        return Err(PixError::configuration(format!(
            "row span x={x} y={y} width={width} outside {}x{} image",
            image.width(),
            image.height()
        )));
    }
    Ok((x as usize, y as usize))
}

/// Reads an in-bounds destination span, alpha map included.
pub(crate) fn fetch_dest<P: Pixel>(image: &Image<'_>, x: i32, y: i32, out: &mut [P]) -> PixResult<()> {
    let (x, y) = check_span(image, x, y, out.len())?;
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = P::fetch(image, x + i, y);
    }
    Ok(())
}

/// Writes a narrow span and propagates its alpha into the alpha map.
pub(crate) fn store_narrow(image: &mut Image<'_>, x: i32, y: i32, row: &[u32]) -> PixResult<()> {
    let (x0, y0) = check_span(image, x, y, row.len())?;
    let format = image.format();
    let dst = image.row_mut(y0)?;
    for (i, &p) in row.iter().enumerate() {
        format.write_narrow(dst, x0 + i, p);
    }

    if let Some(map) = image.alpha_map_mut() {
        let origin = map.origin();
        let map_image = map.image_mut();
        let map_format = map_image.format();
        for (i, &p) in row.iter().enumerate() {
            let Some((mx, my)) = map_coords(map_image, x0 + i, y0, origin) else {
                continue;
            };
            let prev = map_format.read_narrow(map_image.row(my), mx);
            let merged = (prev & 0x00ff_ffff) | (p & 0xff00_0000);
            map_format.write_narrow(map_image.row_mut(my)?, mx, merged);
        }
    }
    Ok(())
}

/// Dithers (per the image's dither mode) and writes a wide span, propagating alpha into the
/// alpha map.
pub(crate) fn store_wide(image: &mut Image<'_>, x: i32, y: i32, row: &mut [Argb]) -> PixResult<()> {
    let (x0, y0) = check_span(image, x, y, row.len())?;
    let format = image.format();
    dither_row(image.dither(), image.dither_offset(), format, x, y, row);

    let dst = image.row_mut(y0)?;
    for (i, &p) in row.iter().enumerate() {
        format.write_wide(dst, x0 + i, p);
    }

    if let Some(map) = image.alpha_map_mut() {
        let origin = map.origin();
        let map_image = map.image_mut();
        let map_format = map_image.format();
        for (i, p) in row.iter().enumerate() {
            let Some((mx, my)) = map_coords(map_image, x0 + i, y0, origin) else {
                continue;
            };
            let mut prev = map_format.read_wide(map_image.row(my), mx);
            prev.a = p.a;
            map_format.write_wide(map_image.row_mut(my)?, mx, prev);
        }
    }
    Ok(())
}

fn map_coords(map: &Image<'_>, x: usize, y: usize, origin: (i32, i32)) -> Option<(usize, usize)> {
    let mx = x as i64 - i64::from(origin.0);
    let my = y as i64 - i64::from(origin.1);
    (mx >= 0 && my >= 0 && mx < i64::from(map.width()) && my < i64::from(map.height()))
        .then_some((mx as usize, my as usize))
}

/// Stores a row at `(x, y)`; wide rows are dithered first.
pub fn store(image: &mut Image<'_>, x: i32, y: i32, line: &mut Scanline) -> PixResult<()> {
    match line {
        Scanline::Narrow(buf) => store_narrow(image, x, y, buf),
        Scanline::Wide(buf) => store_wide(image, x, y, buf),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/iter.rs"]
mod tests;
