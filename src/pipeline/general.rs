//! The general engine: any operator, format, filter, transform and repeat mode.
//!
//! Rows stay narrow when every image involved is narrow, the destination does not dither and
//! the operator has an 8-bit combiner. Everything else runs in float.

use crate::foundation::error::PixResult;
use crate::foundation::math::Argb;
use crate::image::{Flags, Image};
use crate::pipeline::combine::{self, CombinerEntry};
use crate::pipeline::combine_float::{self, FloatCombiner};
use crate::pipeline::dispatch::CompositeInfo;
use crate::pipeline::iter::{Precision, fetch_dest, store_narrow, store_wide, zeroed};
use crate::pipeline::sampler::{Filterable, sample_into};

/// The precision the general engine will use for `info`.
pub fn precision_for(info: &CompositeInfo<'_>) -> Precision {
    let narrow = info.src_flags.contains(Flags::NARROW_FORMAT)
        && (info.mask.is_none() || info.mask_flags.contains(Flags::NARROW_FORMAT))
        && info.dest_flags.contains(Flags::NARROW_FORMAT | Flags::NO_DITHER)
        && combine::lookup(info.op).is_some();
    if narrow {
        Precision::Narrow
    } else {
        Precision::Wide
    }
}

pub(crate) fn composite_general(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    let component_alpha = info.mask.is_some_and(|m| m.component_alpha());
    match (precision_for(info), combine::lookup(info.op)) {
        (Precision::Narrow, Some(entry)) => {
            run_rows::<u32>(info, dest, NarrowRow { entry, component_alpha })
        }
        _ => {
            let combiner = combine_float::lookup_float(info.op);
            run_rows::<Argb>(info, dest, WideRow { combiner, component_alpha })
        }
    }
}

/// Combine and store for one row representation.
trait RowOps<P> {
    fn combine(&self, dest: &mut [P], src: &[P], mask: Option<&[P]>);
    fn store(&self, image: &mut Image<'_>, x: i32, y: i32, row: &mut [P]) -> PixResult<()>;
}

struct NarrowRow {
    entry: &'static CombinerEntry,
    component_alpha: bool,
}

impl RowOps<u32> for NarrowRow {
    fn combine(&self, dest: &mut [u32], src: &[u32], mask: Option<&[u32]>) {
        combine::combine_row(self.entry, self.component_alpha, dest, src, mask);
    }

    fn store(&self, image: &mut Image<'_>, x: i32, y: i32, row: &mut [u32]) -> PixResult<()> {
        store_narrow(image, x, y, row)
    }
}

struct WideRow {
    combiner: FloatCombiner,
    component_alpha: bool,
}

impl RowOps<Argb> for WideRow {
    fn combine(&self, dest: &mut [Argb], src: &[Argb], mask: Option<&[Argb]>) {
        combine_float::combine_row_float(&self.combiner, self.component_alpha, dest, src, mask);
    }

    fn store(&self, image: &mut Image<'_>, x: i32, y: i32, row: &mut [Argb]) -> PixResult<()> {
        store_wide(image, x, y, row)
    }
}

fn run_rows<P: Filterable>(
    info: &CompositeInfo<'_>,
    dest: &mut Image<'_>,
    ops: impl RowOps<P>,
) -> PixResult<()> {
    let width = info.width as usize;
    // All scratch is reserved before the first store.
    let mut src_row: Vec<P> = zeroed(width)?;
    let mut mask_row: Option<Vec<P>> = match info.mask {
        Some(_) => Some(zeroed(width)?),
        None => None,
    };
    let mut dest_row: Vec<P> = zeroed(width)?;

    for row in 0..info.height {
        sample_into(info.src, info.src_x, info.src_y + row, &mut src_row);
        if let (Some(mask), Some(buf)) = (info.mask, mask_row.as_mut()) {
            sample_into(mask, info.mask_x, info.mask_y + row, buf);
        }
        let dy = info.dest_y + row;
        fetch_dest(dest, info.dest_x, dy, &mut dest_row)?;
        ops.combine(&mut dest_row, &src_row, mask_row.as_deref());
        ops.store(dest, info.dest_x, dy, &mut dest_row)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/general.rs"]
mod tests;
