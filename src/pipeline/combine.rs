//! Narrow (8-bit) scanline combiners.
//!
//! Every operator works on premultiplied `a8r8g8b8` words. Unified variants scale the source
//! by the mask's alpha; component-alpha variants use every mask channel separately. Blend
//! modes are rewritten on premultiplied inputs so no division is needed.

use crate::foundation::math::{
    MASK, add_un8, alpha, blue, div_one_un8, divide_channel, green, mul_un8, pack_argb, red,
    un8x4_add_un8x4, un8x4_mul_un8, un8x4_mul_un8_add_un8x4, un8x4_mul_un8_add_un8x4_mul_un8,
    un8x4_mul_un8x4, un8x4_mul_un8x4_add_un8x4, un8x4_mul_un8x4_add_un8x4_mul_un8,
};
use crate::operator::Operator;

/// `dest[i] = op(src[i] * alpha(mask[i]), dest[i])`.
pub type UnifiedFn = fn(dest: &mut [u32], src: &[u32], mask: Option<&[u32]>);

/// Like [`UnifiedFn`] with a per-channel mask.
pub type ComponentFn = fn(dest: &mut [u32], src: &[u32], mask: &[u32]);

#[derive(Clone, Copy)]
pub struct CombinerEntry {
    pub op: Operator,
    pub unified: UnifiedFn,
    pub component_alpha: Option<ComponentFn>,
}

impl std::fmt::Debug for CombinerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinerEntry")
            .field("op", &self.op)
            .field("component_alpha", &self.component_alpha.is_some())
            .finish()
    }
}

#[inline]
fn inv_alpha(x: u32) -> u32 {
    MASK - alpha(x)
}

/// Source scaled by the unified mask alpha.
#[inline]
fn combine_mask(src: &[u32], mask: Option<&[u32]>, i: usize) -> u32 {
    match mask {
        None => src[i],
        Some(mask) => match alpha(mask[i]) {
            0 => 0,
            m => un8x4_mul_un8(src[i], m),
        },
    }
}

/// Source times mask, and mask times source alpha.
#[inline]
fn mask_ca(s: u32, m: u32) -> (u32, u32) {
    (un8x4_mul_un8x4(s, m), un8x4_mul_un8(m, alpha(s)))
}

#[inline]
fn mask_value_ca(s: u32, m: u32) -> u32 {
    un8x4_mul_un8x4(s, m)
}

#[inline]
fn mask_alpha_ca(s: u32, m: u32) -> u32 {
    un8x4_mul_un8(m, alpha(s))
}

macro_rules! unified {
    ($name:ident, |$s:ident, $d:ident| $body:expr) => {
        fn $name(dest: &mut [u32], src: &[u32], mask: Option<&[u32]>) {
            for (i, slot) in dest.iter_mut().enumerate() {
                let $s = combine_mask(src, mask, i);
                let $d = *slot;
                *slot = $body;
            }
        }
    };
}

macro_rules! component {
    ($name:ident, |$s:ident, $m:ident, $d:ident| $body:expr) => {
        fn $name(dest: &mut [u32], src: &[u32], mask: &[u32]) {
            for ((slot, &$s), &$m) in dest.iter_mut().zip(src).zip(mask) {
                let $d = *slot;
                *slot = $body;
            }
        }
    };
}

fn combine_clear(dest: &mut [u32], _src: &[u32], _mask: Option<&[u32]>) {
    dest.fill(0);
}

fn combine_clear_ca(dest: &mut [u32], _src: &[u32], _mask: &[u32]) {
    dest.fill(0);
}

fn combine_dst(_dest: &mut [u32], _src: &[u32], _mask: Option<&[u32]>) {}

unified!(combine_src_u, |s, _d| s);
unified!(combine_over_u, |s, d| un8x4_mul_un8_add_un8x4(d, inv_alpha(s), s));
unified!(combine_over_reverse_u, |s, d| un8x4_mul_un8_add_un8x4(s, inv_alpha(d), d));
unified!(combine_in_u, |s, d| un8x4_mul_un8(s, alpha(d)));
unified!(combine_in_reverse_u, |s, d| un8x4_mul_un8(d, alpha(s)));
unified!(combine_out_u, |s, d| un8x4_mul_un8(s, inv_alpha(d)));
unified!(combine_out_reverse_u, |s, d| un8x4_mul_un8(d, inv_alpha(s)));
unified!(combine_atop_u, |s, d| un8x4_mul_un8_add_un8x4_mul_un8(
    s,
    alpha(d),
    d,
    inv_alpha(s)
));
unified!(combine_atop_reverse_u, |s, d| un8x4_mul_un8_add_un8x4_mul_un8(
    s,
    inv_alpha(d),
    d,
    alpha(s)
));
unified!(combine_xor_u, |s, d| un8x4_mul_un8_add_un8x4_mul_un8(
    s,
    inv_alpha(d),
    d,
    inv_alpha(s)
));
unified!(combine_add_u, |s, d| un8x4_add_un8x4(d, s));
unified!(combine_saturate_u, |s, d| saturate_px(s, d));
unified!(combine_multiply_u, |s, d| multiply_px(s, d));

component!(combine_src_ca, |s, m, _d| mask_value_ca(s, m));
component!(combine_over_ca, |s, m, d| {
    let (s, m) = mask_ca(s, m);
    un8x4_mul_un8x4_add_un8x4(d, !m, s)
});
component!(combine_over_reverse_ca, |s, m, d| {
    un8x4_mul_un8_add_un8x4(un8x4_mul_un8x4(s, m), inv_alpha(d), d)
});
component!(combine_in_ca, |s, m, d| un8x4_mul_un8(
    mask_value_ca(s, m),
    alpha(d)
));
component!(combine_in_reverse_ca, |s, m, d| un8x4_mul_un8x4(
    d,
    mask_alpha_ca(s, m)
));
component!(combine_out_ca, |s, m, d| un8x4_mul_un8(
    mask_value_ca(s, m),
    inv_alpha(d)
));
component!(combine_out_reverse_ca, |s, m, d| un8x4_mul_un8x4(
    d,
    !mask_alpha_ca(s, m)
));
component!(combine_atop_ca, |s, m, d| {
    let (s, m) = mask_ca(s, m);
    un8x4_mul_un8x4_add_un8x4_mul_un8(d, !m, s, alpha(d))
});
component!(combine_atop_reverse_ca, |s, m, d| {
    let (s, m) = mask_ca(s, m);
    un8x4_mul_un8x4_add_un8x4_mul_un8(d, m, s, inv_alpha(d))
});
component!(combine_xor_ca, |s, m, d| {
    let (s, m) = mask_ca(s, m);
    un8x4_mul_un8x4_add_un8x4_mul_un8(d, !m, s, inv_alpha(d))
});
component!(combine_add_ca, |s, m, d| un8x4_add_un8x4(d, mask_value_ca(s, m)));
component!(combine_saturate_ca, |s, m, d| saturate_ca_px(s, m, d));
component!(combine_multiply_ca, |s, m, d| {
    let (s, m) = mask_ca(s, m);
    let r = un8x4_mul_un8x4_add_un8x4_mul_un8(d, !m, s, inv_alpha(d));
    un8x4_add_un8x4(r, un8x4_mul_un8x4(d, s))
});

/// Adds as much of the source as fits under the destination's remaining coverage.
fn saturate_px(s: u32, d: u32) -> u32 {
    let sa = alpha(s);
    let room = inv_alpha(d);
    let s = if sa > room {
        un8x4_mul_un8(s, u32::from(divide_channel(room as u8, sa as u8)))
    } else {
        s
    };
    un8x4_add_un8x4(d, s)
}

fn saturate_ca_px(s: u32, m: u32, d: u32) -> u32 {
    let (s, m) = mask_ca(s, m);
    let room = inv_alpha(d);
    let mut out = 0;
    for shift in [0u32, 8, 16, 24] {
        let sc = (s >> shift) & MASK;
        let mc = (m >> shift) & MASK;
        let dc = (d >> shift) & MASK;
        let v = if mc <= room {
            add_un8(sc, dc)
        } else {
            add_un8(mul_un8(sc, u32::from(divide_channel(room as u8, mc as u8))), dc)
        };
        out |= v << shift;
    }
    out
}

/// `s * (1 - da) + d * (1 - sa) + s * d`
fn multiply_px(s: u32, d: u32) -> u32 {
    let ss = un8x4_mul_un8_add_un8x4_mul_un8(s, inv_alpha(d), d, inv_alpha(s));
    un8x4_add_un8x4(un8x4_mul_un8x4(d, s), ss)
}

type BlendFn = fn(d: i32, ad: i32, s: i32, as_: i32) -> i32;

fn blend_screen(d: i32, ad: i32, s: i32, as_: i32) -> i32 {
    s * ad + d * as_ - s * d
}

fn blend_overlay(d: i32, ad: i32, s: i32, as_: i32) -> i32 {
    if 2 * d < ad {
        2 * s * d
    } else {
        as_ * ad - 2 * (ad - d) * (as_ - s)
    }
}

fn blend_darken(d: i32, ad: i32, s: i32, as_: i32) -> i32 {
    (ad * s).min(as_ * d)
}

fn blend_lighten(d: i32, ad: i32, s: i32, as_: i32) -> i32 {
    (ad * s).max(as_ * d)
}

fn blend_hard_light(d: i32, ad: i32, s: i32, as_: i32) -> i32 {
    if 2 * s < as_ {
        2 * s * d
    } else {
        as_ * ad - 2 * (ad - d) * (as_ - s)
    }
}

fn blend_difference(d: i32, ad: i32, s: i32, as_: i32) -> i32 {
    (d * as_ - s * ad).abs()
}

fn blend_exclusion(d: i32, ad: i32, s: i32, as_: i32) -> i32 {
    s * ad + d * as_ - 2 * d * s
}

#[inline]
fn finish_channel(v: i32) -> u32 {
    div_one_un8(v.clamp(0, 255 * 255) as u32)
}

/// `(1 - sa) d + (1 - da) s + blend(d, da, s, sa)`, alpha `sa + da - sa da`.
fn separable(s: u32, d: u32, blend: BlendFn) -> u32 {
    let sa = alpha(s) as i32;
    let da = alpha(d) as i32;
    let (isa, ida) = (255 - sa, 255 - da);
    let channel = |get: fn(u32) -> u32| {
        let (dc, sc) = (get(d) as i32, get(s) as i32);
        finish_channel(isa * dc + ida * sc + blend(dc, da, sc, sa))
    };
    pack_argb(
        finish_channel(da * 255 + sa * 255 - sa * da),
        channel(red),
        channel(green),
        channel(blue),
    )
}

fn separable_ca(s: u32, m: u32, d: u32, blend: BlendFn) -> u32 {
    let (s, m) = mask_ca(s, m);
    let sa = alpha(s) as i32;
    let da = alpha(d) as i32;
    let ida = 255 - da;
    let channel = |get: fn(u32) -> u32| {
        let (dc, sc, mc) = (get(d) as i32, get(s) as i32, get(m) as i32);
        finish_channel((255 - mc) * dc + ida * sc + blend(dc, da, sc, mc))
    };
    pack_argb(
        finish_channel(da * 255 + sa * 255 - sa * da),
        channel(red),
        channel(green),
        channel(blue),
    )
}

macro_rules! separable_mode {
    ($u:ident, $ca:ident, $blend:ident) => {
        unified!($u, |s, d| separable(s, d, $blend));
        component!($ca, |s, m, d| separable_ca(s, m, d, $blend));
    };
}

separable_mode!(combine_screen_u, combine_screen_ca, blend_screen);
separable_mode!(combine_overlay_u, combine_overlay_ca, blend_overlay);
separable_mode!(combine_darken_u, combine_darken_ca, blend_darken);
separable_mode!(combine_lighten_u, combine_lighten_ca, blend_lighten);
separable_mode!(combine_hard_light_u, combine_hard_light_ca, blend_hard_light);
separable_mode!(combine_difference_u, combine_difference_ca, blend_difference);
separable_mode!(combine_exclusion_u, combine_exclusion_ca, blend_exclusion);

const fn entry(op: Operator, unified: UnifiedFn, ca: Option<ComponentFn>) -> CombinerEntry {
    CombinerEntry {
        op,
        unified,
        component_alpha: ca,
    }
}

static NARROW_COMBINERS: &[CombinerEntry] = &[
    entry(Operator::Clear, combine_clear, Some(combine_clear_ca)),
    entry(Operator::Src, combine_src_u, Some(combine_src_ca)),
    entry(Operator::Dst, combine_dst, None),
    entry(Operator::Over, combine_over_u, Some(combine_over_ca)),
    entry(
        Operator::OverReverse,
        combine_over_reverse_u,
        Some(combine_over_reverse_ca),
    ),
    entry(Operator::In, combine_in_u, Some(combine_in_ca)),
    entry(
        Operator::InReverse,
        combine_in_reverse_u,
        Some(combine_in_reverse_ca),
    ),
    entry(Operator::Out, combine_out_u, Some(combine_out_ca)),
    entry(
        Operator::OutReverse,
        combine_out_reverse_u,
        Some(combine_out_reverse_ca),
    ),
    entry(Operator::Atop, combine_atop_u, Some(combine_atop_ca)),
    entry(
        Operator::AtopReverse,
        combine_atop_reverse_u,
        Some(combine_atop_reverse_ca),
    ),
    entry(Operator::Xor, combine_xor_u, Some(combine_xor_ca)),
    entry(Operator::Add, combine_add_u, Some(combine_add_ca)),
    entry(
        Operator::Saturate,
        combine_saturate_u,
        Some(combine_saturate_ca),
    ),
    entry(
        Operator::Multiply,
        combine_multiply_u,
        Some(combine_multiply_ca),
    ),
    entry(Operator::Screen, combine_screen_u, Some(combine_screen_ca)),
    entry(Operator::Overlay, combine_overlay_u, Some(combine_overlay_ca)),
    entry(Operator::Darken, combine_darken_u, Some(combine_darken_ca)),
    entry(Operator::Lighten, combine_lighten_u, Some(combine_lighten_ca)),
    entry(
        Operator::HardLight,
        combine_hard_light_u,
        Some(combine_hard_light_ca),
    ),
    entry(
        Operator::Difference,
        combine_difference_u,
        Some(combine_difference_ca),
    ),
    entry(
        Operator::Exclusion,
        combine_exclusion_u,
        Some(combine_exclusion_ca),
    ),
];

/// The narrow combiner for `op`; `None` when the operator only exists in float form.
pub fn lookup(op: Operator) -> Option<&'static CombinerEntry> {
    NARROW_COMBINERS.iter().find(|e| e.op == op)
}

/// Combines one narrow row in place. Operators without a component-alpha variant fall back
/// to the mask's alpha channel.
pub fn combine_row(
    entry: &CombinerEntry,
    component_alpha: bool,
    dest: &mut [u32],
    src: &[u32],
    mask: Option<&[u32]>,
) {
    match (component_alpha, mask, entry.component_alpha) {
        (true, Some(mask), Some(ca)) => ca(dest, src, mask),
        _ => (entry.unified)(dest, src, mask),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/combine.rs"]
mod tests;
