//! Capability flags derived from an image's description.
//!
//! Flags are recomputed by every [`Image`](super::Image) mutator and matched by fast-path
//! entries; a stale flag set would let the dispatcher pick a kernel that ignores a property.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use super::{FilterKind, Image, Repeat};
use crate::foundation::fixed::{FIXED_ONE, fixed_frac, fixed_to_int, int_to_fixed};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(u32);

macro_rules! flag_consts {
    ($($name:ident = $bit:expr),* $(,)?) => {
        impl Flags {
            $(pub const $name: Self = Self(1 << $bit);)*

            const NAMES: &'static [(&'static str, Flags)] = &[$((stringify!($name), Self::$name)),*];
        }
    };
}

flag_consts! {
    ID_TRANSFORM = 0,
    NO_ALPHA_MAP = 1,
    NO_CONVOLUTION_FILTER = 2,
    NO_PAD_REPEAT = 3,
    NO_REFLECT_REPEAT = 4,
    NO_DITHER = 5,
    NARROW_FORMAT = 6,
    SAMPLES_OPAQUE = 7,
    COMPONENT_ALPHA = 8,
    UNIFIED_ALPHA = 9,
    SCALE_TRANSFORM = 10,
    NEAREST_FILTER = 11,
    HAS_TRANSFORM = 12,
    IS_OPAQUE = 13,
    NO_NORMAL_REPEAT = 14,
    NO_NONE_REPEAT = 15,
    X_UNIT_POSITIVE = 16,
    AFFINE_TRANSFORM = 17,
    Y_UNIT_ZERO = 18,
    BILINEAR_FILTER = 19,
    ROTATE_90_TRANSFORM = 20,
    ROTATE_180_TRANSFORM = 21,
    ROTATE_270_TRANSFORM = 22,
    SAMPLES_COVER_CLIP_NEAREST = 23,
    SAMPLES_COVER_CLIP_BILINEAR = 24,
    BITS_IMAGE = 25,
    SEPARABLE_CONVOLUTION_FILTER = 26,
    SOLID = 27,
}

impl Flags {
    pub const EMPTY: Self = Self(0);

    pub const PAD_REPEAT: Self = Self::NO_NONE_REPEAT
        .union(Self::NO_NORMAL_REPEAT)
        .union(Self::NO_REFLECT_REPEAT);
    pub const NORMAL_REPEAT: Self = Self::NO_NONE_REPEAT
        .union(Self::NO_PAD_REPEAT)
        .union(Self::NO_REFLECT_REPEAT);
    pub const NONE_REPEAT: Self = Self::NO_NORMAL_REPEAT
        .union(Self::NO_PAD_REPEAT)
        .union(Self::NO_REFLECT_REPEAT);
    pub const REFLECT_REPEAT: Self = Self::NO_NONE_REPEAT
        .union(Self::NO_NORMAL_REPEAT)
        .union(Self::NO_PAD_REPEAT);

    /// What every narrow source/mask fast path needs.
    pub const STANDARD: Self = Self::NO_CONVOLUTION_FILTER
        .union(Self::NO_ALPHA_MAP)
        .union(Self::NARROW_FORMAT);
    /// What every narrow destination fast path needs.
    pub const STD_DEST: Self = Self::NO_ALPHA_MAP
        .union(Self::NARROW_FORMAT)
        .union(Self::NO_DITHER);

    pub const NEAREST_OPAQUE: Self = Self::SAMPLES_OPAQUE
        .union(Self::NEAREST_FILTER)
        .union(Self::SAMPLES_COVER_CLIP_NEAREST);
    pub const BILINEAR_OPAQUE: Self = Self::SAMPLES_OPAQUE
        .union(Self::BILINEAR_FILTER)
        .union(Self::SAMPLES_COVER_CLIP_BILINEAR);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl BitAnd for Flags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Flags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (name, flag) in Self::NAMES {
            if self.contains(*flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Derives the capability flags of `image` from its current description.
pub(crate) fn compute(image: &Image<'_>) -> Flags {
    let mut flags = Flags::EMPTY;

    match image.transform() {
        None => {
            flags |= Flags::ID_TRANSFORM
                | Flags::X_UNIT_POSITIVE
                | Flags::Y_UNIT_ZERO
                | Flags::AFFINE_TRANSFORM;
        }
        Some(t) => {
            let m = &t.matrix;
            flags |= Flags::HAS_TRANSFORM;
            if t.is_affine() {
                flags |= Flags::AFFINE_TRANSFORM;
                if m[0][1] == 0 && m[1][0] == 0 {
                    if m[0][0] == -FIXED_ONE && m[1][1] == -FIXED_ONE {
                        flags |= Flags::ROTATE_180_TRANSFORM;
                    }
                    flags |= Flags::SCALE_TRANSFORM;
                } else if m[0][0] == 0 && m[1][1] == 0 {
                    if m[0][1] == -FIXED_ONE && m[1][0] == FIXED_ONE {
                        flags |= Flags::ROTATE_90_TRANSFORM;
                    } else if m[0][1] == FIXED_ONE && m[1][0] == -FIXED_ONE {
                        flags |= Flags::ROTATE_270_TRANSFORM;
                    }
                }
            }
            if m[0][0] > 0 {
                flags |= Flags::X_UNIT_POSITIVE;
            }
            if m[1][0] == 0 {
                flags |= Flags::Y_UNIT_ZERO;
            }
        }
    }

    match image.filter() {
        FilterKind::Nearest => flags |= Flags::NEAREST_FILTER | Flags::NO_CONVOLUTION_FILTER,
        FilterKind::Bilinear => {
            flags |= Flags::BILINEAR_FILTER | Flags::NO_CONVOLUTION_FILTER;
            if bilinear_is_nearest(image, flags) {
                flags |= Flags::NEAREST_FILTER;
            }
        }
        FilterKind::Convolution => {}
        FilterKind::SeparableConvolution => flags |= Flags::SEPARABLE_CONVOLUTION_FILTER,
    }

    flags |= match image.repeat() {
        Repeat::None => Flags::NONE_REPEAT,
        Repeat::Normal => Flags::NORMAL_REPEAT,
        Repeat::Pad => Flags::PAD_REPEAT,
        Repeat::Reflect => Flags::REFLECT_REPEAT,
    };

    flags |= if image.component_alpha() {
        Flags::COMPONENT_ALPHA
    } else {
        Flags::UNIFIED_ALPHA
    };

    flags |= Flags::NARROW_FORMAT;

    if image.width() == 1 && image.height() == 1 && image.repeat() != Repeat::None {
        flags |= Flags::SOLID;
    } else {
        flags |= Flags::BITS_IMAGE;
    }

    // projective samples can land behind the eye and read as transparent
    if !image.format().has_alpha() && flags.contains(Flags::AFFINE_TRANSFORM) {
        flags |= Flags::SAMPLES_OPAQUE;
        if image.repeat() != Repeat::None {
            flags |= Flags::IS_OPAQUE;
        }
    }

    if image.format().is_wide() {
        flags.remove(Flags::NARROW_FORMAT);
    }

    match image.alpha_map() {
        None => flags |= Flags::NO_ALPHA_MAP,
        Some(map) => {
            if map.image().format().is_wide() {
                flags.remove(Flags::NARROW_FORMAT);
            }
        }
    }

    if image.alpha_map().is_some()
        || matches!(
            image.filter(),
            FilterKind::Convolution | FilterKind::SeparableConvolution
        )
        || image.component_alpha()
    {
        flags.remove(Flags::IS_OPAQUE | Flags::SAMPLES_OPAQUE);
    }

    if image.dither().is_none() {
        flags |= Flags::NO_DITHER;
    }

    flags
}

/// Bilinear sampling degenerates to nearest for identity transforms and for integer
/// translations combined with quarter-turn rotations or flips.
fn bilinear_is_nearest(image: &Image<'_>, flags: Flags) -> bool {
    if flags.contains(Flags::ID_TRANSFORM) {
        return true;
    }
    if !flags.contains(Flags::AFFINE_TRANSFORM) {
        return false;
    }
    let Some(t) = image.transform() else {
        return true;
    };
    let m = &t.matrix;
    let all_integer = fixed_frac(m[0][0] | m[0][1] | m[0][2] | m[1][0] | m[1][1] | m[1][2]) == 0;
    let odd = fixed_to_int((m[0][0] + m[0][1]) & (m[1][0] + m[1][1])) & 1 == 1;
    let limit = int_to_fixed(30000);
    all_integer
        && odd
        && (-limit..=limit).contains(&m[0][2])
        && (-limit..=limit).contains(&m[1][2])
}

#[cfg(test)]
#[path = "../../tests/unit/image/flags.rs"]
mod tests;
