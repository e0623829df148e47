//! Per-pixel reads and writes for every [`PixelFormat`] layout.

use super::{ChannelOrder, PixelFormat};
use crate::foundation::math::{
    Argb, alpha, blue, float_to_unorm, green, pack_argb, red, unorm_to_float, unorm_to_unorm,
};

fn read_f32(row: &[u8], o: usize) -> f32 {
    f32::from_le_bytes([row[o], row[o + 1], row[o + 2], row[o + 3]])
}

fn write_f32(row: &mut [u8], o: usize, v: f32) {
    row[o..o + 4].copy_from_slice(&v.to_le_bytes());
}

impl PixelFormat {
    /// Raw little-endian pixel value at column `x` of a row. Packed formats only.
    pub(crate) fn read_raw(&self, row: &[u8], x: usize) -> u32 {
        match self.bpp {
            32 => {
                let o = x * 4;
                u32::from_le_bytes([row[o], row[o + 1], row[o + 2], row[o + 3]])
            }
            24 => {
                let o = x * 3;
                u32::from(row[o]) | (u32::from(row[o + 1]) << 8) | (u32::from(row[o + 2]) << 16)
            }
            16 => {
                let o = x * 2;
                u32::from(u16::from_le_bytes([row[o], row[o + 1]]))
            }
            8 => u32::from(row[x]),
            4 => {
                let byte = row[x >> 1];
                if x & 1 == 1 {
                    u32::from(byte >> 4)
                } else {
                    u32::from(byte & 0x0f)
                }
            }
            1 => u32::from((row[x >> 3] >> (x & 7)) & 1),
            _ => 0,
        }
    }

    pub(crate) fn write_raw(&self, row: &mut [u8], x: usize, v: u32) {
        match self.bpp {
            32 => {
                let o = x * 4;
                row[o..o + 4].copy_from_slice(&v.to_le_bytes());
            }
            24 => {
                let o = x * 3;
                row[o] = v as u8;
                row[o + 1] = (v >> 8) as u8;
                row[o + 2] = (v >> 16) as u8;
            }
            16 => {
                let o = x * 2;
                row[o..o + 2].copy_from_slice(&(v as u16).to_le_bytes());
            }
            8 => row[x] = v as u8,
            4 => {
                let byte = &mut row[x >> 1];
                let v = (v & 0x0f) as u8;
                *byte = if x & 1 == 1 {
                    (*byte & 0x0f) | (v << 4)
                } else {
                    (*byte & 0xf0) | v
                };
            }
            1 => {
                let bit = 1u8 << (x & 7);
                if v & 1 == 1 {
                    row[x >> 3] |= bit;
                } else {
                    row[x >> 3] &= !bit;
                }
            }
            _ => {}
        }
    }

    /// Raw pixel value to packed `a8r8g8b8`. Missing alpha reads as opaque.
    pub(crate) fn unpack(&self, raw: u32) -> u32 {
        let s = self.shifts();
        let a = if self.a == 0 {
            0xff
        } else {
            unorm_to_unorm(raw >> s.a, self.alpha_bits(), 8)
        };
        let r = unorm_to_unorm(raw >> s.r, self.red_bits(), 8);
        let g = unorm_to_unorm(raw >> s.g, self.green_bits(), 8);
        let b = unorm_to_unorm(raw >> s.b, self.blue_bits(), 8);
        pack_argb(a, r, g, b)
    }

    /// Packed `a8r8g8b8` to a raw pixel value, truncating to the channel widths.
    pub(crate) fn pack(&self, argb: u32) -> u32 {
        let s = self.shifts();
        let mut raw = 0;
        if self.a > 0 {
            raw |= unorm_to_unorm(alpha(argb), 8, self.alpha_bits()) << s.a;
        }
        if self.r > 0 {
            raw |= unorm_to_unorm(red(argb), 8, self.red_bits()) << s.r;
        }
        if self.g > 0 {
            raw |= unorm_to_unorm(green(argb), 8, self.green_bits()) << s.g;
        }
        if self.b > 0 {
            raw |= unorm_to_unorm(blue(argb), 8, self.blue_bits()) << s.b;
        }
        raw
    }

    pub(crate) fn read_narrow(&self, row: &[u8], x: usize) -> u32 {
        match self.order {
            ChannelOrder::Float => self.read_wide(row, x).contract(),
            _ => self.unpack(self.read_raw(row, x)),
        }
    }

    pub(crate) fn read_wide(&self, row: &[u8], x: usize) -> Argb {
        match self.order {
            ChannelOrder::Float => {
                let o = x * (self.bpp as usize / 8);
                let a = if self.a > 0 { read_f32(row, o + 12) } else { 1.0 };
                Argb::new(a, read_f32(row, o), read_f32(row, o + 4), read_f32(row, o + 8))
            }
            _ if self.is_wide() => {
                let raw = self.read_raw(row, x);
                let s = self.shifts();
                let channel = |shift: u32, bits: u32| {
                    let max = (1u32 << bits) - 1;
                    unorm_to_float((raw >> shift) & max, bits)
                };
                let a = if self.a == 0 {
                    1.0
                } else {
                    channel(s.a, self.alpha_bits())
                };
                Argb::new(
                    a,
                    channel(s.r, self.red_bits()),
                    channel(s.g, self.green_bits()),
                    channel(s.b, self.blue_bits()),
                )
            }
            _ => Argb::expand(self.read_narrow(row, x)),
        }
    }

    pub(crate) fn write_narrow(&self, row: &mut [u8], x: usize, argb: u32) {
        match self.order {
            ChannelOrder::Float => self.write_wide(row, x, Argb::expand(argb)),
            _ => self.write_raw(row, x, self.pack(argb)),
        }
    }

    pub(crate) fn write_wide(&self, row: &mut [u8], x: usize, p: Argb) {
        match self.order {
            ChannelOrder::Float => {
                let o = x * (self.bpp as usize / 8);
                write_f32(row, o, p.r);
                write_f32(row, o + 4, p.g);
                write_f32(row, o + 8, p.b);
                if self.a > 0 {
                    write_f32(row, o + 12, p.a);
                }
            }
            _ if self.is_wide() => {
                let s = self.shifts();
                let mut raw = 0;
                if self.a > 0 {
                    raw |= float_to_unorm(p.a, self.alpha_bits()) << s.a;
                }
                raw |= float_to_unorm(p.r, self.red_bits()) << s.r;
                raw |= float_to_unorm(p.g, self.green_bits()) << s.g;
                raw |= float_to_unorm(p.b, self.blue_bits()) << s.b;
                self.write_raw(row, x, raw);
            }
            _ => self.write_narrow(row, x, p.contract()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/format/access.rs"]
mod tests;
