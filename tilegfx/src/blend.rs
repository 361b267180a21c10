//! Pasting one RGBA image onto another.
//!
//! The integer arithmetic here reproduces the blend used to produce the
//! existing reference sprites, so regenerated assets stay byte-identical.

use image::RgbaImage;

/// `round(v / 255)` for `v` in `0..=255 * 255`, without a division.
#[inline]
pub fn div255(v: u32) -> u8 {
    let tmp = v + 128;
    (((tmp >> 8) + tmp) >> 8) as u8
}

/// `round(a * b / 255)`.
#[inline]
pub fn mul_div255(a: u8, b: u8) -> u8 {
    div255(a as u32 * b as u32)
}

/// Clipped overlap of `src` placed at `(x, y)` on `dst`.
///
/// Returns `(src_x, src_y, dst_x, dst_y, width, height)`, or `None` when the
/// two images do not overlap.
fn overlap(dst: &RgbaImage, src: &RgbaImage, x: i64, y: i64) -> Option<(u32, u32, u32, u32, u32, u32)> {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);

    let left = x.max(0);
    let top = y.max(0);
    let right = (x + sw).min(dw);
    let bottom = (y + sh).min(dh);
    if left >= right || top >= bottom {
        return None;
    }

    Some((
        (left - x) as u32,
        (top - y) as u32,
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

/// Paste `src` at `(x, y)`, using the source's own alpha as the paste mask.
///
/// Every channel, alpha included, becomes
/// `div255(dst * (255 - a) + src * a)` where `a` is the source alpha.
/// Fully transparent source pixels leave the canvas untouched and fully
/// opaque ones replace it. Parts falling outside `dst` are clipped.
pub fn paste_masked(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let Some((sx, sy, dx, dy, w, h)) = overlap(dst, src, x, y) else {
        return;
    };

    for row in 0..h {
        for col in 0..w {
            let s = src.get_pixel(sx + col, sy + row).0;
            let a = s[3] as u32;
            if a == 0 {
                continue;
            }
            let d = dst.get_pixel_mut(dx + col, dy + row);
            if a == 255 {
                d.0 = s;
                continue;
            }
            for c in 0..4 {
                d.0[c] = div255(d.0[c] as u32 * (255 - a) + s[c] as u32 * a);
            }
        }
    }
}

/// Paste `src` at `(x, y)`, replacing destination pixels outright.
///
/// Transparent source pixels overwrite the canvas too.
pub fn paste_opaque(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    image::imageops::replace(dst, src, x, y);
}
