//! Drawing a raw buffer through an affine transform.

use crate::decode::DecodedImage;
use crate::geometry::{Affine, Point};

/// Fill `dst` with `src` mapped through `transform` (source to destination).
///
/// Every destination pixel center is mapped back into the source and takes
/// the source pixel it lands in. Destination pixels that map outside the
/// source are left untouched.
pub fn draw_transformed(src: &DecodedImage, dst: &mut DecodedImage, transform: &Affine) {
    let Some(inverse) = transform.invert() else {
        return;
    };
    let (sw, sh) = (src.width as f64, src.height as f64);
    let src_stride = src.width as usize * 3;
    let dst_stride = dst.width as usize * 3;

    for y in 0..dst.height {
        let row = y as usize * dst_stride;
        for x in 0..dst.width {
            let p = inverse.map_point(Point::new(x as f64 + 0.5, y as f64 + 0.5));
            let (sx, sy) = (p.x.floor(), p.y.floor());
            if sx < 0.0 || sy < 0.0 || sx >= sw || sy >= sh {
                continue;
            }
            let s = sy as usize * src_stride + sx as usize * 3;
            let d = row + x as usize * 3;
            dst.pixels[d..d + 3].copy_from_slice(&src.pixels[s..s + 3]);
        }
    }
}
