use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Precomputed mapping from window pixels to framebuffer neighbors + weights.
///
/// Built once per (window size, framebuffer size) pair and reused every frame.
#[derive(Default)]
pub struct ScaleLut {
    dst: (usize, usize),
    src: (usize, usize),
    x0: Vec<usize>,
    x1: Vec<usize>,
    wx: Vec<u16>,
    y0: Vec<usize>,
    y1: Vec<usize>,
    wy: Vec<u16>,
}

// source index pair and 8.8 fixed-point weight for every destination index
fn axis_taps(dst_len: usize, src_len: usize) -> (Vec<usize>, Vec<usize>, Vec<u16>) {
    let scale = src_len as f32 / dst_len.max(1) as f32;
    let last = src_len.saturating_sub(1);
    (0..dst_len)
        .map(|d| {
            let f = d as f32 * scale;
            let i0 = (f.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            let w = ((f - i0 as f32).clamp(0.0, 1.0) * 256.0).round() as u16;
            (i0, i1, w)
        })
        .fold(
            (Vec::with_capacity(dst_len), Vec::with_capacity(dst_len), Vec::with_capacity(dst_len)),
            |(mut a, mut b, mut w), (i0, i1, wi)| {
                a.push(i0);
                b.push(i1);
                w.push(wi);
                (a, b, w)
            },
        )
}

impl ScaleLut {
    pub fn new(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> Self {
        let (x0, x1, wx) = axis_taps(dst_w, src_w);
        let (y0, y1, wy) = axis_taps(dst_h, src_h);
        Self {
            dst: (dst_w, dst_h),
            src: (src_w, src_h),
            x0,
            x1,
            wx,
            y0,
            y1,
            wy,
        }
    }

    #[inline]
    pub fn fits(&self, dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> bool {
        self.dst == (dst_w, dst_h) && self.src == (src_w, src_h)
    }

    /// Parallel bilinear stretch of `src` into `dst`.
    /// Rows are processed in parallel for cache friendly writes
    pub fn blit(&self, dst: &mut [u32], src: &[u32]) {
        let (dw, _) = self.dst;
        let (sw, _) = self.src;
        if dw == 0 || sw == 0 {
            return;
        }

        dst.par_chunks_mut(dw).enumerate().for_each(|(y, dst_row)| {
            let wy = self.wy[y] as u32;
            let row0 = self.y0[y] * sw;
            let row1 = self.y1[y] * sw;

            for (x, px) in dst_row.iter_mut().enumerate() {
                let (x0, x1) = (self.x0[x], self.x1[x]);
                let wx = self.wx[x] as u32;

                let top = lerp_color_u32(src[row0 + x0], src[row0 + x1], wx);
                let bot = lerp_color_u32(src[row1 + x0], src[row1 + x1], wx);
                *px = lerp_color_u32(top, bot, wy);
            }
        });
    }
}

/// Blend two 0x00RRGGBB colors; `w256` in [0, 256] is the weight of `b`.
#[inline]
pub(crate) fn lerp_color_u32(a: u32, b: u32, w256: u32) -> u32 {
    let inv = 256 - w256;
    // Interpolate R and B together (00RR00BB), with mask 0x00FF00FF,
    let rb = ((a & 0x00FF00FF) * inv + (b & 0x00FF00FF) * w256) >> 8 & 0x00FF00FF;
    // Interpolate G separately (0000GG00), with mask 0x0000FF00
    let g = ((a & 0x0000FF00) * inv + (b & 0x0000FF00) * w256) >> 8 & 0x0000FF00;
    rb | g // alpha stays 0
}
