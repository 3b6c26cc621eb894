use crate::config::pack_rgb;
use crate::map::WallKind;

pub const TEXTURE_SIZE: usize = 64;

/// Square wall image, row-major 0x00RRGGBB.
pub struct Texture {
    size: usize,
    pixels: Vec<u32>,
}

impl Texture {
    pub fn from_fn(size: usize, f: impl Fn(usize, usize) -> u32) -> Self {
        let mut pixels = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                pixels.push(f(x, y));
            }
        }
        Self { size, pixels }
    }

    /// Column for a fractional face offset in [0, 1].
    #[inline]
    pub fn column(&self, face_offset: f32) -> usize {
        ((face_offset * self.size as f32) as usize).min(self.size - 1)
    }

    /// Texel at `column` and fractional height `v` in [0, 1).
    #[inline]
    pub fn texel(&self, column: usize, v: f32) -> u32 {
        let row = ((v * self.size as f32) as usize).min(self.size - 1);
        self.pixels[row * self.size + column.min(self.size - 1)]
    }
}

/// One texture per wall kind, indexed by [`WallKind::index`].
pub struct TextureSet {
    textures: [Texture; WallKind::COUNT],
}

impl TextureSet {
    pub fn new(textures: [Texture; WallKind::COUNT]) -> Self {
        Self { textures }
    }

    /// Builds the stock patterns used when a level ships no images.
    pub fn procedural(size: usize) -> Self {
        log::debug!("generating {} procedural {size}x{size} textures", WallKind::COUNT);
        Self::new(WallKind::ALL.map(|kind| generate(kind, size)))
    }

    #[inline]
    pub fn get(&self, kind: WallKind) -> &Texture {
        &self.textures[kind.index()]
    }
}

// cheap integer hash for stable per-texel noise
#[inline]
fn noise(x: usize, y: usize, seed: u32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x27d4_eb2d) ^ (y as u32).wrapping_mul(0x1656_67b1) ^ seed;
    h ^= h >> 15;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h & 0xff
}

#[inline]
fn tint(base: (u8, u8, u8), amount: u32) -> u32 {
    // amount 0..=255 maps to 75%..100% brightness
    let scale = 192 + amount / 4;
    let ch = |c: u8| ((c as u32 * scale) >> 8) as u8;
    pack_rgb(ch(base.0), ch(base.1), ch(base.2))
}

fn brick(x: usize, y: usize, size: usize, base: (u8, u8, u8), seed: u32) -> u32 {
    let row_h = (size / 4).max(1);
    let brick_w = (size / 2).max(1);
    let row = y / row_h;
    let shifted = x + if row % 2 == 1 { brick_w / 2 } else { 0 };
    if y % row_h == 0 || shifted % brick_w == 0 {
        pack_rgb(120, 120, 120) // mortar
    } else {
        tint(base, noise(shifted / brick_w, row, seed) / 2 + noise(x, y, seed) / 2)
    }
}

fn stone(x: usize, y: usize, base: (u8, u8, u8), seed: u32) -> u32 {
    let blotch = noise(x / 4, y / 4, seed);
    tint(base, (blotch + noise(x, y, seed ^ 0x55)) / 2)
}

fn generate(kind: WallKind, size: usize) -> Texture {
    let seed = (kind.index() as u32).wrapping_mul(0x9e37_79b9);
    match kind {
        WallKind::BlueBrick => Texture::from_fn(size, |x, y| brick(x, y, size, (40, 60, 200), seed)),
        WallKind::RedBrick => Texture::from_fn(size, |x, y| brick(x, y, size, (170, 50, 40), seed)),
        WallKind::PurpleStone => Texture::from_fn(size, |x, y| stone(x, y, (120, 50, 140), seed)),
        WallKind::GreyStone => Texture::from_fn(size, |x, y| stone(x, y, (128, 128, 128), seed)),
        WallKind::Wood => Texture::from_fn(size, |x, y| {
            let grain = ((x as f32 * 0.9 + (y as f32 * 0.15).sin() * 3.0).sin() * 0.5 + 0.5) * 255.0;
            tint((140, 90, 40), grain as u32)
        }),
        WallKind::Eagle => Texture::from_fn(size, |x, y| {
            let edge = x == 0 || y == 0 || x == size - 1 || y == size - 1;
            let c = ((x ^ y) * 256 / size.max(1)) as u8;
            if edge {
                pack_rgb(60, 60, 60)
            } else {
                pack_rgb(c, c / 2, 255 - c)
            }
        }),
        WallKind::Mossy => Texture::from_fn(size, |x, y| {
            if noise(x / 3, y / 3, seed) > 150 {
                tint((50, 120, 40), noise(x, y, seed))
            } else {
                stone(x, y, (110, 110, 110), seed)
            }
        }),
        WallKind::ColorStone => Texture::from_fn(size, |x, y| {
            let n = noise(x / 8, y / 8, seed);
            tint(((n * 3) as u8, (n * 5) as u8, (n * 7) as u8), noise(x, y, seed))
        }),
    }
}
