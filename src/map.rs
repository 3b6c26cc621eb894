use anyhow::bail;
use glam::Vec2;

/// Closed set of wall materials. Each kind owns one slot in the texture table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WallKind {
    BlueBrick,
    RedBrick,
    PurpleStone,
    GreyStone,
    Wood,
    Eagle,
    Mossy,
    ColorStone,
}

impl WallKind {
    pub const COUNT: usize = 8;
    pub const ALL: [WallKind; Self::COUNT] = [
        WallKind::BlueBrick,
        WallKind::RedBrick,
        WallKind::PurpleStone,
        WallKind::GreyStone,
        WallKind::Wood,
        WallKind::Eagle,
        WallKind::Mossy,
        WallKind::ColorStone,
    ];
    /// Reported for any coordinate outside the grid.
    pub const BORDER: WallKind = WallKind::BlueBrick;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'B' => WallKind::BlueBrick,
            'R' => WallKind::RedBrick,
            'P' => WallKind::PurpleStone,
            'S' => WallKind::GreyStone,
            'W' | 'G' => WallKind::Wood,
            'O' => WallKind::Eagle,
            'M' => WallKind::Mossy,
            'C' => WallKind::ColorStone,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall(WallKind),
}

/// Static occupancy grid, row-major, read-only once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct MapGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl MapGrid {
    /// Builds a grid, rejecting non-rectangular data and open borders.
    pub fn new(width: usize, height: usize, cells: Vec<Cell>) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            bail!("map must not be empty ({width}x{height})");
        }
        if cells.len() != width * height {
            bail!(
                "map is not rectangular: {} cells for {width}x{height}",
                cells.len()
            );
        }

        let this = Self {
            width,
            height,
            cells,
        };

        for x in 0..width {
            for y in [0, height - 1] {
                if this.cells[y * width + x] == Cell::Empty {
                    bail!("map border is open at ({x}, {y})");
                }
            }
        }
        for y in 0..height {
            for x in [0, width - 1] {
                if this.cells[y * width + x] == Cell::Empty {
                    bail!("map border is open at ({x}, {y})");
                }
            }
        }

        Ok(this)
    }

    /// Grid of the given size with every border cell set to `border` and an empty interior.
    #[cfg(test)]
    pub fn bordered(width: usize, height: usize, border: WallKind) -> anyhow::Result<Self> {
        let cells = (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    Cell::Wall(border)
                } else {
                    Cell::Empty
                }
            })
            .collect();
        Self::new(width, height, cells)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Out-of-range coordinates read as border walls, so traversal needs no bounds checks.
    #[inline]
    pub fn cell_at(&self, x: i32, y: i32) -> Cell {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Cell::Wall(WallKind::BORDER);
        }
        self.cells[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.cell_at(x, y) == Cell::Empty
    }

    #[inline]
    pub fn is_walkable_at(&self, p: Vec2) -> bool {
        self.is_walkable(p.x.floor() as i32, p.y.floor() as i32)
    }
}
