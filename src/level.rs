use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

use anyhow::{Context, bail};
use glam::Vec2;

use crate::config::{EngineConfig, Fog, pack_rgb};
use crate::map::{Cell, MapGrid, WallKind};

/// Level shipped with the binary, used when no path is given.
pub const DEFAULT_LEVEL: &str = "\
!!!!META
spawn,facing=180
fog,distance=14,color=#202028
ceiling,texture=W
floor,texture=S

!!!!MAIN
BBBBBBBBBB
G   @    B
B  B   W B
B  B   W B
O      M B
BBBSSSBBBB
";

fn parse_hex_color(hex: &str) -> anyhow::Result<u32> {
    let Some(digits) = hex.strip_prefix('#') else {
        bail!("not a hex string: {hex}");
    };
    if digits.len() != 6 || !digits.is_ascii() {
        bail!("not a hex string: {hex}");
    }

    let r = u8::from_str_radix(&digits[0..2], 16)?;
    let g = u8::from_str_radix(&digits[2..4], 16)?;
    let b = u8::from_str_radix(&digits[4..6], 16)?;

    Ok(pack_rgb(r, g, b))
}

/// Settings a level may override. Absent keys leave the engine value alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Meta {
    Fov {
        degrees: f32,
    },
    Fog(Fog),
    Ceiling {
        top: Option<u32>,
        horizon: Option<u32>,
        texture: Option<WallKind>,
    },
    Floor {
        horizon: Option<u32>,
        bottom: Option<u32>,
        texture: Option<WallKind>,
    },
}

#[derive(Clone, Debug)]
pub struct Level {
    pub grid: MapGrid,
    pub spawn: Vec2,
    /// radians
    pub facing: f32,
    pub meta: Vec<Meta>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Meta,
    Main,
}

impl Level {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("loading level at {}", path.display());
        let text = read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut section = Section::None;
        let mut meta = Vec::new();
        let mut facing = 0.0f32;
        let mut rows: Vec<&str> = Vec::new();

        for (n, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            match line {
                "!!!!META" => {
                    section = Section::Meta;
                    continue;
                }
                "!!!!MAIN" => {
                    if !rows.is_empty() {
                        bail!("line {}: duplicate MAIN section", n + 1);
                    }
                    section = Section::Main;
                    continue;
                }
                _ => {}
            }

            match section {
                _ if line.is_empty() => {
                    if section == Section::Main && !rows.is_empty() {
                        section = Section::None;
                    }
                }
                Section::None => bail!("line {}: unrecognized directive: {line}", n + 1),
                Section::Meta => {
                    if let Some(deg) = parse_meta(line, &mut meta)
                        .with_context(|| format!("line {}", n + 1))?
                    {
                        facing = deg.to_radians();
                    }
                }
                Section::Main => rows.push(line),
            }
        }

        let (grid, spawn) = parse_grid(&rows)?;
        log::debug!(
            "level {}x{} spawn {spawn} with {} meta entries",
            grid.width(),
            grid.height(),
            meta.len()
        );

        Ok(Self {
            grid,
            spawn,
            facing,
            meta,
        })
    }

    /// Overlays this level's META entries on `cfg`.
    pub fn configure(&self, cfg: &mut EngineConfig) {
        for entry in &self.meta {
            match *entry {
                Meta::Fov { degrees } => cfg.fov_degrees = degrees,
                Meta::Fog(fog) => cfg.fog = Some(fog),
                Meta::Ceiling {
                    top,
                    horizon,
                    texture,
                } => {
                    let [old_top, old_horizon] = cfg.ceiling;
                    cfg.ceiling = [top.unwrap_or(old_top), horizon.unwrap_or(old_horizon)];
                    cfg.ceiling_texture = texture.or(cfg.ceiling_texture);
                }
                Meta::Floor {
                    horizon,
                    bottom,
                    texture,
                } => {
                    let [old_horizon, old_bottom] = cfg.floor;
                    cfg.floor = [horizon.unwrap_or(old_horizon), bottom.unwrap_or(old_bottom)];
                    cfg.floor_texture = texture.or(cfg.floor_texture);
                }
            }
        }
    }
}

// Returns the spawn facing in degrees for `spawn` lines.
fn parse_meta(line: &str, meta: &mut Vec<Meta>) -> anyhow::Result<Option<f32>> {
    let mut chunks = line.split(',');
    let directive = chunks.next().unwrap_or_default();
    let params = chunks
        .map(|param| param.split_once('='))
        .collect::<Option<HashMap<_, _>>>()
        .context("incorrectly formatted meta")?;

    let allow = |keys: &[&str]| -> anyhow::Result<()> {
        match params.keys().find(|key| !keys.contains(*key)) {
            Some(key) => bail!("{directive}: unknown key {key:?}, expected one of {keys:?}"),
            None => Ok(()),
        }
    };
    let number = |key: &str, default: &str| -> anyhow::Result<f32> {
        let v: f32 = params.get(key).unwrap_or(&default).parse()?;
        if !v.is_finite() {
            bail!("{directive}: {key} must be finite");
        }
        Ok(v)
    };
    let color = |key: &str, default: &str| parse_hex_color(params.get(key).unwrap_or(&default));
    let maybe_color = |key: &str| params.get(key).map(|hex| parse_hex_color(hex)).transpose();
    let texture = |key: &str| -> anyhow::Result<Option<WallKind>> {
        let Some(tile) = params.get(key) else {
            return Ok(None);
        };
        let mut chars = tile.chars();
        match (chars.next().and_then(WallKind::from_char), chars.next()) {
            (Some(kind), None) => Ok(Some(kind)),
            _ => bail!("{directive}: {key} must be a single wall tile, got {tile:?}"),
        }
    };

    match directive {
        "spawn" => {
            allow(&["facing"])?;
            return Ok(Some(number("facing", "0")?));
        }
        "fov" => {
            allow(&["degrees"])?;
            let degrees = number("degrees", "66")?;
            if !(1.0..180.0).contains(&degrees) {
                bail!("fov must be within 1..180 degrees, got {degrees}");
            }
            meta.push(Meta::Fov { degrees });
        }
        "fog" => {
            allow(&["distance", "color"])?;
            let distance = number("distance", "16")?;
            if distance <= 0.0 {
                bail!("fog distance must be positive, got {distance}");
            }
            meta.push(Meta::Fog(Fog {
                distance,
                color: color("color", "#000000")?,
            }));
        }
        "ceiling" => {
            allow(&["top", "horizon", "texture"])?;
            meta.push(Meta::Ceiling {
                top: maybe_color("top")?,
                horizon: maybe_color("horizon")?,
                texture: texture("texture")?,
            });
        }
        "floor" => {
            allow(&["horizon", "bottom", "texture"])?;
            meta.push(Meta::Floor {
                horizon: maybe_color("horizon")?,
                bottom: maybe_color("bottom")?,
                texture: texture("texture")?,
            });
        }
        other => bail!("unrecognized meta directive: {other}"),
    }

    Ok(None)
}

fn parse_grid(rows: &[&str]) -> anyhow::Result<(MapGrid, Vec2)> {
    if rows.is_empty() {
        bail!("level has no MAIN section");
    }

    let width = rows[0].chars().count();
    let mut cells = Vec::with_capacity(width * rows.len());
    let mut spawn = None;

    for (y, row) in rows.iter().enumerate() {
        if row.chars().count() != width {
            bail!("row {y} is {} cells wide, expected {width}", row.chars().count());
        }
        for (x, tile) in row.chars().enumerate() {
            cells.push(match tile {
                ' ' => Cell::Empty,
                '@' => {
                    if spawn.is_some() {
                        bail!("second spawn at ({x}, {y})");
                    }
                    spawn = Some(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                    Cell::Empty
                }
                other => match WallKind::from_char(other) {
                    Some(kind) => Cell::Wall(kind),
                    None => bail!("invalid tile in map: {other:?}"),
                },
            });
        }
    }

    let grid = MapGrid::new(width, rows.len(), cells)?;
    let spawn = spawn.context("no spawn in map")?;
    Ok((grid, spawn))
}
