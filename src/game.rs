use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::level::Level;
use crate::map::MapGrid;
use crate::motion::{Intent, MotionController};
use crate::projector::{WallSlice, project_columns};
use crate::raycaster::{RayHit, cast_columns};
use crate::renderer::render_frame;
use crate::texture::{TEXTURE_SIZE, TextureSet};
use crate::viewer::Viewer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// One frame's worth of input, sampled once at the start of the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub intent: Intent,
    pub quit: bool,
}

pub trait InputSource {
    fn poll(&mut self) -> FrameInput;
}

/// Read-only view of a finished frame.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    pub pixels: &'a [u32],
    pub width: usize,
    pub height: usize,
}

pub trait Presenter {
    fn present(&mut self, frame: FrameView<'_>) -> anyhow::Result<()>;
}

struct FrameStats {
    frames: u32,
    since: Instant,
}

impl FrameStats {
    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            log::info!("FPS: {:.1}", self.frames as f32 / elapsed);
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

/// Per-session state and the frame pipeline: input, motion, rays, slices, pixels, present.
pub struct GameLoop {
    cfg: EngineConfig,
    map: MapGrid,
    viewer: Viewer,
    motion: MotionController,
    textures: TextureSet,
    state: LoopState,

    // per-frame buffers, reused across frames
    hits: Vec<RayHit>,
    slices: Vec<WallSlice>,
    fb: Vec<u32>,
    fb_w: usize,
    fb_h: usize,

    stats: FrameStats,
}

impl GameLoop {
    pub fn new(level: &Level, mut cfg: EngineConfig, textures: TextureSet) -> anyhow::Result<Self> {
        level.configure(&mut cfg);
        let viewer = Viewer::spawn(&level.grid, level.spawn, level.facing, &cfg)?;
        let (fb_w, fb_h) = (cfg.render_width, cfg.render_height);

        Ok(Self {
            motion: MotionController::new(&cfg),
            map: level.grid.clone(),
            viewer,
            textures,
            state: LoopState::Running,
            hits: Vec::with_capacity(fb_w),
            slices: Vec::with_capacity(fb_w),
            fb: vec![0; fb_w * fb_h],
            fb_w,
            fb_h,
            stats: FrameStats {
                frames: 0,
                since: Instant::now(),
            },
            cfg,
        })
    }

    /// Session with the procedural texture set.
    pub fn with_default_textures(level: &Level, cfg: EngineConfig) -> anyhow::Result<Self> {
        Self::new(level, cfg, TextureSet::procedural(TEXTURE_SIZE))
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    #[inline]
    pub fn frame(&self) -> FrameView<'_> {
        FrameView {
            pixels: &self.fb,
            width: self.fb_w,
            height: self.fb_h,
        }
    }

    /// Reallocates the internal framebuffer if its size changed.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) == (self.fb_w, self.fb_h) {
            return;
        }
        log::debug!("framebuffer {}x{} -> {width}x{height}", self.fb_w, self.fb_h);
        self.fb_w = width;
        self.fb_h = height;
        self.fb = vec![0; width * height];
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            log::info!("game loop stopping");
        }
        self.state = LoopState::Stopped;
    }

    /// Runs one frame. A presenter failure stops the loop and is returned.
    pub fn tick(
        &mut self,
        input: &mut impl InputSource,
        presenter: &mut impl Presenter,
        dt: Duration,
    ) -> anyhow::Result<LoopState> {
        if self.state == LoopState::Stopped {
            return Ok(LoopState::Stopped);
        }

        let frame_input = input.poll();
        if frame_input.quit {
            self.stop();
            return Ok(self.state);
        }

        // Compute dt with cap to avoid huge jumps if the app was paused
        let dt = dt.min(self.cfg.max_frame_dt).as_secs_f32();
        self.motion
            .apply(&mut self.viewer, &self.map, frame_input.intent, dt);

        self.draw();

        if let Err(err) = presenter.present(self.frame()) {
            log::error!("presenting frame failed: {err:#}");
            self.stop();
            return Err(err);
        }

        self.stats.tick();
        Ok(self.state)
    }

    /// Casts, projects and renders into the internal framebuffer.
    fn draw(&mut self) {
        // rays see one pose for the whole frame
        let snapshot = self.viewer;
        cast_columns(&self.map, &snapshot, &self.cfg, self.fb_w, &mut self.hits);
        project_columns(&self.hits, self.fb_h, &self.cfg, &self.textures, &mut self.slices);
        render_frame(
            &mut self.fb,
            self.fb_w,
            self.fb_h,
            &self.slices,
            snapshot.pos(),
            &self.textures,
            &self.cfg,
        );
    }

    /// Drives ticks at a fixed cadence until the loop stops.
    pub fn run(
        &mut self,
        input: &mut impl InputSource,
        presenter: &mut impl Presenter,
        target_fps: u64,
    ) -> anyhow::Result<()> {
        let delta = Duration::from_millis(1_000 / target_fps.max(1));
        let mut last = Instant::now();

        while self.state == LoopState::Running {
            let prev = Instant::now();
            let dt = prev - last;
            last = prev;

            self.tick(input, presenter, dt)?;

            let diff = prev.elapsed();
            if diff < delta {
                std::thread::sleep(delta - diff);
            }
        }

        Ok(())
    }
}
