use std::collections::HashSet;
use std::ffi::OsString;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, anyhow, bail};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::config::EngineConfig;
use crate::game::{FrameInput, FrameView, GameLoop, InputSource, LoopState, Presenter};
use crate::level::{DEFAULT_LEVEL, Level};
use crate::motion::Intent;
use crate::scaler::ScaleLut;

mod config;
mod game;
mod level;
mod map;
mod motion;
mod projector;
mod raycaster;
mod renderer;
mod scaler;
mod texture;
mod viewer;

// helper trait to convert platform errors into anyhow errors
trait ErrToAnyhow<T> {
    fn ah(self, what: &str) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> ErrToAnyhow<T> for Result<T, E> {
    fn ah(self, what: &str) -> anyhow::Result<T> {
        self.map_err(|err| anyhow!("{what}: {err}"))
    }
}

/// Internal framebuffer size for a window: fixed height, width from the aspect ratio.
fn internal_size(dst_w: usize, dst_h: usize, target_h: usize) -> (usize, usize) {
    let aspect = if dst_h > 0 {
        dst_w as f32 / dst_h as f32
    } else {
        1.0
    };

    let target_w = ((target_h as f32 * aspect).round() as usize).max(160);
    (target_w, target_h)
}

#[derive(Default)]
struct Keyboard {
    keys_down: HashSet<KeyCode>,
    quit: bool,
}

impl Keyboard {
    fn axis(&self, neg: &[KeyCode], pos: &[KeyCode]) -> f32 {
        let held = |keys: &[KeyCode]| keys.iter().any(|k| self.keys_down.contains(k));
        match (held(neg), held(pos)) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

impl InputSource for Keyboard {
    fn poll(&mut self) -> FrameInput {
        FrameInput {
            intent: Intent {
                forward: self.axis(&[KeyCode::KeyS, KeyCode::ArrowDown], &[KeyCode::KeyW, KeyCode::ArrowUp]),
                strafe: self.axis(&[KeyCode::KeyA], &[KeyCode::KeyD]),
                turn: self.axis(&[KeyCode::KeyQ, KeyCode::ArrowLeft], &[KeyCode::KeyE, KeyCode::ArrowRight]),
            },
            quit: self.quit,
        }
    }
}

/// Scripted input for headless runs: walks and turns slowly, then quits.
struct Autopilot {
    frames_left: u64,
}

impl InputSource for Autopilot {
    fn poll(&mut self) -> FrameInput {
        if self.frames_left == 0 {
            return FrameInput {
                quit: true,
                ..FrameInput::default()
            };
        }
        self.frames_left -= 1;
        FrameInput {
            intent: Intent {
                forward: 1.0,
                strafe: 0.0,
                turn: 0.25,
            },
            quit: false,
        }
    }
}

/// Discards frames, keeping a count and a running checksum for the log.
#[derive(Default)]
struct FrameSink {
    frames: u64,
    checksum: u64,
}

impl Presenter for FrameSink {
    fn present(&mut self, frame: FrameView<'_>) -> anyhow::Result<()> {
        self.frames += 1;
        self.checksum = frame
            .pixels
            .iter()
            .fold(self.checksum, |acc, &px| acc.rotate_left(5) ^ px as u64);
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Render this many frames without a window, then exit.
    headless: Option<u64>,
    level: Option<OsString>,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        if arg == "--headless" {
            let frames = args.next().context("--headless needs a frame count")?;
            let frames = frames
                .to_str()
                .and_then(|n| n.parse().ok())
                .with_context(|| format!("invalid frame count {frames:?}"))?;
            parsed.headless = Some(frames);
        } else if parsed.level.is_none() {
            parsed.level = Some(arg);
        } else {
            bail!("unexpected argument {arg:?}; usage: [--headless FRAMES] [LEVEL]");
        }
    }
    Ok(parsed)
}

fn run_headless(mut game: GameLoop, frames: u64) -> anyhow::Result<()> {
    log::info!("running {frames} frames headless");
    let mut sink = FrameSink::default();
    game.run(&mut Autopilot { frames_left: frames }, &mut sink, 1_000)?;
    log::info!(
        "{:?} after {} frames at {}, checksum {:016x}",
        game.state(),
        sink.frames,
        game.viewer().pos(),
        sink.checksum
    );
    Ok(())
}

/// softbuffer surface that stretches each frame to the window.
struct WindowPresenter {
    window: Rc<Window>,
    surface: softbuffer::Surface<Rc<Window>, Rc<Window>>,
    lut: ScaleLut,
}

impl WindowPresenter {
    fn new(event_loop: &ActiveEventLoop) -> anyhow::Result<Self> {
        let attributes = Window::default_attributes()
            .with_title("Grid Raycaster")
            .with_inner_size(LogicalSize::new(800.0, 600.0));

        let window = Rc::new(event_loop.create_window(attributes).ah("create window")?);
        let context = softbuffer::Context::new(window.clone()).ah("softbuffer context")?;
        let surface = softbuffer::Surface::new(&context, window.clone()).ah("softbuffer surface")?;

        Ok(Self {
            window,
            surface,
            lut: ScaleLut::default(),
        })
    }
}

impl Presenter for WindowPresenter {
    fn present(&mut self, frame: FrameView<'_>) -> anyhow::Result<()> {
        let size = self.window.inner_size();
        let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return Ok(()); // Minimized window, skip drawing
        };
        let (dw, dh) = (size.width as usize, size.height as usize);

        // Set softbuffer to window size
        self.surface.resize(w, h).ah("resize surface")?;
        if !self.lut.fits(dw, dh, frame.width, frame.height) {
            log::debug!("rebuilding scale table {}x{} -> {dw}x{dh}", frame.width, frame.height);
            self.lut = ScaleLut::new(dw, dh, frame.width, frame.height);
        }

        let mut buf = self.surface.buffer_mut().ah("buffer_mut")?;
        self.lut.blit(&mut buf, frame.pixels);
        buf.present().ah("present")?;
        Ok(())
    }
}

struct App {
    game: GameLoop,
    keyboard: Keyboard,
    presenter: Option<WindowPresenter>,
    last_tick: Instant,
    render_height: usize,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(game: GameLoop, render_height: usize) -> Self {
        Self {
            game,
            keyboard: Keyboard::default(),
            presenter: None,
            last_tick: Instant::now(),
            render_height,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        self.game.stop();
        event_loop.exit();
    }

    fn step(&mut self, event_loop: &ActiveEventLoop) {
        let Some(presenter) = self.presenter.as_mut() else {
            return;
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_tick);
        self.last_tick = now;

        match self.game.tick(&mut self.keyboard, presenter, dt) {
            Ok(LoopState::Running) => presenter.window.request_redraw(),
            Ok(LoopState::Stopped) => event_loop.exit(),
            Err(err) => self.fail(event_loop, err),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presenter.is_some() {
            return;
        }
        log::info!("creating window");
        match WindowPresenter::new(event_loop) {
            Ok(presenter) => {
                let size = presenter.window.inner_size();
                let (w, h) = internal_size(size.width as usize, size.height as usize, self.render_height);
                self.game.resize(w, h);
                presenter.window.request_redraw();
                self.presenter = Some(presenter);
                self.last_tick = Instant::now();
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.presenter.as_ref().is_none_or(|p| p.window.id() != id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("The close button was pressed; stopping");
                self.keyboard.quit = true;
                self.step(event_loop);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => {
                    if code == KeyCode::Escape {
                        self.keyboard.quit = true;
                    }
                    self.keyboard.keys_down.insert(code);
                }
                ElementState::Released => {
                    self.keyboard.keys_down.remove(&code);
                }
            },

            WindowEvent::RedrawRequested => self.step(event_loop),

            WindowEvent::Resized(new_size) => {
                let (w, h) = internal_size(
                    new_size.width as usize,
                    new_size.height as usize,
                    self.render_height,
                );
                self.game.resize(w, h);
            }
            _ => (),
        }
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_custom_env("RAYCASTER_LOG");

    let args = parse_args(std::env::args_os().skip(1))?;
    let level = match args.level {
        Some(path) => Level::load(path)?,
        None => {
            log::info!("no level given, using the built-in one");
            Level::parse(DEFAULT_LEVEL)?
        }
    };

    let cfg = EngineConfig::default();
    let render_height = cfg.render_height;
    log::info!("initializing game state");
    let game = GameLoop::with_default_textures(&level, cfg)?;

    if let Some(frames) = args.headless {
        return run_headless(game, frames);
    }

    let event_loop = EventLoop::new().ah("create event loop")?;
    // ControlFlow::Poll continuously runs the event loop, even if the OS hasn't
    // dispatched any events. This is ideal for games and similar applications.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(game, render_height);
    event_loop.run_app(&mut app).ah("event loop")?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_size_follows_aspect() {
        assert_eq!(internal_size(800, 600, 480), (640, 480));
        assert_eq!(internal_size(1920, 1080, 480), (853, 480));
        assert_eq!(internal_size(100, 1000, 480), (160, 480));
        assert_eq!(internal_size(0, 0, 480), (480, 480));
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut kb = Keyboard::default();
        kb.keys_down.insert(KeyCode::KeyW);
        kb.keys_down.insert(KeyCode::KeyD);
        let input = kb.poll();
        assert_eq!(input.intent.forward, 1.0);
        assert_eq!(input.intent.strafe, 1.0);
        assert!(!input.quit);

        kb.keys_down.insert(KeyCode::KeyS);
        assert_eq!(kb.poll().intent.forward, 0.0);
    }

    fn args(list: &[&str]) -> anyhow::Result<Args> {
        parse_args(list.iter().map(OsString::from))
    }

    #[test]
    fn parses_headless_flag_and_level() {
        assert_eq!(args(&[]).unwrap(), Args::default());
        assert_eq!(
            args(&["--headless", "30", "maps/a.txt"]).unwrap(),
            Args {
                headless: Some(30),
                level: Some("maps/a.txt".into()),
            }
        );
        assert!(args(&["--headless"]).is_err());
        assert!(args(&["--headless", "many"]).is_err());
        assert!(args(&["a.txt", "b.txt"]).is_err());
    }

    #[test]
    fn headless_run_renders_requested_frames() {
        let level = Level::parse(DEFAULT_LEVEL).unwrap();
        let mut game = GameLoop::with_default_textures(&level, EngineConfig::default()).unwrap();
        let mut sink = FrameSink::default();
        game.run(&mut Autopilot { frames_left: 3 }, &mut sink, 1_000)
            .unwrap();
        assert_eq!(sink.frames, 3);
        assert_eq!(game.state(), LoopState::Stopped);
        assert_ne!(game.viewer().pos(), level.spawn);

        let fresh = GameLoop::with_default_textures(&level, EngineConfig::default()).unwrap();
        assert!(run_headless(fresh, 2).is_ok());
    }
}
