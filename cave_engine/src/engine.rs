/// Cave Engine - frame driver owning the renderer
///
/// The engine holds no global state: the application constructs one `Engine`,
/// initializes it against a window and drives frames through a [`GameLoop`].
/// Window event pumping stays with the application, which forwards resizes
/// through [`Engine::on_window_resized`].

use std::time::Instant;

use crate::error::Result;
use crate::platform::Window;
use crate::renderer::{Renderer, RendererConfig};

/// Delta time handed to the first frame
pub const FIRST_FRAME_DELTA_TIME: f32 = 1.0 / 60.0;

/// Game callbacks driven by the [`Engine`]
pub trait GameLoop {
    /// Called once before the first frame
    ///
    /// # Returns
    ///
    /// `false` to exit without running any frame
    fn on_game_start(&mut self, _renderer: &mut Renderer) -> Result<bool> {
        Ok(true)
    }

    /// Called once per frame between `begin_frame` and `end_frame`
    ///
    /// # Arguments
    ///
    /// * `renderer` - Renderer with an active frame
    /// * `delta_time` - Duration of the previous frame in seconds
    fn on_game_update(&mut self, renderer: &mut Renderer, delta_time: f32) -> Result<()>;

    /// Called once after the last frame, before the renderer shuts down
    fn on_game_end(&mut self, _renderer: &mut Renderer) {}

    /// `false` stops [`Engine::run`] after the current frame
    fn is_running(&self) -> bool {
        true
    }
}

/// Frame driver
///
/// # Example
///
/// ```no_run
/// use cave_engine::cave::{Engine, GameLoop, Renderer, RendererConfig, Result};
/// use cave_engine::cave::platform::HeadlessWindow;
///
/// struct TenFrames(u32);
///
/// impl GameLoop for TenFrames {
///     fn on_game_update(&mut self, _renderer: &mut Renderer, _delta_time: f32) -> Result<()> {
///         self.0 += 1;
///         Ok(())
///     }
///
///     fn is_running(&self) -> bool {
///         self.0 < 10
///     }
/// }
///
/// let mut engine = Engine::new();
/// engine.initialize(&HeadlessWindow::new(640, 480), RendererConfig::default())?;
/// engine.run(&mut TenFrames(0))?;
/// engine.shutdown();
/// # Ok::<(), cave_engine::cave::Error>(())
/// ```
#[derive(Default)]
pub struct Engine {
    renderer: Renderer,
    running: bool,
    last_frame_delta_time: Option<f32>,
    frame_count: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the renderer against `window`
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` if the engine is already initialized, otherwise any
    /// renderer initialization error.
    pub fn initialize(&mut self, window: &dyn Window, config: RendererConfig) -> Result<()> {
        if self.renderer.is_initialized() {
            crate::engine_bail!("cave::Engine", AlreadyInitialized, "engine is already initialized");
        }
        self.renderer.initialize(window, config)?;
        self.last_frame_delta_time = None;
        self.frame_count = 0;
        crate::engine_info!("cave::Engine", "Engine initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.renderer.is_initialized()
    }

    /// Run `on_game_start`; the engine is running afterwards unless the game
    /// asked to exit
    pub fn start(&mut self, game_loop: &mut dyn GameLoop) -> Result<bool> {
        crate::engine_assert!(self.is_initialized(), "cave::Engine", "start before initialize");
        self.running = game_loop.on_game_start(&mut self.renderer)?;
        if !self.running {
            crate::engine_info!("cave::Engine", "Game requested exit on start");
        }
        Ok(self.running)
    }

    /// Run one frame: `begin_frame`, `on_game_update`, `end_frame`
    ///
    /// The first frame receives [`FIRST_FRAME_DELTA_TIME`]; later frames
    /// receive the measured duration of the previous one.
    pub fn run_frame(&mut self, game_loop: &mut dyn GameLoop) -> Result<()> {
        let frame_start = Instant::now();
        let delta_time = self.last_frame_delta_time.unwrap_or(FIRST_FRAME_DELTA_TIME);

        self.renderer.begin_frame()?;
        if let Err(error) = game_loop.on_game_update(&mut self.renderer, delta_time) {
            crate::engine_error!("cave::Engine", "Game update failed: {}", error);
            // A render pass left open by the game keeps the frame open too.
            if !self.renderer.has_active_render_pass() {
                if let Err(present_error) = self.renderer.end_frame() {
                    crate::engine_warn!(
                        "cave::Engine",
                        "Frame after a failed update could not be presented: {}",
                        present_error
                    );
                }
            }
            return Err(error);
        }
        self.renderer.end_frame()?;

        self.frame_count += 1;
        self.last_frame_delta_time = Some(frame_start.elapsed().as_secs_f32());
        Ok(())
    }

    /// Start the game, run frames until it stops, then call `on_game_end`
    pub fn run(&mut self, game_loop: &mut dyn GameLoop) -> Result<()> {
        if !self.start(game_loop)? {
            return Ok(());
        }

        let mut result = Ok(());
        while self.running && game_loop.is_running() {
            if let Err(error) = self.run_frame(game_loop) {
                result = Err(error);
                break;
            }
        }
        self.running = false;

        game_loop.on_game_end(&mut self.renderer);
        crate::engine_info!("cave::Engine", "Game loop ended after {} frame(s)", self.frame_count);
        result
    }

    /// Stop [`Engine::run`] after the current frame
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resize the swapchain; swapchain-target framebuffers follow
    pub fn on_window_resized(&mut self, width: u32, height: u32) -> Result<()> {
        self.renderer.on_window_resized(width, height)
    }

    /// Shut the renderer down; does nothing if not initialized
    pub fn shutdown(&mut self) {
        if !self.renderer.is_initialized() {
            return;
        }
        self.running = false;
        self.renderer.shutdown();
        crate::engine_info!("cave::Engine", "Engine shut down");
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Duration of the last completed frame, if any
    pub fn last_frame_delta_time(&self) -> Option<f32> {
        self.last_frame_delta_time
    }

    /// Frames completed since `initialize`
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
