use crate::images::DecodedImage;
use crate::keys::KeyRouter;
use anyhow::{Result, anyhow, bail};
use pixels::{Pixels, SurfaceTexture};
use psylab_core::{ImageId, PsylabError, StimulusDisplay};
use psylab_experiment::RunConfiguration;
use psylab_render::{FrameStats, SkiaRenderer};
use psylab_timing::{HighPrecisionTimer, Timer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Window-side state driven by the event loop.
struct Shell {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    scale_factor: f64,
    refresh_rate: Option<f64>,

    fixation_size: f32,
    image_size: (f32, f32),
    keys: KeyRouter,
    timer: HighPrecisionTimer,

    close_requested: bool,
    failure: Option<String>,
}

impl Shell {
    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("No monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Psylab")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.scale_factor = window.scale_factor();

        info!(
            width = physical_size.width,
            height = physical_size.height,
            scale_factor = self.scale_factor,
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            self.fixation_size,
            self.image_size,
        )?);

        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }

    fn surfaces(&mut self) -> psylab_core::Result<(&mut Pixels<'static>, &mut SkiaRenderer)> {
        match (self.pixels.as_mut(), self.renderer.as_mut()) {
            (Some(pixels), Some(renderer)) => Ok((pixels, renderer)),
            _ => Err(PsylabError::Display("window is not open".to_string())),
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        // the frame buffer keeps its size; the surface scales it
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                warn!(error = %e, "failed to resize surface");
            }
        }
        debug!(width = new_size.width, height = new_size.height, "display resized");
    }
}

impl ApplicationHandler for Shell {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.failure = Some(format!("failed to create window and surface: {e:#}"));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                let at = self.timer.now();
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => self.close_requested = true,
                    PhysicalKey::Code(code) => {
                        self.keys.dispatch(code, at);
                    }
                    PhysicalKey::Unidentified(_) => {}
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
    }
}

/// Fullscreen window that presents fixation crosses and images.
///
/// The event loop is pumped without blocking on every `present`, so key
/// presses are routed while trials busy-wait. Escape or a close request aborts
/// the run with a display error.
pub struct WindowDisplay {
    event_loop: EventLoop<()>,
    shell: Shell,
}

impl WindowDisplay {
    /// Opens the window and waits until its surface exists.
    pub fn open(
        config: &RunConfiguration,
        timer: HighPrecisionTimer,
        keys: KeyRouter,
    ) -> Result<Self> {
        let mut event_loop = EventLoop::new()?;
        let mut shell = Shell {
            window: None,
            pixels: None,
            renderer: None,
            scale_factor: 1.0,
            refresh_rate: None,
            fixation_size: config.fixation_size,
            image_size: config.image_size,
            keys,
            timer,
            close_requested: false,
            failure: None,
        };

        let deadline = Instant::now() + OPEN_TIMEOUT;
        while shell.renderer.is_none() {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut shell);
            if let Some(failure) = shell.failure.take() {
                bail!(failure);
            }
            if let PumpStatus::Exit(code) = status {
                bail!("event loop exited with code {code} before the window opened");
            }
            if shell.close_requested {
                bail!("window closed before the run started");
            }
            if Instant::now() > deadline {
                bail!("window did not open within {OPEN_TIMEOUT:?}");
            }
        }

        Ok(Self { event_loop, shell })
    }

    /// Box images should be scaled into before they are added.
    pub fn image_box(&self) -> (u32, u32) {
        self.shell
            .renderer
            .as_ref()
            .map(SkiaRenderer::image_box)
            .unwrap_or((1, 1))
    }

    pub fn refresh_rate(&self) -> Option<f64> {
        self.shell.refresh_rate
    }

    pub fn add_image(&mut self, image: DecodedImage) -> Result<ImageId> {
        let (_, renderer) = self.shell.surfaces()?;
        renderer.add_image(image.rgba, image.width, image.height)
    }

    fn draw<F>(&mut self, what: F) -> psylab_core::Result<()>
    where
        F: FnOnce(&mut SkiaRenderer, &mut [u8]) -> Result<FrameStats>,
    {
        let (pixels, renderer) = self.shell.surfaces()?;
        let stats = what(renderer, pixels.frame_mut())
            .map_err(|e| PsylabError::Display(format!("{e:#}")))?;
        if stats.dirty_count > 0 {
            trace!(
                clear_ms = stats.clear.as_secs_f64() * 1e3,
                draw_ms = stats.draw.as_secs_f64() * 1e3,
                copy_ms = stats.copy.as_secs_f64() * 1e3,
                total_ms = stats.total.as_secs_f64() * 1e3,
                dirty = stats.dirty_count,
                "frame drawn"
            );
        }
        Ok(())
    }
}

impl StimulusDisplay for WindowDisplay {
    fn draw_fixation(&mut self) -> psylab_core::Result<()> {
        self.draw(|renderer, frame| renderer.render_fixation(frame))
    }

    fn draw_image(&mut self, image: ImageId) -> psylab_core::Result<()> {
        self.draw(|renderer, frame| renderer.render_image(image, frame))
    }

    fn present(&mut self) -> psylab_core::Result<()> {
        let (pixels, _) = self.shell.surfaces()?;
        pixels
            .render()
            .map_err(|e| PsylabError::Display(format!("failed to present frame: {e}")))?;
        self.poll_events()
    }

    fn poll_events(&mut self) -> psylab_core::Result<()> {
        let status = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.shell);
        if let Some(failure) = self.shell.failure.take() {
            return Err(PsylabError::Display(failure));
        }
        if let PumpStatus::Exit(code) = status {
            return Err(PsylabError::Display(format!("event loop exited with code {code}")));
        }
        if self.shell.close_requested {
            return Err(PsylabError::Display("run aborted by the operator".to_string()));
        }
        Ok(())
    }
}
