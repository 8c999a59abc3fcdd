//! Platform layer: window, event loop and the redraw-driven frame loop.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use renderer::{FrameStatus, GpuState, RendererConfig, Scene};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

/// Viewer settings, filled from the command line.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub backends: wgpu::Backends,
    pub asset_root: PathBuf,
    pub texture_extension: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            backends: wgpu::Backends::all(),
            asset_root: PathBuf::from("assets/Models"),
            texture_extension: "png".to_owned(),
        }
    }
}

impl ViewerConfig {
    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            backends: self.backends,
            asset_root: self.asset_root.clone(),
            texture_extension: self.texture_extension.clone(),
            models: Scene::default_layout(),
        }
    }
}

struct Viewer {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    dropped_frames: u64,
    fatal: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            window: None,
            gpu: None,
            dropped_frames: 0,
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.fatal = Some(error);
        self.gpu = None;
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Scene Viewer")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            &self.config.renderer_config(),
        ))
        .context("GPU initialization failed")?;

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        Ok(())
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::debug!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {scale_factor:.3}");
                if let (Some(window), Some(gpu)) = (&self.window, self.gpu.as_mut()) {
                    let size = window.inner_size();
                    gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(gpu) = self.gpu.as_mut() else {
                    return;
                };
                match gpu.render() {
                    Ok(FrameStatus::Presented) => {}
                    Ok(FrameStatus::Dropped) => {
                        self.dropped_frames += 1;
                    }
                    Err(e) => self.fail(event_loop, e.into()),
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.dropped_frames > 0 {
            log::info!("{} frames dropped during the session", self.dropped_frames);
        }
        self.gpu = None;
    }
}

/// Open the viewer window and render until it is closed. Initialization and
/// device errors end the loop and are returned here.
pub fn run(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut viewer = Viewer::new(config);

    event_loop
        .run_app(&mut viewer)
        .context("winit event loop terminated with error")?;

    match viewer.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
