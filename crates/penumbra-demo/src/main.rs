//! Interactive viewer for the penumbra renderer
//!
//! Controls:
//!   1 / 2 / 3 / 4  plain deferred / SSAO / SSDO / SSDO+SSAO
//!   K / L          plain / textured model
//!   U / I          free camera (grabs cursor) / locked camera
//!   O / P          show / hide status in the window title
//!   WASD           move, Q / E up / down, Shift doubles speed
//!   Mouse, scroll  look around, zoom (free camera only)
//!   Escape         exit

mod camera;
mod cli;
mod controls;

use anyhow::Context;
use camera::FlyCamera;
use clap::Parser;
use cli::Args;
use controls::{movement_for, Toggles};
use penumbra::light::generate_lights;
use penumbra::{assets, FrameInputs, LightSource, Model, Renderer};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

const TITLE: &str = "Penumbra";

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("Starting penumbra demo");

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = App::new(args);
    event_loop.run_app(&mut app).context("event loop error")?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    args: Args,
    state: Option<AppState>,
    /// Startup failure, reported once the loop has exited
    error: Option<anyhow::Error>,
}

struct AppState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: Renderer,
    model: Model,
    lights: Vec<LightSource>,

    camera: FlyCamera,
    toggles: Toggles,
    keys: HashSet<KeyCode>,

    last_frame: Instant,
    status_timer: f32,
    status_frames: u32,
}

impl App {
    fn new(args: Args) -> Self {
        Self { args, state: None, error: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match AppState::new(event_loop, &self.args) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {:#}", err);
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else { return };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutting down");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent { state: ks, physical_key: PhysicalKey::Code(key), repeat, .. },
                ..
            } => match ks {
                ElementState::Pressed => {
                    if key == KeyCode::Escape {
                        event_loop.exit();
                        return;
                    }
                    if !repeat {
                        state.handle_key(key);
                    }
                    state.keys.insert(key);
                }
                ElementState::Released => {
                    state.keys.remove(&key);
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                if state.toggles.camera_free {
                    let dy = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(p) => p.y as f32 / 20.0,
                    };
                    state.camera.process_scroll(dy);
                }
            }
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                state.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - state.last_frame).as_secs_f32();
                state.last_frame = now;
                state.update(dt);
                state.render();
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        let Some(state) = &mut self.state else { return };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.toggles.camera_free {
                state.camera.process_mouse(dx as f32, dy as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl AppState {
    fn new(event_loop: &ActiveEventLoop, args: &Args) -> anyhow::Result<Self> {
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(TITLE)
                        .with_inner_size(winit::dpi::PhysicalSize::new(args.width, args.height)),
                )
                .context("failed to create window")?,
        );

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .context("failed to create device")?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let config = args.renderer_config(surface_config.width, surface_config.height, surface_format);
        let mut renderer = Renderer::new(device.clone(), queue, config).context("failed to create renderer")?;

        let model = match &args.model {
            Some(path) => assets::load_obj(renderer.resources(), path)
                .with_context(|| format!("failed to load model {}", path.display()))?,
            None => {
                log::info!("No model given, using the procedural scene");
                assets::procedural_scene(renderer.resources())
            }
        };
        if let Some(dir) = &args.skybox {
            let sky = assets::load_skybox(renderer.resources(), dir)?;
            renderer.set_environment(sky);
        }

        let lights = generate_lights(args.lights, args.seed);
        log::info!("{} meshes, {} lights", model.meshes.len(), lights.len());

        let state = Self {
            window,
            surface,
            device,
            surface_config,
            renderer,
            model,
            lights,
            camera: FlyCamera::default(),
            toggles: Toggles::default(),
            keys: HashSet::new(),
            last_frame: Instant::now(),
            status_timer: 0.0,
            status_frames: 0,
        };
        state.grab_cursor(state.toggles.camera_free);
        Ok(state)
    }

    /// One-shot toggles
    fn handle_key(&mut self, key: KeyCode) {
        let before = self.toggles;
        if !self.toggles.apply(key) {
            return;
        }
        let after = self.toggles;
        if after.variant != before.variant {
            log::info!("Switching to {}", after.variant.label());
        }
        if after.camera_free != before.camera_free {
            self.grab_cursor(after.camera_free);
        }
        if before.show_status && !after.show_status {
            self.window.set_title(TITLE);
        }
    }

    fn grab_cursor(&self, grab: bool) {
        if grab {
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked))
                .is_ok();
            if !grabbed {
                log::warn!("Cursor grab unavailable");
            }
            self.window.set_cursor_visible(false);
        } else {
            let _ = self.window.set_cursor_grab(CursorGrabMode::None);
            self.window.set_cursor_visible(true);
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        if let Err(e) = self.renderer.resize(width, height) {
            log::error!("Resize failed: {}", e);
        }
    }

    fn update(&mut self, dt: f32) {
        if self.toggles.camera_free {
            let fast = self.keys.contains(&KeyCode::ShiftLeft) || self.keys.contains(&KeyCode::ShiftRight);
            for movement in self.keys.iter().filter_map(|&key| movement_for(key)) {
                self.camera.process_movement(movement, dt, fast);
            }
        }

        self.status_timer += dt;
        self.status_frames += 1;
        if self.toggles.show_status && self.status_timer >= 0.5 {
            let fps = self.status_frames as f32 / self.status_timer;
            self.window.set_title(&format!(
                "{} | {} | {} model | {:.0} fps",
                TITLE,
                self.toggles.variant.label(),
                if self.toggles.plain_model { "plain" } else { "textured" },
                fps
            ));
        }
        if self.status_timer >= 0.5 {
            self.status_timer = 0.0;
            self.status_frames = 0;
        }
    }

    fn render(&mut self) {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let camera = self.camera.camera();
        let inputs = FrameInputs {
            model: &self.model,
            camera: &camera,
            lights: &self.lights,
            width: self.surface_config.width,
            height: self.surface_config.height,
            plain_model: self.toggles.plain_model,
        };
        if let Err(e) = self.renderer.render(self.toggles.variant, &inputs, &view) {
            log::error!("Render error: {}", e);
        }

        output.present();
    }
}
