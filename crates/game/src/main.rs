//! isleview: walk a heightmap island through a day/night cycle.

mod config;
mod daylight;
mod display;
mod frame;
mod hud;
mod model;
mod player;
mod population;
mod scene;
mod vegetation;

use anyhow::{Context, Result};
use display::{Display, WinitDisplay};
use engine_core::SceneConfig;
use frame::FrameOrchestrator;
use player::Player;
use renderer::Renderer;
use scene::Scene;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

/// Everything alive once the window exists.
struct GameState {
    display: WinitDisplay,
    scene: Scene,
    player: Player,
    frames: FrameOrchestrator,
}

impl GameState {
    async fn new(window: Arc<Window>, config: &SceneConfig) -> Result<Self> {
        let renderer = Renderer::new(window, config)
            .await
            .context("failed to initialise the renderer")?;
        let mut display = WinitDisplay::new(renderer);

        let scene = Scene::load(display.device(), config);
        let player = Player::new(&config.camera, display.viewport().aspect());
        let frames = FrameOrchestrator::new(config);

        Ok(Self {
            display,
            scene,
            player,
            frames,
        })
    }

    /// Handle a window event. Returns true if the app should exit.
    fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        if let WindowEvent::Resized(size) = &event {
            self.player.camera.set_aspect(size.width, size.height);
        }
        if self.display.handle_window_event(&event) {
            let frame = self.frames.run_frame(&mut self.display, &self.scene, &mut self.player);
            if let Err(e) = frame {
                log::error!("Render error: {e}");
            }
            self.display.request_redraw();
        }
        self.display.should_close()
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        self.display.handle_device_event(&event);
    }
}

struct App {
    config: SceneConfig,
    state: Option<GameState>,
}

impl App {
    fn new(config: SceneConfig) -> Self {
        Self { config, state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GameState::new(window.clone(), &self.config)) {
            Ok(state) => {
                self.state = Some(state);
                window.request_redraw();
            }
            Err(e) => {
                log::error!("Failed to initialise isleview: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) {
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.handle_device_event(event);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔══════════════════════════════════════════╗");
    println!("║                isleview                  ║");
    println!("╠══════════════════════════════════════════╣");
    println!("║  WASD   - Walk      │  Mouse  - Look     ║");
    println!("║  Shift  - Run       │  Space  - Jump     ║");
    println!("║  Escape - Quit                           ║");
    println!("╚══════════════════════════════════════════╝");

    let config = config::load_scene_config(&config::config_path());

    let event_loop = EventLoop::new()?;
    // Input is polled every frame; never block waiting for events.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
