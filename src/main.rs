use std::sync::{mpsc, Arc};
use std::time::Instant;

use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::Window,
};

use pelter::controller::{InputState, WorldState};
use pelter::model::{asset, AssetError};
use pelter::utils::Mesh;
use pelter::view::{GpuContext, RenderState};
use pelter::logging;

struct App {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    window: Arc<Window>,

    render_state: RenderState,
    world: WorldState,
    input: InputState,

    // Pending asynchronous model load; dropped once it resolves
    model_rx: Option<mpsc::Receiver<Result<Mesh, AssetError>>>,
    started: Instant,
}

impl App {
    async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone()).unwrap();
        let gpu = GpuContext::new_native(&instance, surface, size.width, size.height).await;

        let world = WorldState::new(size.width, size.height);
        let render_state = RenderState::new(
            &gpu.device,
            gpu.format,
            gpu.config.alpha_mode,
            size.width,
            size.height,
            &world,
        );

        let model_rx = Some(asset::spawn_loader(
            asset::MODEL_MTL_PATH.to_string(),
            asset::MODEL_OBJ_PATH.to_string(),
        ));

        Self {
            surface: gpu.surface,
            device: gpu.device,
            queue: gpu.queue,
            window,
            render_state,
            world,
            input: InputState::new(),
            model_rx,
            started: Instant::now(),
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.world.camera.set_aspect(new_size.width, new_size.height);
        self.render_state
            .resize(&self.device, &self.surface, new_size.width, new_size.height);
    }

    /// Route window events into `InputState`. Returns true when consumed.
    fn input(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                if key_event.repeat {
                    return true;
                }
                let Some(key) = key_name(&key_event.logical_key) else {
                    return false;
                };
                match key_event.state {
                    ElementState::Pressed => self.input.key_down(key),
                    ElementState::Released => self.input.key_up(&key),
                }
                true
            }
            WindowEvent::Focused(false) => {
                self.input.clear_keys();
                true
            }
            _ => false,
        }
    }

    fn update(&mut self) {
        // Observe the one-time model load
        if let Some(rx) = &self.model_rx {
            if let Ok(result) = rx.try_recv() {
                self.world.scene.player_model.resolve(result);
                self.model_rx = None;
            }
        }

        let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.world.step(&self.input, now_ms);
        self.render_state
            .prepare(&self.device, &self.queue, &self.world);
    }

    fn render(&mut self) {
        self.render_state
            .draw_frame(&self.device, &self.queue, &self.surface);
    }
}

/// Map a winit logical key onto the same key names the browser reports, so
/// the bindings table is shared across platforms.
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(c) => Some(c.to_string()),
        Key::Named(NamedKey::Space) => Some(" ".to_string()),
        Key::Named(NamedKey::ArrowLeft) => Some("ArrowLeft".to_string()),
        Key::Named(NamedKey::ArrowRight) => Some("ArrowRight".to_string()),
        Key::Named(NamedKey::ArrowUp) => Some("ArrowUp".to_string()),
        Key::Named(NamedKey::ArrowDown) => Some("ArrowDown".to_string()),
        _ => None,
    }
}

fn main() {
    logging::init();

    let event_loop = EventLoop::new().unwrap();
    let window_attributes = Window::default_attributes()
        .with_title("pelter")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = event_loop.create_window(window_attributes).unwrap();
    let window = Arc::new(window);

    let mut app = pollster::block_on(App::new(window.clone()));

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => {
                            app.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => {
                            app.update();
                            app.render();
                        }
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        })
        .unwrap();
}
