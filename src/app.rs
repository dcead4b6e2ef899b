//! Winit host: opens the window, drives the [`Engine`] once per redraw and
//! forwards input and resizes to it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::input::Input;
use crate::storage::DirectoryStorage;
use crate::wgpu_device::WgpuDevice;

/// Window and asset settings for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Directory every asset path is resolved against.
    pub asset_root: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Atrium".to_string(),
            width: 1280,
            height: 720,
            asset_root: PathBuf::from("assets"),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }
}

/// Runs the room viewer until the window closes. Returns the first fatal
/// error, if any.
pub fn run(config: AppConfig) -> Result<(), EngineError> {
    let event_loop = EventLoop::new().map_err(|e| EngineError::Window(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = AtriumApp::Pending { config };
    let mut failure = None;
    let result = event_loop.run_app(&mut AppRunner {
        app: &mut app,
        failure: &mut failure,
    });

    if let Some(err) = failure {
        return Err(err);
    }
    result.map_err(|e| EngineError::Window(e.to_string()))
}

enum AtriumApp {
    Pending {
        config: AppConfig,
    },
    Running {
        window: Arc<Window>,
        engine: Engine<WgpuDevice>,
        input: Input,
        last_frame: Instant,
    },
    Closed,
}

impl AtriumApp {
    fn start(config: &AppConfig, event_loop: &ActiveEventLoop) -> Result<Self, EngineError> {
        let attributes = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|e| EngineError::Window(e.to_string()))?,
        );

        let backend = WgpuDevice::new(window.clone())?;
        let storage = DirectoryStorage::new(&config.asset_root);
        log::info!("loading assets from {}", storage.root().display());
        let engine = Engine::new(backend, &storage)?;

        window.request_redraw();
        Ok(AtriumApp::Running {
            window,
            engine,
            input: Input::new(),
            last_frame: Instant::now(),
        })
    }
}

struct AppRunner<'a> {
    app: &'a mut AtriumApp,
    failure: &'a mut Option<EngineError>,
}

impl AppRunner<'_> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: EngineError) {
        *self.failure = Some(err);
        *self.app = AtriumApp::Closed;
        event_loop.exit();
    }
}

impl ApplicationHandler for AppRunner<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AtriumApp::Pending { config } = &*self.app else {
            return;
        };
        match AtriumApp::start(config, event_loop) {
            Ok(running) => *self.app = running,
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AtriumApp::Running {
            window,
            engine,
            input,
            last_frame,
        } = &mut *self.app
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                *self.app = AtriumApp::Closed;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                engine.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if input.key_pressed(KeyCode::Escape) {
                    *self.app = AtriumApp::Closed;
                    event_loop.exit();
                    return;
                }

                let now = Instant::now();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                let frame = engine.update(dt, input).and_then(|_| engine.draw());
                input.begin_frame();
                match frame {
                    Ok(_) => window.request_redraw(),
                    Err(err) => self.fail(event_loop, err),
                }
            }
            _ => {}
        }
    }
}
