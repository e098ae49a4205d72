use std::{sync::Arc, sync::Mutex};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};
use glam::Vec2;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use winit::event_loop::EventLoopProxy;
#[cfg(target_arch = "wasm32")]
use once_cell::sync::OnceCell;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::future_to_promise;
#[cfg(target_arch = "wasm32")]
use js_sys::Promise;

pub mod camera;
pub mod color;
pub mod config;
pub mod driver;
pub mod error;
pub mod scene;
pub mod sections;
mod models;
mod ui_events;
mod app_state;

pub use config::SceneConfig;
pub use error::{Result, SceneError};
pub use sections::{Backdrop, Section};

use ui_events::UserCommand;
use app_state::State;

/// Environment variable naming a JSON scene config for the native viewer.
pub const CONFIG_ENV_VAR: &str = "SYNAPSEVIEW_CONFIG";

#[cfg(target_arch = "wasm32")]
static WASM_API_INSTANCE: OnceCell<WasmApi> = OnceCell::new();

#[cfg(target_arch = "wasm32")]
static WASM_READY_FLUME_CHANNEL: OnceCell<(flume::Sender<()>, flume::Receiver<()>)> = OnceCell::new();


struct App {
    window: Option<Arc<Window>>,
    state: Arc<Mutex<Option<State>>>, // filled asynchronously on wasm
    initial_config: SceneConfig,
    #[cfg(target_arch = "wasm32")]
    proxy: Option<EventLoopProxy<UserCommand>>,
}

impl App {
    fn new(
        initial_config: SceneConfig,
        #[cfg(target_arch = "wasm32")] event_loop: &EventLoop<UserCommand>,
    ) -> Self {
        #[cfg(target_arch = "wasm32")]
        let app_proxy = event_loop.create_proxy();

        #[cfg(target_arch = "wasm32")]
        {
            let wasm_api_instance = WasmApi { proxy: app_proxy.clone() };
            if WASM_API_INSTANCE.set(wasm_api_instance).is_err() {
                log::warn!("WASM_API_INSTANCE was already set. This should only happen once.");
            }
        }

        Self {
            window: None,
            state: Arc::new(Mutex::new(None)),
            initial_config,
            #[cfg(target_arch = "wasm32")]
            proxy: Some(app_proxy),
        }
    }
}

impl ApplicationHandler<UserCommand> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title("SynapseView");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match pollster::block_on(State::new(window.clone(), self.initial_config.clone())) {
                Ok(mut state) => {
                    let size = window.inner_size();
                    state.resize(size.width, size.height);
                    if let Ok(mut guard) = self.state.lock() {
                        guard.replace(state);
                    }
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to create State: {e:?}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let state_arc_for_spawn = self.state.clone();
            let window_for_state_new = window.clone();
            let initial_config = self.initial_config.clone();
            let proxy_for_init_notification = self.proxy.as_ref().expect("App proxy not set").clone();

            wasm_bindgen_futures::spawn_local(async move {
                match State::new(window_for_state_new.clone(), initial_config).await {
                    Ok(mut state_instance) => {
                        log::info!("WASM State created in async task.");
                        let initial_size = window_for_state_new.inner_size();
                        state_instance.resize(initial_size.width, initial_size.height);

                        if let Ok(mut guard) = state_arc_for_spawn.lock() {
                            guard.replace(state_instance);
                        }
                        log::info!("WASM State assigned to App. Sending initialization notification.");
                        if proxy_for_init_notification.send_event(UserCommand::StateInitialized).is_err() {
                            log::error!("Failed to send StateInitialized event.");
                        }
                    },
                    Err(e) => log::error!("Failed to create State in WASM: {:?}", e),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserCommand) {
        match event {
            UserCommand::StateInitialized => {
                log::info!("WASM State initialized and ready.");
                #[cfg(target_arch = "wasm32")]
                if let Some((sender, _)) = WASM_READY_FLUME_CHANNEL.get() {
                    if let Err(e) = sender.send(()) {
                        log::error!("Failed to send WASM ready signal: {:?}", e);
                    }
                }
                if let Some(w_handle) = self.window.as_ref() {
                    w_handle.request_redraw();
                }
            }
            _ => {
                let Ok(mut guard) = self.state.lock() else { return };
                if let Some(state) = guard.as_mut() {
                    state.process_command(event);
                    if let Some(w_handle) = self.window.as_ref() {
                        w_handle.request_redraw();
                    }
                } else {
                    log::warn!("Received a command before state was initialized (via proxy). Ignoring: {:?}", event);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Ok(mut guard) = self.state.lock() else { return };
        let Some(state) = guard.as_mut() else {
            log::warn!("Window event received before State was initialized, ignoring.");
            return;
        };
        let Some(window_handle) = self.window.as_ref() else { return };

        let mut needs_redraw = false;

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                state.resize(size.width, size.height);
                needs_redraw = true;
            }
            WindowEvent::RedrawRequested => {
                // the scenes animate, keep the frame loop going
                needs_redraw = state.update();
                match state.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => state.resize(state.config.width, state.config.height),
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                    Err(e) => log::error!("{:?}", e),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => state.pointer_left(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if key_state.is_pressed() && !repeat {
                    let section = match code {
                        KeyCode::Digit1 => Some(Section::Home),
                        KeyCode::Digit2 => Some(Section::About),
                        KeyCode::Digit3 => Some(Section::Projects),
                        KeyCode::Digit4 => Some(Section::Research),
                        KeyCode::Digit5 => Some(Section::Contact),
                        KeyCode::KeyR => {
                            log::info!("FPS: {}", state.current_fps);
                            None
                        }
                        _ => None,
                    };
                    if let Some(section) = section {
                        state.process_command(UserCommand::ShowSection(section));
                        needs_redraw = true;
                    }
                }
            },
            _ => {}
        }

        if needs_redraw {
            window_handle.request_redraw();
        }
    }
}

/// Scene config for the native viewer: the file named by `SYNAPSEVIEW_CONFIG`,
/// or the built-in reference design.
#[cfg(not(target_arch = "wasm32"))]
fn initial_config() -> anyhow::Result<SceneConfig> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => Ok(SceneConfig::load(path)?),
        None => Ok(SceneConfig::default()),
    }
}

pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    let initial_config = {
        env_logger::init();
        initial_config()?
    };
    #[cfg(target_arch = "wasm32")]
    let initial_config = {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)?;
        log::info!("Starting SynapseView.");
        let (sender, receiver) = flume::unbounded();
        if WASM_READY_FLUME_CHANNEL.set((sender, receiver)).is_err() {
            anyhow::bail!("WASM ready channel was already initialized");
        }
        // the page pushes its own config through setSceneConfig
        SceneConfig::default()
    };

    let event_loop = EventLoop::with_user_event().build()?;
    let mut app = App::new(
        initial_config,
        #[cfg(target_arch = "wasm32")]
        &event_loop,
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> std::result::Result<(), wasm_bindgen::JsValue> {
    log::info!("WASM started: Calling run().");
    run().map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct WasmApi {
    proxy: EventLoopProxy<UserCommand>,
}

#[cfg(target_arch = "wasm32")]
impl WasmApi {
    fn send(&self, command: UserCommand) -> std::result::Result<(), JsValue> {
        self.proxy
            .send_event(command)
            .map_err(|_| JsValue::from_str("Failed to send command to event loop."))
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl WasmApi {
    #[wasm_bindgen(js_name = setSceneConfig)]
    pub fn set_scene_config(&self, config_json: &str) -> std::result::Result<(), JsValue> {
        let config = SceneConfig::from_json_str(config_json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        log::info!("Received SetSceneConfig command from JS.");
        self.send(UserCommand::ApplySceneConfig(Box::new(config)))
    }

    /// Unknown fragments are ignored rather than reported.
    #[wasm_bindgen(js_name = showSection)]
    pub fn show_section(&self, fragment: &str) -> std::result::Result<(), JsValue> {
        match UserCommand::from_fragment(fragment) {
            Some(command) => self.send(command),
            None => Ok(()),
        }
    }

    #[wasm_bindgen(js_name = setParticleCount)]
    pub fn set_particle_count(&self, count: u32) -> std::result::Result<(), JsValue> {
        config::check_particle_count(count).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.send(UserCommand::SetParticleCount(count))
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmApi)]
pub fn get_wasm_api() -> std::result::Result<WasmApi, JsValue> {
    WASM_API_INSTANCE.get()
        .cloned()
        .ok_or_else(|| JsValue::from_str("WasmApi is not initialized. Call run_web() first."))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmReadyPromise)]
pub fn get_wasm_ready_promise() -> std::result::Result<Promise, JsValue> {
    let (_, receiver) = WASM_READY_FLUME_CHANNEL.get()
        .ok_or_else(|| JsValue::from_str("WASM ready channel not initialized. Call run_web() first."))?;

    let ready_promise = future_to_promise(async move {
        receiver.recv_async().await.map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsValue::NULL)
    });

    Ok(ready_promise)
}
