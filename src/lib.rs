pub mod logging;
pub mod utils;

// MVC architecture
pub mod controller;
pub mod model;
pub mod view;

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::{frame_loop::RESIZE_MARGIN, FrameLoopContext, InputProcessor, InputState, WorldState};
#[cfg(target_arch = "wasm32")]
use model::asset;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, RenderState};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();

    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let (width, height) = surface_size(&window);
    let (document, canvas) = init_canvas(&window, width, height)?;
    setup_app(&window, &document, &canvas, width, height).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
    width: u32,
    height: u32,
) -> Result<(), JsValue> {
    let gpu = GpuContext::new(canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e:?}")))?;

    let world = Rc::new(RefCell::new(WorldState::new(
        gpu.config.width,
        gpu.config.height,
    )));
    let input = Rc::new(RefCell::new(InputState::new()));

    // Kick off the one-time model fetch; the slot stays `Loading` (and the
    // view lock stays dormant) until this resolves.
    {
        let world = world.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = asset::fetch_model(asset::MODEL_MTL_PATH, asset::MODEL_OBJ_PATH).await;
            world.borrow_mut().scene.player_model.resolve(result);
        });
    }

    setup_input_listeners(document, window, input.clone())?;

    let mut render_state = RenderState::new(
        gpu.device.as_ref(),
        gpu.format,
        gpu.config.alpha_mode,
        gpu.config.width,
        gpu.config.height,
        &world.borrow(),
    );

    let mut frame_ctx = FrameLoopContext { world, input };

    // Continuous redraw using requestAnimationFrame
    let raf = RafLoop::new(window.clone(), {
        let window_for_loop = window.clone();
        move || {
            frame_ctx.update(
                gpu.device.as_ref(),
                gpu.queue.as_ref(),
                &window_for_loop,
                &gpu.surface,
                &mut render_state,
            );
            render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface);
        }
    });
    raf.start();

    Ok(())
}

/// Wire the keyboard into `InputState`: press sets, release clears, and
/// losing the page (blur or tab switch) drops everything held.
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    input: Rc<RefCell<InputState>>,
) -> Result<(), JsValue> {
    let processor = InputProcessor::default();

    {
        let input = input.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let key = e.key();
            // Keep arrows and space from scrolling the page
            if processor.is_bound(&key) {
                e.prevent_default();
            }
            input.borrow_mut().key_down(key);
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    {
        let input = input.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            input.borrow_mut().key_up(&e.key());
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    {
        let input = input.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            input.borrow_mut().clear_keys();
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    {
        let input = input.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            input.borrow_mut().clear_keys();
        }) as Box<dyn FnMut(Event)>);
        document
            .add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    Ok(())
}

/// Window-tracking surface size, with the fixed margin shaved off.
#[cfg(target_arch = "wasm32")]
fn surface_size(window: &Window) -> (u32, u32) {
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(600.0);
    (
        (w - RESIZE_MARGIN.0).max(1.0) as u32,
        (h - RESIZE_MARGIN.1).max(1.0) as u32,
    )
}

#[cfg(target_arch = "wasm32")]
fn init_canvas(
    window: &Window,
    width: u32,
    height: u32,
) -> Result<(Document, HtmlCanvasElement), JsValue> {
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el)?;
    Ok((document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// Self-rescheduling requestAnimationFrame driver.
#[cfg(target_arch = "wasm32")]
struct RafLoop {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RafLoop {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            // Re-arm first, then run this frame
            let cb_ref = callback_clone.borrow();
            window
                .request_animation_frame(cb_ref.as_ref().unwrap().as_ref().unchecked_ref())
                .expect("RAF failed");
            drop(cb_ref);

            inner.borrow_mut().as_mut()();
        }) as Box<dyn FnMut()>));

        self.window
            .request_animation_frame(callback.borrow().as_ref().unwrap().as_ref().unchecked_ref())
            .expect("RAF start failed");

        // Leak the closure to keep it alive for the lifetime of the page
        std::mem::forget(callback);
    }
}
