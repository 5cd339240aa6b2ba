mod api;
mod components;

use components::handlers;
use components::header::render_header;
use components::preview_area::render_preview_area;
use components::results::render_results;
use components::upload_section::render_upload_section;
use components::utils::render_error_message;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::PredictionResponse;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

pub struct SelectedFile {
    pub file: GlooFile,
    pub preview_url: ObjectUrl,
}

pub enum Msg {
    // File operations
    FileChosen(GlooFile),
    ClearFile,

    // Analysis
    Analyze,
    PredictionReceived(PredictionResponse),
    HealthChecked(Option<bool>),

    // UI states
    SetError(Option<String>),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

pub struct Model {
    pub selected: Option<SelectedFile>,
    pub result: Option<PredictionResponse>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_dragging: bool,
    /// `None` until the first health check answers.
    pub model_loaded: Option<bool>,
    paste_listener: Option<EventListener>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let paste_listener = web_sys::window().map(|window| {
            let link = ctx.link().clone();
            EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            })
        });

        let link = ctx.link().clone();
        spawn_local(async move {
            match api::fetch_health().await {
                Ok(health) => link.send_message(Msg::HealthChecked(Some(health.model_loaded))),
                Err(e) => {
                    log::warn!("Health check failed: {}", e);
                    link.send_message(Msg::HealthChecked(None));
                }
            }
        });

        Self {
            selected: None,
            result: None,
            loading: false,
            error: None,
            is_dragging: false,
            model_loaded: None,
            paste_listener,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileChosen(file) => handlers::handle_file_chosen(self, file),
            Msg::ClearFile => handlers::handle_clear_file(self),

            Msg::Analyze => handlers::handle_analyze(self, ctx),
            Msg::PredictionReceived(response) => {
                self.loading = false;
                self.error = None;
                self.result = Some(response);
                true
            }
            Msg::HealthChecked(model_loaded) => {
                self.model_loaded = model_loaded;
                true
            }

            Msg::SetError(error) => {
                self.error = error;
                self.loading = false;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header(self.model_loaded) }

                <main class="main-content">
                { render_upload_section(self, ctx) }
                { render_preview_area(self, ctx) }
                { render_error_message(self) }
                { render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Deepfake Detection | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.paste_listener.take();
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
