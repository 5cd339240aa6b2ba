use yew::prelude::*;

/// Renders the application header, with a warning once the server says no model is loaded.
pub fn render_header(model_loaded: Option<bool>) -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-user-secret"></i> {" Deepfake Detection"}</h1>
            <p class="subtitle">{"Upload a face image to check whether it is real or generated"}</p>
            {
                if model_loaded == Some(false) {
                    html! {
                        <p class="model-warning">
                            <i class="fa-solid fa-triangle-exclamation"></i>
                            {" No model is loaded on the server. Predictions will fail until it is restarted with a model."}
                        </p>
                    }
                } else {
                    html! {}
                }
            }
        </header>
    }
}
