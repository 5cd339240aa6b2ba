use super::super::api;
use super::super::{Model, Msg, SelectedFile};
use super::utils::{first_file, validate_upload};
use gloo_file::{File as GlooFile, ObjectUrl};
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

pub fn handle_file_chosen(model: &mut Model, file: GlooFile) -> bool {
    if let Err(message) = validate_upload(&file.raw_mime_type(), file.size()) {
        log::warn!("Rejected {}: {}", file.name(), message);
        model.error = Some(message);
        return true;
    }

    let preview_url = ObjectUrl::from(file.clone());
    model.selected = Some(SelectedFile { file, preview_url });
    model.result = None;
    model.error = None;
    true
}

pub fn handle_clear_file(model: &mut Model) -> bool {
    model.selected = None;
    model.result = None;
    model.error = None;
    model.loading = false;
    true
}

pub fn handle_analyze(model: &mut Model, ctx: &Context<Model>) -> bool {
    let Some(file) = model.selected.as_ref().map(|selected| selected.file.clone()) else {
        model.error = Some("Please select an image first".to_string());
        return true;
    };

    model.loading = true;
    model.error = None;
    model.result = None;

    let link = ctx.link().clone();
    spawn_local(async move {
        match api::predict(&file).await {
            Ok(response) => link.send_message(Msg::PredictionReceived(response)),
            Err(message) => {
                log::error!("Analysis failed: {}", message);
                link.send_message(Msg::SetError(Some(message)));
            }
        }
    });
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(file) = event
        .data_transfer()
        .and_then(|data_transfer| data_transfer.files())
        .and_then(|files| first_file(&files))
    {
        ctx.link().send_message(Msg::FileChosen(file));
    }
    true
}

pub fn handle_paste(ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(file) = event
        .clipboard_data()
        .and_then(|data_transfer| data_transfer.files())
        .and_then(|files| first_file(&files))
    {
        event.prevent_default();
        ctx.link().send_message(Msg::FileChosen(file));
    }
    false
}
