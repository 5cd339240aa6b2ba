use super::super::{Model, Msg};
use super::utils::debounce;
use yew::prelude::*;

pub fn render_preview_area(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(selected) = &model.selected else {
        return html! {};
    };

    let link = ctx.link().clone();

    html! {
        <div id="preview-container">
            <img id="actual-image-preview"
                src={selected.preview_url.to_string()}
                alt={selected.file.name()} />
            <div class="button-container">
                <button
                    id="clear-btn"
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::ClearFile)
                    })}
                >
                    <i class="fa-solid fa-rotate-left"></i>{" Choose Another"}
                </button>
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Analyze)
                    })}
                    disabled={model.loading}
                >
                    { render_analyze_button_content(model) }
                </button>
            </div>
        </div>
    }
}

fn render_analyze_button_content(model: &Model) -> Html {
    if model.loading {
        return html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</> };
    }

    let filename = model
        .selected
        .as_ref()
        .map(|selected| selected.file.name())
        .unwrap_or_else(|| "Image".to_string());

    let display_name = if filename.chars().count() > 20 {
        format!("{}...", filename.chars().take(17).collect::<String>())
    } else {
        filename
    };

    html! { <><i class="fa-solid fa-magnifying-glass"></i>{ format!(" Analyze \"{}\"", display_name) }</> }
}
