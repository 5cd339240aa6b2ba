use super::super::Model;
use shared::Label;
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    let Some(result) = &model.result else {
        return html! {};
    };

    let is_fake = result.prediction == Label::Fake;
    let verdict_class = if is_fake { "fake" } else { "real" };

    html! {
        <div class={classes!("results-container", verdict_class)}>
            <div class="result-header">
                <h2 class={classes!("result-badge", verdict_class)}>
                    {
                        if is_fake {
                            html! { <><i class="fa-solid fa-circle-xmark"></i>{" Fake"}</> }
                        } else {
                            html! { <><i class="fa-solid fa-circle-check"></i>{" Real"}</> }
                        }
                    }
                </h2>
                <div class="confidence-meter">
                    <div class="meter-label">{"Confidence:"}</div>
                    <div class="meter">
                        <div class={classes!("meter-fill", verdict_class)}
                            style={format!("width: {}%", result.confidence)}></div>
                    </div>
                    <div class="meter-value">{format!("{:.1}%", result.confidence)}</div>
                </div>
            </div>
            <div class="detailed-results">
                <h3>{"Detailed Analysis"}</h3>
                <div class="result-bars">
                    { render_bar("Real", result.details.real_probability) }
                    { render_bar("Fake", result.details.fake_probability) }
                </div>
                <p class="raw-score">{format!("Raw score: {:.4}", result.raw_score)}</p>
            </div>
        </div>
    }
}

fn render_bar(label: &str, percentage: f64) -> Html {
    html! {
        <div class="result-item">
            <div class="result-label">{ label.to_string() }</div>
            <div class="result-bar-container">
                <div class="result-bar" style={format!("width: {}%", percentage)}></div>
            </div>
            <div class="result-value">{ format!("{:.1}%", percentage) }</div>
        </div>
    }
}
