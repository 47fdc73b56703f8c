//! GET / serves the single-page chat widget

use axum::response::Html;

const WIDGET_HTML: &str = include_str!("../../static/index.html");

pub async fn index() -> Html<&'static str> {
    crate::metrics::inc_request("/", "200");
    Html(WIDGET_HTML)
}
