use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TEMPLATE: &str = "[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}";

pub fn progress_style() -> Option<ProgressStyle> {
    ProgressStyle::with_template(TEMPLATE)
        .ok()
        .map(|style| style.progress_chars("##-"))
}

/// Attaches a progress bar of `len` steps to `span`. The bar is drawn by
/// the indicatif layer while the span is entered; without that layer
/// installed this is a no-op.
pub fn track_span(span: &Span, len: u64, msg: &str) {
    if let Some(style) = progress_style() {
        span.pb_set_style(&style);
    }
    span.pb_set_length(len);
    span.pb_set_message(msg);
}
