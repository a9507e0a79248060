use html2text::from_read;
use tracing::warn;

/// Lines are not re-wrapped; GitHub renders the body itself.
const WRAP_WIDTH: usize = 1000;

/// Convert the HTML fragment JIRA puts in `<description>` to text for an
/// issue body.
///
/// `<pre>` blocks keep their line breaks and indentation. Returns `None`
/// when nothing but whitespace remains.
pub fn html_to_text(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }

    let text = match from_read(html.as_bytes(), WRAP_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "could not convert description, keeping raw HTML");
            html.to_string()
        }
    };

    let text = text.trim_end();
    let text = text.trim_start_matches('\n');
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
