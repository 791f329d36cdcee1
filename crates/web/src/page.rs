//! HTML rendering for the single-page form.

use crate::session::SessionState;
use html_escape::{encode_double_quoted_attribute, encode_text};
use pptscript_core::SUPPORTED_MODELS;

const STYLE: &str = r#"
body { margin: 0; font-family: "Source Sans Pro", sans-serif; background-color: #f5f7fa; }
h1, h2, h3 { color: #1f77b4; }
.layout { display: flex; min-height: 100vh; }
.sidebar { width: 20rem; padding: 1.5rem; background: #f0f2f6; }
.block-container { flex: 1; padding: 1.5rem 2rem; }
textarea { width: 100%; background-color: #ffffff; border: 1px solid #ddd; border-radius: 5px; padding: 0.5rem; }
.button { background-color: #4CAF50; color: white; padding: 0.5rem 1rem; font-size: 1rem; border: none; border-radius: 8px; cursor: pointer; }
.download { background-color: #008CBA; color: white; padding: 0.5rem 1rem; font-size: 1rem; border-radius: 8px; text-decoration: none; display: inline-block; }
.error { background: #ffe9e9; color: #7d1a1a; padding: 0.75rem 1rem; border-radius: 5px; }
.warning { background: #fffbe6; color: #6b5900; padding: 0.75rem 1rem; border-radius: 5px; }
.info { background: #e8f4fd; color: #0b4a6f; padding: 0.75rem 1rem; border-radius: 5px; }
"#;

/// Everything needed to draw the page once.
pub struct PageView<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub upload_name: Option<&'a str>,
    pub context: Option<&'a str>,
    pub script: Option<&'a str>,
    pub generating: bool,
    pub banner: Option<String>,
}

impl<'a> PageView<'a> {
    /// Snapshot a session. The banner is passed separately since showing it
    /// consumes it.
    pub fn from_session(session: &'a SessionState, banner: Option<String>) -> Self {
        Self {
            model: &session.config().model_name,
            temperature: session.config().temperature,
            upload_name: session.upload().map(|u| u.name()),
            context: session.context(),
            script: session.script(),
            generating: session.is_generating(),
            banner,
        }
    }
}

fn model_options(selected: &str) -> String {
    SUPPORTED_MODELS
        .iter()
        .map(|model| {
            let marker = if *model == selected { " selected" } else { "" };
            format!(
                r#"<option value="{value}"{marker}>{label}</option>"#,
                value = encode_double_quoted_attribute(model),
                marker = marker,
                label = encode_text(model)
            )
        })
        .collect()
}

fn sidebar(view: &PageView) -> String {
    let uploaded = match view.upload_name {
        Some(name) => format!("<p>Uploaded: <strong>{}</strong></p>", encode_text(name)),
        None => String::new(),
    };
    format!(
        r#"<aside class="sidebar">
<form method="post" action="/upload" enctype="multipart/form-data">
  <label for="file">Upload Your PowerPoint File (.pptx)</label><br>
  <input type="file" id="file" name="file" accept=".pptx" required>
  <button class="button" type="submit">Upload</button>
</form>
{uploaded}
<details>
  <summary>AI Model Settings</summary>
  <form method="post" action="/settings">
    <label for="model">Select AI Model</label><br>
    <select id="model" name="model">{options}</select><br>
    <label for="temperature">Set Model Creativity (Temperature)</label><br>
    <input type="range" id="temperature" name="temperature" min="0" max="1" step="0.01" value="{temperature}"
      oninput="this.nextElementSibling.value = this.value">
    <output>{temperature}</output><br>
    <button class="button" type="submit">Apply</button>
  </form>
</details>
<hr>
</aside>"#,
        uploaded = uploaded,
        options = model_options(view.model),
        temperature = view.temperature
    )
}

fn main_panel(view: &PageView) -> String {
    let mut body = String::new();
    body.push_str("<h1>🤖 AI-Powered PowerPoint Script Generator</h1>\n");
    body.push_str("<p>Upload your PowerPoint file and generate an engaging script for the slides!</p>\n");

    if let Some(banner) = &view.banner {
        body.push_str(&format!(r#"<div class="error">{}</div>"#, encode_text(banner)));
        body.push('\n');
    }

    if view.upload_name.is_none() {
        body.push_str(r#"<div class="warning">Please upload a PowerPoint file to start!</div>"#);
        return body;
    }

    body.push_str(
        r#"<form method="post" action="/generate"><button class="button" type="submit">Generate Script</button></form>"#,
    );
    body.push('\n');

    if view.generating {
        body.push_str(r#"<div class="info">Generating script... refresh to check progress.</div>"#);
        body.push('\n');
    }

    if let Some(context) = view.context {
        body.push_str("<h2>📖 Extracted Slide Content</h2>\n");
        body.push_str(&format!(
            r#"<label>Slide Content (Context)</label><textarea readonly rows="15">{}</textarea>"#,
            encode_text(context)
        ));
        body.push('\n');
    }

    if let Some(script) = view.script {
        body.push_str("<h2>🎬 Generated Script</h2>\n");
        body.push_str(&format!(
            r#"<label>Generated Script</label><textarea readonly rows="20">{}</textarea>"#,
            encode_text(script)
        ));
        body.push_str("\n<p><a class=\"download\" href=\"/download\">📥 Download Script</a></p>\n");
    }

    body
}

/// Render the full page.
pub fn render(view: &PageView) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AI-Powered PPT Script Generator</title>
<style>{style}</style>
</head>
<body>
<div class="layout">
{sidebar}
<main class="block-container">
{main}
</main>
</div>
</body>
</html>
"#,
        style = STYLE,
        sidebar = sidebar(view),
        main = main_panel(view)
    )
}
