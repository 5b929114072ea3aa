use axum::{
    http::{header, StatusCode, Uri},
    response::IntoResponse,
};
use rust_embed::RustEmbed;

/// Built front-end bundle. The directory may be absent in server-only builds.
#[derive(RustEmbed)]
#[folder = "ui/dist"]
#[allow_missing = true]
struct Asset;

pub struct UIHandler;

impl UIHandler {
    pub async fn serve(uri: Uri) -> impl IntoResponse {
        let path = match uri.path().trim_start_matches('/') {
            "" => "index.html",
            other => other,
        };

        if let Some(content) = Asset::get(path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return ([(header::CONTENT_TYPE, mime.as_ref().to_string())], content.data).into_response();
        }

        // Client-side routes fall back to the app shell.
        match Asset::get("index.html") {
            Some(content) => ([(header::CONTENT_TYPE, "text/html".to_string())], content.data).into_response(),
            None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
        }
    }
}
