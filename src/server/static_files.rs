// src/server/static_files.rs

use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::{AppState, LIVE_RELOAD_PATH};

/// Map a request path onto a file under `root`.
///
/// Returns `None` for paths that try to leave `root` or are not valid
/// percent-encoded UTF-8.
pub fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;
    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

/// Insert the live-reload client before the last `</body>`, or append it
/// when there is none.
pub fn inject_live_reload(html: &str) -> String {
    let script = format!(
        "<script>(function(){{var p=location.protocol==='https:'?'wss://':'ws://';\
var s=new WebSocket(p+location.host+'{LIVE_RELOAD_PATH}');\
s.onmessage=function(e){{if(e.data==='reload'){{location.reload();}}}};}})();</script>"
    );

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..at]);
            out.push_str(&script);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{script}"),
    }
}

pub(crate) async fn serve_file(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(mut path) = resolve_request_path(&state.root, uri.path()) else {
        return not_found();
    };

    if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
        path.push("index.html");
    }

    // Symlinks must not lead outside the root either.
    match tokio::fs::canonicalize(&path).await {
        Ok(real) if real.starts_with(&state.root) => {}
        _ => return not_found(),
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(err) => {
            debug!(?path, error = %err, "static file not readable");
            return not_found();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let is_html = mime.essence_str() == "text/html";

    if state.live_reload && is_html {
        if let Ok(html) = String::from_utf8(bytes.clone()) {
            return (
                [(header::CONTENT_TYPE, mime.to_string())],
                inject_live_reload(&html),
            )
                .into_response();
        }
    }

    ([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_paths_stay_under_root() {
        let root = Path::new("/srv/dist");
        assert_eq!(
            resolve_request_path(root, "/pages/index.html"),
            Some(PathBuf::from("/srv/dist/pages/index.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/pages/my%20page.html"),
            Some(PathBuf::from("/srv/dist/pages/my page.html"))
        );
        assert_eq!(resolve_request_path(root, "/"), Some(PathBuf::from("/srv/dist")));
        assert_eq!(resolve_request_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_request_path(root, "/a/%2e%2e/%2e%2e/x"), None);
        assert_eq!(resolve_request_path(root, "/bad%ff%fe.html"), None);
        assert_eq!(resolve_request_path(root, "/a%5c..%5cb"), None);
    }

    #[test]
    fn reload_script_lands_before_body_close() {
        let out = inject_live_reload("<html><BODY><p>x</p></BODY></html>");
        let script_at = out.find("<script>").unwrap();
        assert!(script_at < out.find("</BODY>").unwrap());
        assert!(out.contains(LIVE_RELOAD_PATH));

        let bare = inject_live_reload("<p>fragment</p>");
        assert!(bare.starts_with("<p>fragment</p><script>"));
    }
}
