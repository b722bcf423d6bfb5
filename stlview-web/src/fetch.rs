/// HTTP model loading through the Fetch API
use gloo_net::http::Request;
use stlview_core::{decode_mesh, LoadError, LoadProgress, Mesh};
use tracing::debug;

/// Parse a `Content-Length` header value.
pub fn content_length(header: Option<String>) -> Option<u64> {
    header.and_then(|value| value.trim().parse().ok())
}

pub async fn fetch_mesh<F>(url: &str, on_progress: F) -> Result<Mesh, LoadError>
where
    F: Fn(LoadProgress),
{
    let fetch_error = |e: gloo_net::Error| LoadError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let response = Request::get(url).send().await.map_err(fetch_error)?;
    if !response.ok() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let total = content_length(response.headers().get("content-length"));
    on_progress(LoadProgress { loaded: 0, total });

    let bytes = response.binary().await.map_err(fetch_error)?;
    on_progress(LoadProgress {
        loaded: bytes.len() as u64,
        total: total.or(Some(bytes.len() as u64)),
    });
    debug!(url, bytes = bytes.len(), "fetched model");

    decode_mesh(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_length() {
        assert_eq!(content_length(Some("1234".to_string())), Some(1234));
        assert_eq!(content_length(Some(" 84 ".to_string())), Some(84));
        assert_eq!(content_length(Some("abc".to_string())), None);
        assert_eq!(content_length(None), None);
    }
}
