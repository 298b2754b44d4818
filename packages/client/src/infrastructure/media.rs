//! Resolution of opaque media references (avatars, question images).
//!
//! A reference is one of: an absolute `http(s)` URL, a `data:` URI, or a
//! path relative to the API base.

use base64::{Engine, engine::general_purpose::STANDARD};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Bytes carried by a `data:` URI
    Inline(Vec<u8>),
    /// URL to fetch
    Remote(String),
}

/// Resolve `reference` against `api_base`.
///
/// Returns `None` for a blank reference, an undecodable `data:` URI, or a
/// relative path when no API base is configured.
pub fn resolve(reference: &str, api_base: &str) -> Option<MediaSource> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if reference.starts_with("data:") {
        return decode_data_uri(reference).map(MediaSource::Inline);
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Some(MediaSource::Remote(reference.to_string()));
    }
    let base = api_base.trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    let url = if reference.starts_with('/') {
        format!("{}{}", base, reference)
    } else {
        format!("{}/{}", base, reference)
    };
    Some(MediaSource::Remote(url))
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let (header, body) = uri.split_once(',')?;
    if header.ends_with(";base64") {
        match STANDARD.decode(body.trim()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("Undecodable data URI: {}", e);
                None
            }
        }
    } else {
        Some(body.as_bytes().to_vec())
    }
}

/// Build a `data:` URI, the form `profile:update` expects for avatars.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Guess an image MIME type from a file name.
pub fn guess_mime(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_is_kept() {
        // テスト項目: 絶対 URL はそのまま使われる
        // given (前提条件):
        let reference = "https://cdn.example.com/q/1.png";

        // when (操作):
        let source = resolve(reference, "http://api.local");

        // then (期待する結果):
        assert_eq!(source, Some(MediaSource::Remote(reference.to_string())));
    }

    #[test]
    fn test_relative_path_is_joined_to_api_base() {
        // テスト項目: 相対パスは API ベースに連結される
        // given (前提条件):
        let base = "http://api.local/";

        // when (操作):
        let rooted = resolve("/uploads/a.png", base);
        let bare = resolve("uploads/a.png", base);

        // then (期待する結果):
        let expected = Some(MediaSource::Remote(
            "http://api.local/uploads/a.png".to_string(),
        ));
        assert_eq!(rooted, expected);
        assert_eq!(bare, expected);
    }

    #[test]
    fn test_relative_path_without_base() {
        // テスト項目: API ベースがない場合の相対パスは解決できない
        // given (前提条件):
        let reference = "uploads/a.png";

        // when (操作):
        let source = resolve(reference, "");

        // then (期待する結果):
        assert!(source.is_none());
    }

    #[test]
    fn test_data_uri_is_decoded_locally() {
        // テスト項目: data URI はローカルでデコードされ、壊れたものは None になる
        // given (前提条件):
        let uri = to_data_uri("image/png", &[1, 2, 3]);

        // when (操作):
        let decoded = resolve(&uri, "");
        let broken = resolve("data:image/png;base64,@@@", "");

        // then (期待する結果):
        assert_eq!(decoded, Some(MediaSource::Inline(vec![1, 2, 3])));
        assert!(broken.is_none());
    }

    #[test]
    fn test_guess_mime() {
        // テスト項目: 拡張子から MIME タイプが推定される
        // given (前提条件):
        let names = ["a.PNG", "b.jpeg", "c.bin", "noext"];

        // when (操作):
        let mimes: Vec<&str> = names.iter().map(|n| guess_mime(n)).collect();

        // then (期待する結果):
        assert_eq!(
            mimes,
            vec!["image/png", "image/jpeg", "application/octet-stream", "application/octet-stream"]
        );
    }
}
