//! Image payloads carried through the work queue.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use super::errors::CoreError;

/// Where the input image comes from.
///
/// Inline images are decoded at admission so that malformed input is rejected
/// before a task exists. Remote images are fetched by the worker.
#[derive(Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Inline(Vec<u8>),
    Remote(String),
}

impl ImagePayload {
    /// Parse a `data:<mime>;base64,<data>` URL. A bare base64 string is accepted too.
    pub fn from_data_url(data: &str) -> Result<Self, CoreError> {
        let encoded = match data.split_once(',') {
            Some((header, encoded)) => {
                if !header.starts_with("data:") {
                    return Err(CoreError::InvalidInput(format!(
                        "unexpected data url header: {header}"
                    )));
                }
                encoded
            }
            None => data,
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CoreError::InvalidInput(format!("invalid base64 image data: {e}")))?;
        if bytes.is_empty() {
            return Err(CoreError::InvalidInput("empty image data".to_string()));
        }
        Ok(ImagePayload::Inline(bytes))
    }

    /// Accept only absolute http(s) URLs with a host.
    pub fn from_url(url: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidInput("Invalid URL format".to_string());
        let parsed = Url::parse(url.trim()).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid());
        }
        Ok(ImagePayload::Remote(parsed.into()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImagePayload::Inline(_) => "inline",
            ImagePayload::Remote(_) => "remote",
        }
    }
}

// Inline payloads can be megabytes; keep them out of logs.
impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImagePayload::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            ImagePayload::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn data_url_is_decoded() {
        let encoded = STANDARD.encode([1u8, 2, 3]);
        let payload = ImagePayload::from_data_url(&format!("data:image/png;base64,{encoded}"))
            .unwrap();
        assert_eq!(payload, ImagePayload::Inline(vec![1, 2, 3]));
    }

    #[test]
    fn bare_base64_is_accepted() {
        let encoded = STANDARD.encode(b"abc");
        let payload = ImagePayload::from_data_url(&encoded).unwrap();
        assert_eq!(payload, ImagePayload::Inline(b"abc".to_vec()));
    }

    #[rstest]
    #[case::bad_base64("data:image/png;base64,@@@")]
    #[case::empty("data:image/png;base64,")]
    #[case::wrong_header("image/png;base64,AAAA")]
    fn bad_data_urls_are_invalid_input(#[case] input: &str) {
        let err = ImagePayload::from_data_url(input).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[rstest]
    #[case("http://example.com/a.png")]
    #[case("https://example.com/a.png")]
    fn http_urls_are_accepted(#[case] url: &str) {
        assert_eq!(
            ImagePayload::from_url(url).unwrap(),
            ImagePayload::Remote(url.to_string())
        );
    }

    #[rstest]
    #[case("ftp://example.com/a.png")]
    #[case("example.com/a.png")]
    #[case("https://")]
    #[case::space_in_host("http://exa mple.com/a.png")]
    #[case::unclosed_ipv6("http://[::1/a.png")]
    #[case::port_without_host("https://:80")]
    fn other_urls_are_rejected(#[case] url: &str) {
        assert!(matches!(
            ImagePayload::from_url(url),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn debug_hides_inline_bytes() {
        let payload = ImagePayload::Inline(vec![0; 4096]);
        assert_eq!(format!("{payload:?}"), "Inline(4096 bytes)");
    }
}
