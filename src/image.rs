//! Image payload handling
//!
//! The browser sends the photo as a `data:` URI. The payload is decoded once on
//! arrival and re-encoded when forwarded, so the bytes reaching the model are
//! exactly the bytes the user uploaded.

use crate::ai::mime::detect_image_mime;
use crate::{Error, Result};
use base64::Engine as _;

/// Decoded inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Parses `data:<mime>[;param...];base64,<payload>`.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidImage("not a data URI".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidImage("data URI has no payload".to_string()))?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(Error::InvalidImage(
                "data URI is not base64 encoded".to_string(),
            ));
        }
        if !mime_type.starts_with("image/") {
            return Err(Error::InvalidImage(format!(
                "unsupported content type '{}'",
                mime_type
            )));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::InvalidImage(format!("invalid base64 payload: {}", e)))?;

        Ok(Self { mime_type, bytes })
    }

    pub fn to_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }
}

/// Where the model should read the image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Inline(ImageData),
    /// An `http(s)` URL forwarded unchanged.
    Remote(String),
}

impl ImageSource {
    /// Accepts a data URI, an `http(s)` URL, or a bare base64 payload whose
    /// format can be recognised from its magic bytes.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with("data:") {
            return ImageData::from_data_uri(input).map(Self::Inline);
        }
        if input.starts_with("https://") || input.starts_with("http://") {
            return Ok(Self::Remote(input.to_string()));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(input)
            .map_err(|_| {
                Error::InvalidImage("expected a data URI, URL, or base64 payload".to_string())
            })?;
        let mime_type = detect_image_mime(&bytes)
            .ok_or_else(|| Error::InvalidImage("unrecognized image format".to_string()))?;
        Ok(Self::Inline(ImageData::new(mime_type, bytes)))
    }

    /// URL placed in the `image_url` content part.
    pub fn url(&self) -> String {
        match self {
            Self::Inline(data) => data.to_data_uri(),
            Self::Remote(url) => url.clone(),
        }
    }

    pub fn byte_len(&self) -> Option<usize> {
        match self {
            Self::Inline(data) => Some(data.bytes.len()),
            Self::Remote(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_data_uri_preserves_bytes() {
        let original: Vec<u8> = (0..=255u8).chain(PNG_HEADER).collect();
        let uri = ImageData::new("image/png", original.clone()).to_data_uri();

        let parsed = ImageData::from_data_uri(&uri).unwrap();
        assert_eq!(parsed.bytes, original);
        assert_eq!(parsed.mime_type, "image/png");
        assert_eq!(parsed.to_data_uri(), uri);
    }

    #[test]
    fn test_data_uri_with_extra_params() {
        let parsed = ImageData::from_data_uri("data:image/jpeg;name=leaf.jpg;base64,/9j/").unwrap();
        assert_eq!(parsed.mime_type, "image/jpeg");
        assert_eq!(parsed.bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_data_uri_rejects_non_image() {
        let err = ImageData::from_data_uri("data:text/plain;base64,aGVsbG8=").unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn test_data_uri_rejects_bad_base64() {
        let err = ImageData::from_data_uri("data:image/png;base64,!!!").unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));

        let err = ImageData::from_data_uri("data:image/png,rawbytes").unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn test_source_forwards_urls() {
        let source = ImageSource::parse("https://example.com/leaf.jpg").unwrap();
        assert_eq!(source, ImageSource::Remote("https://example.com/leaf.jpg".to_string()));
        assert_eq!(source.url(), "https://example.com/leaf.jpg");
        assert_eq!(source.byte_len(), None);
    }

    #[test]
    fn test_source_sniffs_bare_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(PNG_HEADER);
        let source = ImageSource::parse(&encoded).unwrap();
        assert_eq!(
            source,
            ImageSource::Inline(ImageData::new("image/png", PNG_HEADER.to_vec()))
        );
        assert!(source.url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_source_rejects_garbage() {
        assert!(ImageSource::parse("not an image").is_err());
        assert!(ImageSource::parse("AAAA").is_err());
    }
}
