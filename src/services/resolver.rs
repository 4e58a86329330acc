//! Turns opaque request identifiers into remote fetch addresses.
//!
//! Identifiers come in two shapes and callers never say which:
//! - URL-safe base64 (padding optional) of a path under `uploads/`
//! - a literal file name under `ads/`
//!
//! Anything that does not decode to UTF-8 text is taken literally.

use crate::models::source::{Namespace, SourceLocation};
use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use tracing::debug;

const URL_SAFE_ANY_PADDING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    base_url: String,
}

impl IdentifierResolver {
    /// `base_url` is the store prefix every namespace hangs off. A trailing
    /// slash is added if missing.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    pub fn resolve(&self, identifier: &str) -> SourceLocation {
        let (namespace, relative_path) = match decode_identifier(identifier) {
            Some(path) => (Namespace::Uploads, path),
            None => {
                debug!(
                    "identifier `{}` is not base64, using it as a literal path",
                    identifier
                );
                (Namespace::Ads, identifier.to_string())
            }
        };

        let url = format!("{}{}/{}", self.base_url, namespace, relative_path);
        SourceLocation {
            namespace,
            relative_path,
            url,
        }
    }
}

fn decode_identifier(identifier: &str) -> Option<String> {
    let bytes = URL_SAFE_ANY_PADDING.decode(identifier).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://cdn.example.com/media/";

    #[test]
    fn base64_identifier_resolves_under_uploads() {
        let loc = IdentifierResolver::new(BASE).resolve("dGVzdC5qcGc=");
        assert_eq!(loc.namespace, Namespace::Uploads);
        assert_eq!(loc.relative_path, "test.jpg");
        assert_eq!(loc.url, "https://cdn.example.com/media/uploads/test.jpg");
    }

    #[test]
    fn padding_is_optional() {
        let resolver = IdentifierResolver::new(BASE);
        assert_eq!(
            resolver.resolve("dGVzdC5qcGc"),
            resolver.resolve("dGVzdC5qcGc=")
        );
    }

    #[test]
    fn url_safe_alphabet_is_used() {
        let loc = IdentifierResolver::new(BASE).resolve("YS9iPy5wbmc=");
        assert_eq!(loc.relative_path, "a/b?.png");
        assert_eq!(loc.namespace, Namespace::Uploads);

        // "???" is "Pz8/" in the standard alphabet.
        let loc = IdentifierResolver::new(BASE).resolve("Pz8_");
        assert_eq!(loc.relative_path, "???");
    }

    #[test]
    fn non_base64_identifier_falls_back_to_ads() {
        let loc = IdentifierResolver::new(BASE).resolve("summer-banner.jpg");
        assert_eq!(loc.namespace, Namespace::Ads);
        assert_eq!(loc.relative_path, "summer-banner.jpg");
        assert_eq!(
            loc.url,
            "https://cdn.example.com/media/ads/summer-banner.jpg"
        );
    }

    #[test]
    fn non_utf8_payload_falls_back_to_ads() {
        // Valid base64, but decodes to 0xff 0xfe.
        let loc = IdentifierResolver::new(BASE).resolve("__4");
        assert_eq!(loc.namespace, Namespace::Ads);
        assert_eq!(loc.relative_path, "__4");
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let resolver = IdentifierResolver::new("https://cdn.example.com/media");
        assert_eq!(
            resolver.resolve("logo.png").url,
            "https://cdn.example.com/media/ads/logo.png"
        );
    }
}
