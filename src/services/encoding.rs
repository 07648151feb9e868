use crate::models::DEFAULT_ENCODING;

/// Canonicalizes encoding names against what the runtime can decode.
///
/// An empty return value means the encoding is not supported.
pub trait EncodingValidator {
    fn validate_and_normalize(&self, name: &str) -> String;
}

/// Validator backed by the WHATWG encoding labels known to `encoding_rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRsValidator;

impl EncodingValidator for EncodingRsValidator {
    fn validate_and_normalize(&self, name: &str) -> String {
        // Labels that map to the "replacement" encoding decode nothing useful
        encoding_rs::Encoding::for_label_no_replacement(name.trim().as_bytes())
            .map(|encoding| encoding.name().to_string())
            .unwrap_or_default()
    }
}

/// Outcome of resolving a project's configured encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingResolution {
    pub encoding: String,
    /// User-facing warning, present when the configured encoding was replaced.
    pub warning: Option<String>,
}

/// Resolves the project default encoding, falling back to UTF-8.
pub struct EncodingResolver {
    validator: Box<dyn EncodingValidator>,
}

impl EncodingResolver {
    pub fn new(validator: Box<dyn EncodingValidator>) -> Self {
        Self { validator }
    }

    /// Never fails: unsupported encodings become UTF-8 plus a warning.
    pub fn resolve(&self, configured: &str) -> EncodingResolution {
        let encoding = self.validator.validate_and_normalize(configured);
        if !encoding.is_empty() {
            return EncodingResolution {
                encoding,
                warning: None,
            };
        }

        tracing::warn!(
            "Project encoding '{}' is not available, falling back to {}",
            configured,
            DEFAULT_ENCODING
        );
        EncodingResolution {
            encoding: DEFAULT_ENCODING.to_string(),
            warning: Some(format!(
                "Project text encoding '{}' not available (using {}). \
                 You can specify an alternate text encoding via Project Options.",
                configured, DEFAULT_ENCODING
            )),
        }
    }
}

impl Default for EncodingResolver {
    fn default() -> Self {
        Self::new(Box::new(EncodingRsValidator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_canonicalizes_labels() {
        let validator = EncodingRsValidator;
        assert_eq!(validator.validate_and_normalize("utf8"), "UTF-8");
        assert_eq!(validator.validate_and_normalize(" UTF-8 "), "UTF-8");
        assert_eq!(validator.validate_and_normalize("latin1"), "windows-1252");
        assert_eq!(validator.validate_and_normalize("bogus-encoding"), "");
        assert_eq!(validator.validate_and_normalize("iso-2022-kr"), "");
    }

    #[test]
    fn test_supported_encoding_has_no_warning() {
        let resolution = EncodingResolver::default().resolve("UTF-8");
        assert_eq!(resolution.encoding, "UTF-8");
        assert!(resolution.warning.is_none());
    }

    #[test]
    fn test_unsupported_encoding_falls_back() {
        let resolution = EncodingResolver::default().resolve("bogus-encoding");

        assert_eq!(resolution.encoding, "UTF-8");
        let warning = resolution.warning.expect("expected a warning");
        assert!(warning.contains("'bogus-encoding'"));
    }

    #[test]
    fn test_empty_encoding_falls_back() {
        let resolution = EncodingResolver::default().resolve("");
        assert_eq!(resolution.encoding, "UTF-8");
        assert!(resolution.warning.is_some());
    }
}
