//! Contract errors with miette diagnostics
//!
//! Everything in here is fatal for a run: the contract could not be read or
//! the command line asked for something that does not exist. Errors carry
//! source spans and suggestions so the binary can render them nicely.

pub mod suggestions;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Fatal contract and invocation errors
#[derive(Error, Debug, Diagnostic)]
pub enum ContractError {
    /// Contract file not found
    #[error("Contract file not found: {path}")]
    #[diagnostic(
        code(contractfuzz::contract::not_found),
        help("Check that the contract path is correct and the file exists")
    )]
    FileNotFound { path: String },

    /// Contract could not be read
    #[error("Failed to read {path}: {message}")]
    #[diagnostic(code(contractfuzz::io), help("{suggestion}"))]
    Io {
        path: String,
        message: String,
        suggestion: String,
    },

    /// Contract is not valid JSON
    #[error("Failed to parse contract: {message}")]
    #[diagnostic(code(contractfuzz::contract::json))]
    JsonParse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: SourceSpan,
    },

    /// Contract is JSON but not a usable API description
    #[error("Invalid contract: {message}")]
    #[diagnostic(code(contractfuzz::contract::invalid), help("{suggestion}"))]
    InvalidContract { message: String, suggestion: String },

    /// Schema reference that points nowhere
    #[error("Unresolved schema reference: {reference}")]
    #[diagnostic(
        code(contractfuzz::contract::unresolved_ref),
        help("Only local references of the form '#/components/schemas/<Name>' are supported; check that '{reference}' is defined")
    )]
    UnresolvedRef { reference: String },

    /// Target base URL is unusable
    #[error("Invalid server URL '{url}': {message}")]
    #[diagnostic(
        code(contractfuzz::server_url),
        help("Pass an absolute base URL, for example --server http://localhost:8080/api")
    )]
    InvalidBaseUrl { url: String, message: String },

    /// Unknown fuzzer name on the command line
    #[error("Unknown fuzzer: '{name}'")]
    #[diagnostic(code(contractfuzz::unknown_fuzzer), help("{suggestion}"))]
    UnknownFuzzer { name: String, suggestion: String },
}

impl ContractError {
    /// Build a parse error pointing at the offending line and column
    pub fn json_parse(name: &str, source: &str, err: &serde_json::Error) -> Self {
        let offset = offset_of(source, err.line(), err.column());
        let len = usize::from(offset < source.len());

        Self::JsonParse {
            message: err.to_string(),
            src: NamedSource::new(name, source.to_string()),
            span: SourceSpan::from((offset, len)),
        }
    }

    /// Map an IO failure while reading the contract
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound { path };
        }

        let suggestion = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Check file permissions:\n  ls -la {}", path)
            }
            _ => "Check that the path points to a readable file".to_string(),
        };

        Self::Io {
            path,
            message: err.to_string(),
            suggestion,
        }
    }

    /// Contract structure problem
    pub fn invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        let suggestion = if message.contains("paths") {
            "The contract must be an OpenAPI 3 JSON document with a top-level 'paths' object"
                .to_string()
        } else {
            "Validate the contract with an OpenAPI linter and try again".to_string()
        };

        Self::InvalidContract {
            message,
            suggestion,
        }
    }

    /// Unknown fuzzer name with "did you mean" suggestions
    pub fn unknown_fuzzer(name: impl Into<String>, known: &[&str]) -> Self {
        let name = name.into();
        let suggestion = suggestions::suggest_fuzzer(&name, known);
        Self::UnknownFuzzer { name, suggestion }
    }
}

fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

/// Add a contextual hint to an error surfaced at the CLI boundary
pub fn format_error(err: &anyhow::Error) -> String {
    let err_lower = err.to_string().to_lowercase();

    if err_lower.contains("connection") || err_lower.contains("connect") {
        format!(
            "{}\n\nHint: check that the target service is running and reachable at --server",
            err
        )
    } else if err_lower.contains("timeout") || err_lower.contains("timed out") {
        format!(
            "{}\n\nHint: try increasing the per-request timeout with --timeout <ms>",
            err
        )
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_parse_points_at_error() {
        let source = "{\n  \"paths\": {,}\n}";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let diagnostic = ContractError::json_parse("api.json", source, &err);

        if let ContractError::JsonParse { span, .. } = diagnostic {
            assert_eq!(&source[span.offset()..span.offset() + 1], ",");
        } else {
            panic!("Expected JsonParse");
        }
    }

    #[test]
    fn json_parse_at_end_of_input() {
        let source = "{\"paths\": ";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let diagnostic = ContractError::json_parse("api.json", source, &err);

        if let ContractError::JsonParse { span, .. } = diagnostic {
            assert!(span.offset() <= source.len());
        } else {
            panic!("Expected JsonParse");
        }
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            ContractError::io("api.json", &err),
            ContractError::FileNotFound { .. }
        ));
    }

    #[test]
    fn invalid_contract_mentions_paths() {
        let err = ContractError::invalid("missing 'paths' object");
        if let ContractError::InvalidContract { suggestion, .. } = err {
            assert!(suggestion.contains("OpenAPI"));
        } else {
            panic!("Expected InvalidContract");
        }
    }

    #[test]
    fn unknown_fuzzer_generates_suggestion() {
        let err = ContractError::unknown_fuzzer("remove-feilds", &["remove-fields", "new-fields"]);
        if let ContractError::UnknownFuzzer { suggestion, .. } = err {
            assert!(suggestion.contains("remove-fields"));
        } else {
            panic!("Expected UnknownFuzzer");
        }
    }

    #[test]
    fn format_error_adds_hints() {
        let err = anyhow::anyhow!("Connection refused by target");
        assert!(format_error(&err).contains("--server"));

        let plain = anyhow::anyhow!("something else");
        assert_eq!(format_error(&plain), "something else");
    }
}
