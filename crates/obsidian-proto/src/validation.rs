//! Field validation for service registration.

use url::Url;

use crate::error::ProtoError;

/// Maximum length of a service name.
pub const MAX_NAME_LEN: usize = 128;

/// Maximum length of a service key.
pub const MAX_SERVICE_ID_LEN: usize = 64;

/// Validate a service display name.
///
/// # Errors
///
/// Returns [`ProtoError::Validation`] if the name is blank or too long.
pub fn validate_name(name: &str) -> Result<(), ProtoError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProtoError::Validation("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ProtoError::Validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a service key.
///
/// Keys appear as REST path segments, so whitespace and `/` are rejected.
///
/// # Errors
///
/// Returns [`ProtoError::Validation`] if the key is blank, too long or contains
/// a forbidden character.
pub fn validate_service_id(service_id: &str) -> Result<(), ProtoError> {
    if service_id.trim().is_empty() {
        return Err(ProtoError::Validation("serviceId is required".to_string()));
    }
    if service_id.len() > MAX_SERVICE_ID_LEN {
        return Err(ProtoError::Validation(format!(
            "serviceId must be at most {MAX_SERVICE_ID_LEN} bytes"
        )));
    }
    if let Some(bad) = service_id
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
    {
        return Err(ProtoError::Validation(format!(
            "serviceId must not contain {bad:?}"
        )));
    }
    Ok(())
}

/// Validate a service target URL: absolute, with an `http` or `https` scheme.
///
/// # Errors
///
/// Returns [`ProtoError::Validation`] if the URL does not parse or uses
/// another scheme.
pub fn validate_target_url(target_url: &str) -> Result<(), ProtoError> {
    if target_url.trim().is_empty() {
        return Err(ProtoError::Validation("targetUrl is required".to_string()));
    }
    let url = Url::parse(target_url.trim())
        .map_err(|e| ProtoError::Validation(format!("targetUrl is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(ProtoError::Validation(
            "targetUrl must include a host".to_string(),
        )),
        other => Err(ProtoError::Validation(format!(
            "targetUrl scheme must be http or https, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Payment Service" ; "plain")]
    #[test_case("  padded  " ; "padded")]
    fn valid_names(name: &str) {
        assert!(validate_name(name).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    fn invalid_names(name: &str) {
        assert!(matches!(validate_name(name), Err(ProtoError::Validation(_))));
    }

    #[test]
    fn name_too_long() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name(&name).is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test_case("payment-service" ; "kebab")]
    #[test_case("orders_v2" ; "snake")]
    #[test_case("svc.eu-1" ; "dotted")]
    fn valid_service_ids(service_id: &str) {
        assert!(validate_service_id(service_id).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("payment service" ; "space")]
    #[test_case("payment/v1" ; "slash")]
    #[test_case("a?b" ; "query")]
    #[test_case("a#b" ; "fragment")]
    fn invalid_service_ids(service_id: &str) {
        assert!(validate_service_id(service_id).is_err());
    }

    #[test_case("http://payments:8080" ; "http with port")]
    #[test_case("https://api.example.com/v1" ; "https with path")]
    fn valid_target_urls(target_url: &str) {
        assert!(validate_target_url(target_url).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("payments:8080" ; "no scheme")]
    #[test_case("ftp://files.example.com" ; "wrong scheme")]
    #[test_case("/relative/path" ; "relative")]
    fn invalid_target_urls(target_url: &str) {
        assert!(validate_target_url(target_url).is_err());
    }
}
