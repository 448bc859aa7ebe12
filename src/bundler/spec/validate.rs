//! Build-request validation.
//!
//! Normalizes a raw [`BuildRequest`] into a canonical [`PackageSpec`] or
//! rejects it with a [`ValidationError`] naming the offending field. No
//! encoding work happens before this step succeeds, and validation itself
//! has no side effects.

use super::{BuildRequest, PackageSpec, Rgb, VersionHistory};
use crate::bundler::error::ValidationError;
use url::Url;

/// Longest accepted display name, in characters after trimming.
const MAX_APP_NAME_CHARS: usize = 50;

/// Longest accepted package identifier, in bytes.
const MAX_PACKAGE_ID_LEN: usize = 120;

/// Segment names the target platform reserves; a package identifier may not
/// use them even when they satisfy the grammar.
const RESERVED_SEGMENTS: &[&str] = &["class", "interface", "new", "package", "super", "this"];

/// Validates a build request against the identifier grammar, color and URL
/// rules, and the monotonic version-code invariant recorded in `history`.
pub fn validate(
    request: &BuildRequest,
    history: &dyn VersionHistory,
) -> Result<PackageSpec, ValidationError> {
    let app_name = request.app_name.trim();
    if app_name.is_empty() {
        return Err(ValidationError::new("app_name", "must not be empty"));
    }
    if app_name.chars().count() > MAX_APP_NAME_CHARS {
        return Err(ValidationError::new(
            "app_name",
            format!("must be at most {MAX_APP_NAME_CHARS} characters"),
        ));
    }

    validate_package_id(&request.package_id)?;

    let version_name = request.version_name.trim();
    if version_name.is_empty() {
        return Err(ValidationError::new("version_name", "must not be empty"));
    }

    if request.version_code == 0 {
        return Err(ValidationError::new("version_code", "must be at least 1"));
    }
    if let Some(last) = history.last_version_code(&request.package_id) {
        if request.version_code <= last {
            return Err(ValidationError::new(
                "version_code",
                format!("must increase: last published code is {last}"),
            ));
        }
    }

    let primary_color = parse_color("primary_color", &request.primary_color)?;
    let secondary_color = parse_color("secondary_color", &request.secondary_color)?;
    let api_base_url = parse_base_url(&request.api_base_url)?;

    if request.store_id.trim().is_empty() {
        return Err(ValidationError::new("store_id", "must not be empty"));
    }

    Ok(PackageSpec::new(
        app_name.to_string(),
        request.package_id.clone(),
        version_name.to_string(),
        request.version_code,
        primary_color,
        secondary_color,
        api_base_url,
        request.store_id.trim().to_string(),
        request.store_name.trim().to_string(),
    ))
}

/// Checks the reverse-DNS identifier grammar: at least two dot-separated
/// segments, each starting with a lowercase letter followed by lowercase
/// letters, digits, or underscores.
fn validate_package_id(package_id: &str) -> Result<(), ValidationError> {
    if package_id.is_empty() {
        return Err(ValidationError::new("package_id", "must not be empty"));
    }
    if package_id.len() > MAX_PACKAGE_ID_LEN {
        return Err(ValidationError::new(
            "package_id",
            format!("must be at most {MAX_PACKAGE_ID_LEN} bytes"),
        ));
    }

    let segments: Vec<&str> = package_id.split('.').collect();
    if segments.len() < 2 {
        return Err(ValidationError::new(
            "package_id",
            "must contain at least two dot-separated segments",
        ));
    }

    for segment in segments {
        let mut chars = segment.chars();
        let valid_head = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        let valid_tail =
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_head || !valid_tail {
            return Err(ValidationError::new(
                "package_id",
                format!(
                    "segment {segment:?} must start with a lowercase letter and \
                     contain only lowercase letters, digits, or underscores"
                ),
            ));
        }
        if RESERVED_SEGMENTS.contains(&segment) {
            return Err(ValidationError::new(
                "package_id",
                format!("segment {segment:?} is a reserved word"),
            ));
        }
    }

    Ok(())
}

/// Parses a `#RRGGBB` hex triplet.
fn parse_color(field: &'static str, value: &str) -> Result<Rgb, ValidationError> {
    let hex = value
        .strip_prefix('#')
        .ok_or_else(|| ValidationError::new(field, "must start with '#'"))?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new(
            field,
            format!("{value:?} is not a #RRGGBB hex triplet"),
        ));
    }

    // Length and digit checks above make these infallible.
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or_default();
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or_default();
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or_default();
    Ok(Rgb { r, g, b })
}

/// Parses an absolute HTTP or HTTPS URL with a host.
fn parse_base_url(value: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(value)
        .map_err(|e| ValidationError::new("api_base_url", format!("{value:?}: {e}")))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ValidationError::new(
            "api_base_url",
            format!("scheme {:?} is not http or https", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::new("api_base_url", "must have a host"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::spec::InMemoryHistory;

    fn request() -> BuildRequest {
        BuildRequest {
            app_name: "My Store".to_string(),
            package_id: "com.acme.shop".to_string(),
            version_name: "1.0.0".to_string(),
            version_code: 1,
            primary_color: "#3366FF".to_string(),
            secondary_color: "#FF9900".to_string(),
            api_base_url: "https://shop.acme.example/app".to_string(),
            store_id: "store-42".to_string(),
            store_name: "Acme".to_string(),
        }
    }

    #[test]
    fn accepts_valid_request() {
        let spec = validate(&request(), &InMemoryHistory::new()).expect("valid");
        assert_eq!(spec.package_id(), "com.acme.shop");
        assert_eq!(spec.primary_color(), Rgb { r: 0x33, g: 0x66, b: 0xFF });
        assert_eq!(spec.activity_class(), "com.acme.shop.StoreActivity");
    }

    #[test]
    fn rejects_bad_identifier_grammar() {
        for bad in ["My Store App", "Com.acme.shop", "com.9acme.shop", "shop", "com..shop"] {
            let mut r = request();
            r.package_id = bad.to_string();
            let err = validate(&r, &InMemoryHistory::new()).expect_err(bad);
            assert_eq!(err.field, "package_id", "{bad}");
        }
    }

    #[test]
    fn rejects_reserved_segment() {
        let mut r = request();
        r.package_id = "com.new.shop".to_string();
        let err = validate(&r, &InMemoryHistory::new()).expect_err("reserved");
        assert_eq!(err.field, "package_id");
    }

    #[test]
    fn rejects_non_monotonic_version_code() {
        let history = InMemoryHistory::new();
        history.record("com.acme.shop", 5);

        let mut r = request();
        r.version_code = 5;
        let err = validate(&r, &history).expect_err("stale code");
        assert_eq!(err.field, "version_code");
        assert!(err.reason.contains("must increase"));

        r.version_code = 6;
        assert!(validate(&r, &history).is_ok());
    }

    #[test]
    fn rejects_bad_colors_and_urls() {
        let mut r = request();
        r.primary_color = "3366FF".to_string();
        assert_eq!(
            validate(&r, &InMemoryHistory::new()).expect_err("no hash").field,
            "primary_color"
        );

        let mut r = request();
        r.secondary_color = "#GGHHII".to_string();
        assert_eq!(
            validate(&r, &InMemoryHistory::new()).expect_err("not hex").field,
            "secondary_color"
        );

        let mut r = request();
        r.api_base_url = "ftp://shop.acme.example".to_string();
        assert_eq!(
            validate(&r, &InMemoryHistory::new()).expect_err("scheme").field,
            "api_base_url"
        );

        let mut r = request();
        r.api_base_url = "/relative/path".to_string();
        assert_eq!(
            validate(&r, &InMemoryHistory::new()).expect_err("relative").field,
            "api_base_url"
        );
    }

    #[test]
    fn trims_and_bounds_app_name() {
        let mut r = request();
        r.app_name = "   ".to_string();
        assert_eq!(
            validate(&r, &InMemoryHistory::new()).expect_err("blank").field,
            "app_name"
        );

        let mut r = request();
        r.app_name = "x".repeat(MAX_APP_NAME_CHARS + 1);
        assert_eq!(
            validate(&r, &InMemoryHistory::new()).expect_err("too long").field,
            "app_name"
        );

        let mut r = request();
        r.app_name = "  Trimmed  ".to_string();
        let spec = validate(&r, &InMemoryHistory::new()).expect("valid");
        assert_eq!(spec.app_name(), "Trimmed");
    }
}
