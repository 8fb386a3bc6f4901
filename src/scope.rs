//! Substitution scope built from request parameters.

use crate::error::{InitializerError, Result};
use lazy_regex::regex_is_match;
use std::collections::HashMap;

/// Placeholder name to substitution value.
pub type Scope = HashMap<String, String>;

/// Address used when the caller gives none.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Addresses with this suffix are cloud clusters and always use TLS.
pub const CLOUD_ADDRESS_SUFFIX: &str = ".cloud.couchbase.com";

const DEFAULTS: &[(&str, &str)] = &[
    ("address", DEFAULT_ADDRESS),
    ("package", "com.example.demo"),
    ("packageSeparator", "."),
    ("username", "Administrator"),
    ("password", "password"),
    ("sdkVersion", "3.2.5"),
    ("group", "com.example"),
    ("artifact", "demo"),
    ("javaVersion", "11"),
    ("name", "demo"),
    ("description", "It's a demo project!"),
];

/// Connection string for `address`.
///
/// TLS is used when `tls` is `"true"` or the address is a cloud host.
pub fn connection_string(address: &str, tls: Option<&str>) -> String {
    let tls = tls == Some("true") || address.ends_with(CLOUD_ADDRESS_SUFFIX);
    let scheme = if tls { "couchbases" } else { "couchbase" };
    format!("{}://{}", scheme, address)
}

/// Overlay the caller's parameters on the built-in defaults.
///
/// `connectionString` is derived from `address` and `tls` unless the caller
/// supplies one.
pub fn build_scope(params: &HashMap<String, String>) -> Scope {
    let address = params
        .get("address")
        .map(String::as_str)
        .unwrap_or(DEFAULT_ADDRESS);
    let tls = params.get("tls").map(String::as_str);

    let mut scope: Scope = DEFAULTS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    scope.insert(
        "connectionString".to_string(),
        connection_string(address, tls),
    );
    scope.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
    scope
}

/// Directory form of the scope's package, e.g. `org/acme/app` for `org.acme.app`.
///
/// Every segment must be a Java identifier, so the result is always a safe
/// relative path.
pub fn package_path(scope: &Scope) -> Result<String> {
    let separator = scope
        .get("packageSeparator")
        .map(String::as_str)
        .unwrap_or(".");
    if separator.is_empty() {
        return Err(InitializerError::invalid_parameter(
            "packageSeparator",
            "must not be empty",
        ));
    }

    let package = scope.get("package").map(String::as_str).unwrap_or_default();
    let path = package.replace(separator, "/");

    if path.is_empty() {
        return Err(InitializerError::invalid_parameter(
            "package",
            "must not be empty",
        ));
    }
    for segment in path.split('/') {
        if !regex_is_match!(r"^[A-Za-z_$][A-Za-z0-9_$]*$", segment) {
            return Err(InitializerError::invalid_parameter(
                "package",
                format!("{:?} is not a valid package segment", segment),
            ));
        }
    }

    Ok(path)
}
