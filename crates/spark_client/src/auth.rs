//! Connection URL signing.
//!
//! The service authenticates the websocket handshake through query
//! parameters: an HMAC-SHA256 signature over a canonical
//! `host`/`date`/`request-line` string, keyed by the API secret, wrapped in
//! a base64-encoded authorization header value. The clock is injected so
//! signing is deterministic under test.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use spark_core::Credentials;
use url::Url;

use crate::error::SparkError;

type HmacSha256 = Hmac<Sha256>;

/// Build the signed connection URL for one handshake.
///
/// `authorization`, `date` and `host` are appended as query parameters onto
/// `service_url`. Byte-identical output for identical inputs.
pub fn sign_url(
    credentials: &Credentials,
    service_url: &str,
    now: DateTime<Utc>,
) -> Result<String, SparkError> {
    let mut url =
        Url::parse(service_url).map_err(|e| SparkError::invalid_url(service_url, e))?;

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(SparkError::invalid_url(service_url, "missing host"));
        }
    };
    let path = url.path().to_string();

    // RFC 1123 date, the same representation the server reproduces when
    // verifying the signature.
    let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();

    let signature_origin = format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1");

    let mut mac = HmacSha256::new_from_slice(credentials.api_secret.as_bytes())
        .map_err(|e| SparkError::Auth(format!("invalid api_secret: {e}")))?;
    mac.update(signature_origin.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let authorization_origin = format!(
        "api_key=\"{}\", algorithm=\"hmac-sha256\", headers=\"host date request-line\", signature=\"{}\"",
        credentials.api_key, signature
    );
    let authorization = BASE64.encode(authorization_origin.as_bytes());

    url.query_pairs_mut()
        .append_pair("authorization", &authorization)
        .append_pair("date", &date)
        .append_pair("host", &host);

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn credentials() -> Credentials {
        Credentials {
            app_id: "app".into(),
            api_key: "test-key".into(),
            api_secret: "test-secret".into(),
        }
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    const SERVICE_URL: &str = "wss://spark-api.xf-yun.com/v2.1/chat";

    #[test]
    fn signing_is_deterministic() {
        let first = sign_url(&credentials(), SERVICE_URL, fixed_clock()).unwrap();
        let second = sign_url(&credentials(), SERVICE_URL, fixed_clock()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn signed_url_carries_auth_query_parameters() {
        let signed = sign_url(&credentials(), SERVICE_URL, fixed_clock()).unwrap();
        let url = Url::parse(&signed).unwrap();
        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(params.len(), 3);
        assert_eq!(params[0].0, "authorization");
        assert_eq!(params[1], ("date".into(), "Fri, 01 Mar 2024 12:30:45 GMT".into()));
        assert_eq!(params[2], ("host".into(), "spark-api.xf-yun.com".into()));

        // Base path untouched by signing.
        assert_eq!(url.path(), "/v2.1/chat");
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn authorization_wraps_the_header_value() {
        let signed = sign_url(&credentials(), SERVICE_URL, fixed_clock()).unwrap();
        let url = Url::parse(&signed).unwrap();
        let authorization = url
            .query_pairs()
            .find(|(k, _)| k == "authorization")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        let decoded = String::from_utf8(BASE64.decode(authorization).unwrap()).unwrap();
        assert!(decoded.starts_with("api_key=\"test-key\", algorithm=\"hmac-sha256\""));
        assert!(decoded.contains("headers=\"host date request-line\""));
        assert!(decoded.contains("signature=\""));
    }

    #[test]
    fn different_clock_changes_the_signature() {
        let first = sign_url(&credentials(), SERVICE_URL, fixed_clock()).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 46).unwrap();
        let second = sign_url(&credentials(), SERVICE_URL, later).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_url_is_rejected() {
        let err = sign_url(&credentials(), "not a url", fixed_clock()).unwrap_err();
        assert!(matches!(err, SparkError::InvalidUrl { .. }));
    }
}
