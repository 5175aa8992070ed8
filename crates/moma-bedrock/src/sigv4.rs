// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS Signature Version 4 request signing.
//!
//! Produces the `x-amz-date`, `x-amz-security-token` and `authorization`
//! headers for a request. Path segments are URI-encoded a second time when
//! building the canonical URI, as every AWS service except S3 expects.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// The parts of an HTTP request that take part in the signature.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub url: &'a Url,
    /// Headers to sign besides `host`, `x-amz-date` and `x-amz-security-token`.
    pub headers: &'a [(&'a str, &'a str)],
    pub body: &'a [u8],
}

/// Headers to attach to the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningOutput {
    pub amz_date: String,
    pub security_token: Option<String>,
    pub authorization: String,
    pub signature: String,
}

impl SigningOutput {
    /// `(name, value)` pairs ready to be inserted into a header map.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("x-amz-date", self.amz_date.clone()),
            ("authorization", self.authorization.clone()),
        ];
        if let Some(token) = &self.security_token {
            out.push(("x-amz-security-token", token.clone()));
        }
        out
    }
}

/// Signs requests for one service in one region.
#[derive(Debug, Clone)]
pub struct Signer<'a> {
    credentials: &'a Credentials,
    region: &'a str,
    service: &'a str,
}

impl<'a> Signer<'a> {
    pub fn new(credentials: &'a Credentials, region: &'a str, service: &'a str) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    pub fn sign(&self, request: &SignableRequest<'_>, time: DateTime<Utc>) -> SigningOutput {
        let amz_date = time.format("%Y%m%dT%H%M%SZ").to_string();
        let date = time.format("%Y%m%d").to_string();
        let security_token = self.credentials.session_token().map(String::from);

        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), normalize_header_value(value)))
            .collect();
        headers.push(("host".into(), host_header(request.url)));
        headers.push(("x-amz-date".into(), amz_date.clone()));
        if let Some(token) = &security_token {
            headers.push(("x-amz-security-token".into(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}\n"))
            .collect();
        let signed_headers = headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method.to_ascii_uppercase(),
            canonical_uri(request.url),
            canonical_query(request.url),
            canonical_headers,
            signed_headers,
            hex::encode(Sha256::digest(request.body)),
        );

        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = self.signing_key(&date);
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));
        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.credentials.access_key_id
        );

        SigningOutput {
            amz_date,
            security_token,
            authorization,
            signature,
        }
    }

    fn signing_key(&self, date: &str) -> Vec<u8> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key());
        let k_date = hmac(secret.as_bytes(), date.as_bytes());
        let k_region = hmac(&k_date, self.region.as_bytes());
        let k_service = hmac(&k_region, self.service.as_bytes());
        hmac(&k_service, b"aws4_request")
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return "/".into();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn example_credentials() -> Credentials {
        Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
        )
    }

    fn example_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    /// Published IAM ListUsers example.
    #[test]
    fn matches_published_iam_example() {
        let creds = example_credentials();
        let url = Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08").unwrap();
        let request = SignableRequest {
            method: "GET",
            url: &url,
            headers: &[("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")],
            body: b"",
        };
        let out = Signer::new(&creds, "us-east-1", "iam").sign(&request, example_time());

        assert_eq!(out.amz_date, "20150830T123600Z");
        assert_eq!(
            out.signature,
            "5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
        assert_eq!(
            out.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
        assert_eq!(out.headers().len(), 2);
    }

    #[test]
    fn session_token_is_signed() {
        let creds = Credentials::new("AKID", "secret", Some("session".into()));
        let url = Url::parse("https://bedrock-runtime.us-east-1.amazonaws.com/model/m/converse-stream").unwrap();
        let request = SignableRequest {
            method: "POST",
            url: &url,
            headers: &[("content-type", "application/json")],
            body: b"{}",
        };
        let out = Signer::new(&creds, "us-east-1", "bedrock").sign(&request, example_time());
        assert!(out
            .authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
        assert_eq!(out.security_token.as_deref(), Some("session"));
        assert!(out
            .headers()
            .iter()
            .any(|(name, value)| *name == "x-amz-security-token" && value == "session"));
    }

    #[test]
    fn signature_depends_on_body() {
        let creds = example_credentials();
        let url = Url::parse("https://example.amazonaws.com/").unwrap();
        let sign = |body: &[u8]| {
            Signer::new(&creds, "us-east-1", "bedrock")
                .sign(
                    &SignableRequest {
                        method: "POST",
                        url: &url,
                        headers: &[],
                        body,
                    },
                    example_time(),
                )
                .signature
        };
        assert_ne!(sign(b"a"), sign(b"b"));
    }

    #[test]
    fn canonical_uri_double_encodes_segments() {
        let url = Url::parse("https://host/model/anthropic.claude-v2%3A1/converse-stream").unwrap();
        assert_eq!(
            canonical_uri(&url),
            "/model/anthropic.claude-v2%253A1/converse-stream"
        );
    }

    #[test]
    fn canonical_query_sorts_and_encodes() {
        let url = Url::parse("https://host/?b=2&a=x%20y").unwrap();
        assert_eq!(canonical_query(&url), "a=x%20y&b=2");
    }

    #[test]
    fn host_header_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/x").unwrap();
        assert_eq!(host_header(&url), "127.0.0.1:8080");
        let url = Url::parse("https://bedrock.amazonaws.com/x").unwrap();
        assert_eq!(host_header(&url), "bedrock.amazonaws.com");
    }

    #[test]
    fn uri_encode_leaves_unreserved_alone() {
        assert_eq!(uri_encode("AZaz09-_.~"), "AZaz09-_.~");
        assert_eq!(uri_encode("a b/c:d"), "a%20b%2Fc%3Ad");
    }
}
