use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::Credentials;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const AMZ_DATE_HEADER: &str = "x-amz-date";
pub(crate) const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";
pub(crate) const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Inputs for signing one transport request.
pub(crate) struct SigningRequest<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub target: &'a str,
    pub content_type: &'a str,
    pub payload: &'a [u8],
    pub now: DateTime<Utc>,
}

/// Headers produced by signing.
pub(crate) struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
    pub security_token: Option<String>,
}

/// Signs a POST with SigV4 over the headers the transport sends.
///
/// Covers the transport's request shape only: a POST with an empty query
/// string.
pub(crate) fn sign_request(request: &SigningRequest<'_>) -> SignedHeaders {
    let amz_date = request.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = request.now.format("%Y%m%d").to_string();
    let content_sha256 = hex(Sha256::digest(request.payload).as_slice());
    let token = request.credentials.session_token.as_deref();

    // Canonical headers, sorted by name, each line terminated.
    let mut canonical_headers = format!(
        "content-type:{}\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
        request.content_type, request.host, content_sha256, amz_date
    );
    let mut signed_header_names =
        String::from("content-type;host;x-amz-content-sha256;x-amz-date");
    if let Some(token) = token {
        canonical_headers.push_str(&format!("x-amz-security-token:{token}\n"));
        signed_header_names.push_str(";x-amz-security-token");
    }
    canonical_headers.push_str(&format!("x-amz-target:{}\n", request.target));
    signed_header_names.push_str(";x-amz-target");

    let canonical_request = format!(
        "POST\n{}\n\n{}\n{}\n{}",
        request.path, canonical_headers, signed_header_names, content_sha256
    );

    let credential_scope = format!(
        "{}/{}/{}/aws4_request",
        date_stamp, request.region, request.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex(Sha256::digest(canonical_request.as_bytes()).as_slice())
    );

    let signing_key = derive_signing_key(
        &request.credentials.secret_access_key,
        &date_stamp,
        request.region,
        request.service,
    );
    let signature = hex(&hmac(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
        request.credentials.access_key_id, credential_scope, signed_header_names, signature
    );

    SignedHeaders {
        authorization,
        amz_date,
        content_sha256,
        security_token: token.map(ToOwned::to_owned),
    }
}

/// HMAC-SHA256 cascade over date, region, service and the terminator.
fn derive_signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let secret_key = format!("AWS4{secret}");
    let date_key = hmac(secret_key.as_bytes(), date_stamp.as_bytes());
    let region_key = hmac(&date_key, region.as_bytes());
    let service_key = hmac(&region_key, service.as_bytes());
    hmac(&service_key, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().as_slice().to_vec()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
