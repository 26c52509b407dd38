use crate::contract::ValidationError;

pub const CLIENT_TOKEN_MIN_LEN: usize = 32;
pub const CLIENT_TOKEN_MAX_LEN: usize = 64;

/// Object keys in S3 notifications are form-encoded (`+` for space).
pub fn decode_object_key(raw: &str) -> Result<String, ValidationError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|error| ValidationError::new(format!("Invalid object key '{raw}': {error}")))
}

/// Idempotency token for an import job: the object URI clipped to its last
/// 64 characters, right-padded with `-` to at least 32.
pub fn import_client_token(bucket: &str, key: &str) -> String {
    let uri: Vec<char> = format!("s3://{bucket}/{key}").chars().collect();
    let start = uri.len().saturating_sub(CLIENT_TOKEN_MAX_LEN);
    let mut token: String = uri[start..].iter().collect();
    while token.chars().count() < CLIENT_TOKEN_MIN_LEN {
        token.push('-');
    }
    token
}
