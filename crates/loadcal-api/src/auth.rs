//! `x-api-key` guard for mutating endpoints.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use loadcal_core::store::LoadStore;
use sha2::{Digest, Sha256};

use crate::{ApiState, error::ApiError};

pub const API_KEY_HEADER: &str = "x-api-key";

/// The configured key, held as a SHA-256 digest. Candidates are hashed and
/// the digests compared.
#[derive(Clone)]
pub struct ApiKey {
  digest: [u8; 32],
}

impl ApiKey {
  pub fn new(key: &str) -> Self {
    Self { digest: Sha256::digest(key.as_bytes()).into() }
  }

  pub fn matches(&self, candidate: &str) -> bool {
    let digest: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
    digest == self.digest
  }
}

impl std::fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("ApiKey(..)")
  }
}

/// Check `headers` against `key`. With no key configured every request
/// passes.
pub fn verify_api_key(
  headers: &HeaderMap,
  key: Option<&ApiKey>,
) -> Result<(), ApiError> {
  let Some(key) = key else { return Ok(()) };
  let candidate = headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;
  if key.matches(candidate) {
    Ok(())
  } else {
    Err(ApiError::Unauthorized)
  }
}

/// Zero-size marker: present in a handler means the caller passed the key
/// check.
pub struct RequireApiKey;

impl<S> FromRequestParts<ApiState<S>> for RequireApiKey
where
  S: LoadStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_api_key(&parts.headers, state.api_key.as_deref())?;
    Ok(RequireApiKey)
  }
}
