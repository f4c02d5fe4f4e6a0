//! Admin authentication.
//!
//! Admin routes and the admin notification channel require the configured
//! bearer token. With no token configured, admin access is disabled.

use crate::domain::error::ApiError;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Validates admin credentials.
#[derive(Clone, Default)]
pub struct AdminAuth {
    token: Option<Arc<str>>,
}

impl AdminAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.map(Arc::from),
        }
    }

    /// Whether admin access is enabled at all.
    pub fn enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Whether `req` carries the admin token, either as
    /// `Authorization: Bearer <token>` or as a `token` query parameter (for
    /// WebSocket clients that cannot set headers).
    pub fn is_admin<B>(&self, req: &Request<B>) -> bool {
        self.check(req.headers(), req.uri())
    }

    /// Same as [`is_admin`](Self::is_admin), from already extracted parts.
    pub fn check(&self, headers: &HeaderMap, uri: &Uri) -> bool {
        let Some(expected) = &self.token else {
            return false;
        };

        // Check Authorization header (Bearer token)
        if let Some(auth) = headers.get(header::AUTHORIZATION) {
            if let Ok(auth_str) = auth.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    return constant_time_compare(token.trim(), expected);
                }
            }
        }

        if let Some(query) = uri.query() {
            for pair in query.split('&') {
                if let Some(token) = pair.strip_prefix("token=") {
                    return constant_time_compare(token, expected);
                }
            }
        }

        false
    }
}

/// Authentication layer guarding admin routes
#[derive(Clone)]
pub struct AuthLayer {
    auth: AdminAuth,
}

impl AuthLayer {
    pub fn new(auth: AdminAuth) -> Self {
        Self { auth }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            auth: self.auth.clone(),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    auth: AdminAuth,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let auth = self.auth.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !auth.enabled() {
                debug!(path = %req.uri().path(), "Admin access disabled");
                return Ok(unauthorized_response("admin access disabled"));
            }
            if !auth.is_admin(&req) {
                warn!(path = %req.uri().path(), "Admin access denied - invalid token");
                return Ok(unauthorized_response("admin token required"));
            }

            inner.call(req).await
        })
    }
}

/// Constant-time string comparison to prevent timing attacks
///
/// Both inputs are padded to the longer length with different bytes, so a
/// length mismatch never compares equal and the comparison time does not
/// depend on where the first difference is.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let mut response = ApiError::unauthorized(message).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}
