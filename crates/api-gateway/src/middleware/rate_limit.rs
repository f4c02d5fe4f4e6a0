//! Rate limiting using per-key token buckets.
//!
//! Each key (operation + client identity + window suffix) owns a `governor`
//! bucket refilling `count` tokens per `window` with a burst of `count`.
//! Buckets live in an [`ExpiringMap`] with a TTL equal to the window, pushed
//! out on every access: a key idle for a full window starts over with a full
//! bucket.
//!
//! The first denial of a key logs one error record; further denials of that
//! key stay silent for [`ALERT_SUPPRESSION`].

use crate::domain::error::ApiError;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota,
};
use parking_lot::Mutex;
use shared_bus::{ExpiringMap, Sweeper};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::{Layer, Service};
use tracing::{debug, error};

/// How long a key stays silent after its first logged denial.
pub const ALERT_SUPPRESSION: Duration = Duration::from_secs(600);

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);

type Bucket = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiting errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// The caller gave up before a token became available
    #[error("rate limit wait cancelled")]
    Cancelled,
}

/// Per-key token-bucket limiter.
pub struct RateLimiter {
    buckets: ExpiringMap<String, Arc<Bucket>>,
    alerts: ExpiringMap<String, ()>,
    sweepers: Mutex<Vec<Sweeper>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: ExpiringMap::new(),
            alerts: ExpiringMap::new(),
            sweepers: Mutex::new(Vec::new()),
        }
    }

    /// Start background eviction of idle buckets and stale alert markers.
    /// Must be called from within a Tokio runtime.
    pub fn start_sweeping(&self, interval: Duration) {
        let mut sweepers = self.sweepers.lock();
        for sweeper in sweepers.iter_mut() {
            sweeper.stop();
        }
        *sweepers = vec![
            self.buckets.spawn_sweeper(interval),
            self.alerts.spawn_sweeper(interval),
        ];
    }

    /// Stop background eviction. Idempotent.
    pub fn stop_sweeping(&self) {
        for mut sweeper in self.sweepers.lock().drain(..) {
            sweeper.stop();
        }
    }

    /// Bucket for `key`, created on first use. `None` for a degenerate
    /// configuration (zero count or zero window), which callers treat as allow.
    fn bucket(&self, key: &str, count: u32, window: Duration) -> Option<Arc<Bucket>> {
        let burst = NonZeroU32::new(count)?;
        let quota = Quota::with_period(window / count)?.allow_burst(burst);
        Some(self.buckets.get_or_insert_with(key.to_string(), window, || {
            debug!(key, count, window_ms = window.as_millis() as u64, "Creating rate limit bucket");
            Arc::new(Bucket::direct(quota))
        }))
    }

    /// Take one token for `key` without waiting.
    pub fn allow(&self, key: &str, count: u32, window: Duration) -> bool {
        self.check(key, count, window).is_ok()
    }

    /// Like [`allow`](Self::allow), reporting how long until a token is
    /// available when denied.
    pub fn check(&self, key: &str, count: u32, window: Duration) -> Result<(), Duration> {
        let Some(bucket) = self.bucket(key, count, window) else {
            return Ok(());
        };
        match bucket.check() {
            Ok(()) => Ok(()),
            Err(not_until) => {
                self.alert(key, count);
                Err(not_until.wait_time_from(DefaultClock::default().now()))
            }
        }
    }

    /// Wait until a token for `key` is available or `cancel` fires.
    pub async fn wait(
        &self,
        key: &str,
        count: u32,
        window: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), RateLimitError> {
        let Some(bucket) = self.bucket(key, count, window) else {
            return Ok(());
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(RateLimitError::Cancelled),
            _ = bucket.until_ready() => Ok(()),
        }
    }

    fn alert(&self, key: &str, count: u32) {
        if self.alerts.insert_if_absent(key.to_string(), (), ALERT_SUPPRESSION) {
            error!(key, count, "Reached allow limit on key");
        }
    }

    pub fn allow_ip_rps(&self, op: &str, ip: IpAddr, count: u32) -> bool {
        self.allow(&ip_key(op, ip, "rps"), count, SECOND)
    }

    pub fn allow_ip_rpm(&self, op: &str, ip: IpAddr, count: u32) -> bool {
        self.allow(&ip_key(op, ip, "rpm"), count, MINUTE)
    }

    pub fn allow_global_rps(&self, op: &str, count: u32) -> bool {
        self.allow(&global_key(op, "rps"), count, SECOND)
    }

    pub fn allow_global_rpm(&self, op: &str, count: u32) -> bool {
        self.allow(&global_key(op, "rpm"), count, MINUTE)
    }

    pub async fn wait_ip_rps(
        &self,
        op: &str,
        ip: IpAddr,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<(), RateLimitError> {
        self.wait(&ip_key(op, ip, "rps"), count, SECOND, cancel).await
    }

    pub async fn wait_ip_rpm(
        &self,
        op: &str,
        ip: IpAddr,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<(), RateLimitError> {
        self.wait(&ip_key(op, ip, "rpm"), count, MINUTE, cancel).await
    }

    pub async fn wait_global_rps(
        &self,
        op: &str,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<(), RateLimitError> {
        self.wait(&global_key(op, "rps"), count, SECOND, cancel).await
    }

    pub async fn wait_global_rpm(
        &self,
        op: &str,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<(), RateLimitError> {
        self.wait(&global_key(op, "rpm"), count, MINUTE, cancel).await
    }

    /// Number of stored buckets, including idle ones not yet swept.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn ip_key(op: &str, ip: IpAddr, suffix: &str) -> String {
    format!("{op}_{ip}_{suffix}")
}

fn global_key(op: &str, suffix: &str) -> String {
    format!("{op}_{suffix}")
}

/// Who shares a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One bucket per client IP
    Ip,
    /// One bucket for everyone
    Global,
}

/// Limit applied by [`RateLimitLayer`].
#[derive(Debug, Clone)]
pub struct RateRule {
    pub op: &'static str,
    pub count: u32,
    pub window: Duration,
    pub scope: Scope,
}

impl RateRule {
    pub fn per_ip_minute(op: &'static str, count: u32) -> Self {
        Self {
            op,
            count,
            window: MINUTE,
            scope: Scope::Ip,
        }
    }

    pub fn global_second(op: &'static str, count: u32) -> Self {
        Self {
            op,
            count,
            window: SECOND,
            scope: Scope::Global,
        }
    }

    fn key(&self, ip: IpAddr) -> String {
        let suffix = if self.window == SECOND { "rps" } else { "rpm" };
        match self.scope {
            Scope::Ip => ip_key(self.op, ip, suffix),
            Scope::Global => global_key(self.op, suffix),
        }
    }
}

/// Rate limit layer: rejects requests over `rule` with 429 and `Retry-After`.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    rule: Arc<RateRule>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>, rule: RateRule) -> Self {
        Self {
            limiter,
            rule: Arc::new(rule),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: Arc::clone(&self.limiter),
            rule: Arc::clone(&self.rule),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    rule: Arc<RateRule>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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
        let limiter = Arc::clone(&self.limiter);
        let rule = Arc::clone(&self.rule);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req);
            let key = rule.key(ip);

            match limiter.check(&key, rule.count, rule.window) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    debug!(
                        ip = %ip,
                        key = %key,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Rate limit exceeded"
                    );
                    Ok(ApiError::rate_limited(retry_after).into_response())
                }
            }
        })
    }
}

/// Extract client IP from request
pub fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    // Try X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP (original client)
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    // Try X-Real-IP header
    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            if let Ok(ip) = real_ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    // Fall back to connection info
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    // Default to localhost if we can't determine IP
    IpAddr::from([127, 0, 0, 1])
}
