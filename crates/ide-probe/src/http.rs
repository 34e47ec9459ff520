//! HTTP readiness polling.
//!
//! Same bounded loop as the UI waits, pointed at an endpoint: poll until it
//! answers with the expected status. Connection failures and other statuses
//! count as "not yet".

use std::future::Future;

use tracing::debug;

use crate::result::{ProbeError, ProbeResult};
use crate::wait::{self, WaitConfig, WaitOutcome};

/// Status code of a healthy endpoint
pub const STATUS_OK: u16 = 200;

/// Poll `fetch` until it returns `expected`.
///
/// `fetch` performs one request and returns the status code. A
/// [`ProbeError::Http`] from it is retried like a wrong status.
///
/// # Errors
///
/// [`ProbeError::Timeout`] naming `what`, or a non-HTTP error from `fetch`.
pub async fn wait_for_status<F, Fut>(
    config: WaitConfig,
    what: &str,
    expected: u16,
    mut fetch: F,
) -> ProbeResult<WaitOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<u16>>,
{
    debug!(what, expected, "wait_for_status");
    let condition = format!("{what} to answer {expected}");
    wait::wait_until(config, &condition, || check_status(fetch(), expected)).await
}

async fn check_status<Fut>(request: Fut, expected: u16) -> ProbeResult<bool>
where
    Fut: Future<Output = ProbeResult<u16>>,
{
    match request.await {
        Ok(status) if status == expected => Ok(true),
        Ok(status) => Err(ProbeError::not_ready(format!("status {status}"))),
        Err(ProbeError::Http { message }) => Err(ProbeError::not_ready(message)),
        Err(e) => Err(e),
    }
}

/// Poll `url` with GET until it answers 200
///
/// # Errors
///
/// [`ProbeError::Timeout`] once `config.timeout` elapses.
#[cfg(feature = "http")]
pub async fn wait_for_http_ok(client: &reqwest::Client, url: &str, config: WaitConfig) -> ProbeResult<WaitOutcome> {
    wait_for_status(config, url, STATUS_OK, || async move {
        client
            .get(url)
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|e| ProbeError::Http {
                message: e.to_string(),
            })
    })
    .await
}
