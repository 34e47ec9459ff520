//! WaitEngine: bounded waits, retried actions and frame handling on top of
//! a [`BrowserDriver`].
//!
//! Every operation takes an explicit timeout and either succeeds within it
//! or fails with [`ProbeError::Timeout`] naming what it waited for. Polling
//! follows the contract documented in [`crate::wait`].
//!
//! # Frames
//!
//! The engine tracks which document the session addresses as a
//! [`FrameContext`]. [`WaitEngine::wait_and_switch_to_frame`] returns the
//! context it left, [`WaitEngine::restore_frame`] goes back to it, and
//! [`WaitEngine::within_frame`] does both around a closure. If a
//! `within_frame` future is dropped mid-way (an outer timeout fired), the
//! restore is recorded and performed before the next element lookup.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::Settings;
use crate::driver::{BrowserDriver, ElementHandle};
use crate::frame::FrameContext;
use crate::locator::Locator;
use crate::recovery::{self, RecoveryPolicy, RecoveryReport};
use crate::result::{ProbeError, ProbeResult};
use crate::url_pattern::UrlPattern;
use crate::wait::{self, AttemptConfig, WaitConfig, WaitOutcome};

const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView(true);";

#[derive(Debug, Default)]
struct FrameState {
    current: FrameContext,
    pending_restore: Option<FrameContext>,
}

/// Records the prior frame if a `within_frame` future is dropped before
/// it restored it.
struct FrameRestore<'a> {
    frames: &'a Mutex<FrameState>,
    prior: Option<FrameContext>,
}

impl<'a> FrameRestore<'a> {
    fn new(frames: &'a Mutex<FrameState>, prior: FrameContext) -> Self {
        Self {
            frames,
            prior: Some(prior),
        }
    }

    fn disarm(mut self) {
        self.prior = None;
    }
}

impl Drop for FrameRestore<'_> {
    fn drop(&mut self) {
        if let Some(prior) = self.prior.take() {
            self.frames.lock().pending_restore = Some(prior);
        }
    }
}

/// Polling-based wait and retry engine bound to one browser session
#[derive(Clone)]
pub struct WaitEngine {
    driver: Arc<dyn BrowserDriver>,
    config: WaitConfig,
    attempts: AttemptConfig,
    frames: Arc<Mutex<FrameState>>,
}

impl fmt::Debug for WaitEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitEngine")
            .field("config", &self.config)
            .field("attempts", &self.attempts)
            .field("frame", &self.current_frame())
            .finish_non_exhaustive()
    }
}

impl WaitEngine {
    /// Create an engine with default timeouts
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            config: WaitConfig::default(),
            attempts: AttemptConfig::default(),
            frames: Arc::new(Mutex::new(FrameState::default())),
        }
    }

    /// Create an engine using the timeouts from `settings`
    #[must_use]
    pub fn from_settings(driver: Arc<dyn BrowserDriver>, settings: &Settings) -> Self {
        Self::new(driver)
            .with_config(settings.wait_config())
            .with_attempts(settings.attempt_config())
    }

    /// Set default wait config
    #[must_use]
    pub const fn with_config(mut self, config: WaitConfig) -> Self {
        self.config = config;
        self
    }

    /// Set default attempt config
    #[must_use]
    pub const fn with_attempts(mut self, attempts: AttemptConfig) -> Self {
        self.attempts = attempts;
        self
    }

    /// Default wait config
    #[must_use]
    pub const fn config(&self) -> WaitConfig {
        self.config
    }

    /// Default attempt config
    #[must_use]
    pub const fn attempt_config(&self) -> AttemptConfig {
        self.attempts
    }

    /// Default timeout, for callers without a specific budget
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn BrowserDriver> {
        &self.driver
    }

    fn wait_config(&self, timeout: Duration) -> WaitConfig {
        self.config.with_timeout(timeout)
    }

    // =========================================================================
    // Single checks
    // =========================================================================

    /// Whether an element matching `locator` is displayed right now.
    ///
    /// An element that goes stale during the check counts as not visible.
    ///
    /// # Errors
    ///
    /// Non-transient driver errors.
    pub async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(self.find_displayed(locator).await?.is_some())
    }

    /// Whether an element matching `locator` is in the DOM right now
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn is_present(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(self.find_present(locator).await?.is_some())
    }

    async fn find_displayed(&self, locator: &Locator) -> ProbeResult<Option<ElementHandle>> {
        self.settle_frame().await?;
        let elements = match self.driver.find_elements(locator).await {
            Ok(elements) => elements,
            Err(e) if e.is_transient() => return Ok(None),
            Err(e) => return Err(e),
        };
        for element in elements {
            match self.driver.is_displayed(&element).await {
                Ok(true) => return Ok(Some(element)),
                Ok(false) => {}
                Err(e) if e.is_transient() => trace!(%locator, error = %e, "element went stale"),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn find_present(&self, locator: &Locator) -> ProbeResult<Option<ElementHandle>> {
        self.settle_frame().await?;
        match self.driver.find_element(locator).await {
            Err(e) if e.is_transient() => {
                trace!(%locator, error = %e, "lookup went stale");
                Ok(None)
            }
            found => found,
        }
    }

    async fn is_hidden(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(!self.is_visible(locator).await?)
    }

    async fn attribute_equals(&self, locator: &Locator, name: &str, expected: &str) -> ProbeResult<bool> {
        let Some(element) = self.find_present(locator).await? else {
            return Ok(false);
        };
        match self.driver.attribute(&element, name).await {
            Ok(value) => Ok(value.as_deref() == Some(expected)),
            Err(e) if e.is_transient() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn visible_attribute(&self, locator: &Locator, name: &str) -> ProbeResult<Option<String>> {
        let Some(element) = self.find_displayed(locator).await? else {
            return Ok(None);
        };
        match self.driver.attribute(&element, name).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_transient() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn visible_text(&self, locator: &Locator) -> ProbeResult<Option<String>> {
        let Some(element) = self.find_displayed(locator).await? else {
            return Ok(None);
        };
        match self.driver.text(&element).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_transient() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Waits
    // =========================================================================

    /// Wait until an element matching `locator` is present and displayed.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`], [`ProbeError::InvalidLocator`] (immediately)
    /// or any other non-transient driver error.
    pub async fn wait_visibility(&self, locator: &Locator, timeout: Duration) -> ProbeResult<ElementHandle> {
        debug!(%locator, timeout_ms = timeout.as_millis() as u64, "wait_visibility");
        locator.validate()?;
        wait::wait_for(self.wait_config(timeout), &format!("visibility of {locator}"), || {
            self.find_displayed(locator)
        })
        .await
    }

    /// Wait until an element matching `locator` is in the DOM
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn wait_presence(&self, locator: &Locator, timeout: Duration) -> ProbeResult<ElementHandle> {
        debug!(%locator, timeout_ms = timeout.as_millis() as u64, "wait_presence");
        locator.validate()?;
        wait::wait_for(self.wait_config(timeout), &format!("presence of {locator}"), || {
            self.find_present(locator)
        })
        .await
    }

    /// Wait until no element matching `locator` is displayed (absent or
    /// hidden).
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn wait_disappearance(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        debug!(%locator, timeout_ms = timeout.as_millis() as u64, "wait_disappearance");
        locator.validate()?;
        wait::wait_until(self.wait_config(timeout), &format!("disappearance of {locator}"), || {
            self.is_hidden(locator)
        })
        .await
        .map(|_| ())
    }

    /// Wait until attribute `name` of the element equals `expected` exactly.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn wait_attribute_value(
        &self,
        locator: &Locator,
        name: &str,
        expected: &str,
        timeout: Duration,
    ) -> ProbeResult<()> {
        debug!(%locator, name, expected, "wait_attribute_value");
        locator.validate()?;
        let what = format!("attribute {name}={expected:?} on {locator}");
        wait::wait_until(self.wait_config(timeout), &what, || {
            self.attribute_equals(locator, name, expected)
        })
        .await
        .map(|_| ())
    }

    /// Wait for the element to be visible and return attribute `name`
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] if the element never shows up or the
    /// attribute stays unset.
    pub async fn wait_and_get_attribute(&self, locator: &Locator, name: &str, timeout: Duration) -> ProbeResult<String> {
        debug!(%locator, name, "wait_and_get_attribute");
        locator.validate()?;
        wait::wait_for(self.wait_config(timeout), &format!("attribute {name} of {locator}"), || {
            self.visible_attribute(locator, name)
        })
        .await
    }

    /// Wait for the element to be visible and return its `value`
    ///
    /// # Errors
    ///
    /// See [`Self::wait_and_get_attribute`].
    pub async fn wait_and_get_value(&self, locator: &Locator, timeout: Duration) -> ProbeResult<String> {
        self.wait_and_get_attribute(locator, "value", timeout).await
    }

    /// Wait for the element to be visible and return its text
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn wait_and_get_text(&self, locator: &Locator, timeout: Duration) -> ProbeResult<String> {
        debug!(%locator, "wait_and_get_text");
        locator.validate()?;
        wait::wait_for(self.wait_config(timeout), &format!("text of {locator}"), || {
            self.visible_text(locator)
        })
        .await
    }

    /// Check visibility up to `config.attempts` times; `false` instead of an
    /// error when it never shows up.
    ///
    /// # Errors
    ///
    /// Non-transient driver errors.
    pub async fn wait_visibility_boolean(&self, locator: &Locator, config: AttemptConfig) -> ProbeResult<bool> {
        debug!(%locator, attempts = config.attempts, "wait_visibility_boolean");
        locator.validate()?;
        wait::poll_attempts(config, || self.is_visible(locator)).await
    }

    /// Attempt-bounded counterpart of [`Self::wait_disappearance`]
    ///
    /// # Errors
    ///
    /// Non-transient driver errors.
    pub async fn wait_disappearance_boolean(&self, locator: &Locator, config: AttemptConfig) -> ProbeResult<bool> {
        debug!(%locator, attempts = config.attempts, "wait_disappearance_boolean");
        locator.validate()?;
        wait::poll_attempts(config, || self.is_hidden(locator)).await
    }

    /// Generic bounded wait; `what` names the condition in the timeout
    /// error. `polling` defaults to the engine's interval.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or the predicate's first fatal error.
    pub async fn wait_until<F, Fut>(
        &self,
        what: &str,
        predicate: F,
        timeout: Duration,
        polling: Option<Duration>,
    ) -> ProbeResult<WaitOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<bool>>,
    {
        let mut config = self.wait_config(timeout);
        if let Some(polling) = polling {
            config = config.with_polling(polling);
        }
        wait::wait_until(config, what, predicate).await
    }

    /// Fixed delay
    pub async fn sleep(&self, duration: Duration) {
        wait::sleep(duration).await;
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Wait for visibility, then click. Stale, not-interactable and
    /// intercepted clicks are retried within `timeout`.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] (mentioning the last transient failure) or a
    /// non-transient driver error.
    pub async fn wait_and_click(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        debug!(%locator, timeout_ms = timeout.as_millis() as u64, "wait_and_click");
        self.act_with_retry(locator, timeout, "click", |element| async move {
            self.driver.click(&element).await
        })
        .await
    }

    /// Wait for visibility, clear any existing value, type `text`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::wait_and_click`].
    pub async fn enter_value(&self, locator: &Locator, text: &str, timeout: Duration) -> ProbeResult<()> {
        debug!(%locator, "enter_value");
        self.act_with_retry(locator, timeout, "enter value", |element| async move {
            let current = self.driver.attribute(&element, "value").await?;
            if current.as_deref().is_some_and(|v| !v.is_empty()) {
                self.driver.clear(&element).await?;
            }
            self.driver.send_keys(&element, text).await
        })
        .await
    }

    /// Wait for visibility and type `text` without clearing
    ///
    /// # Errors
    ///
    /// Same as [`Self::wait_and_click`].
    pub async fn type_text(&self, locator: &Locator, text: &str, timeout: Duration) -> ProbeResult<()> {
        debug!(%locator, "type_text");
        self.act_with_retry(locator, timeout, "type", |element| async move {
            self.driver.send_keys(&element, text).await
        })
        .await
    }

    /// Wait for visibility and clear the element
    ///
    /// # Errors
    ///
    /// Same as [`Self::wait_and_click`].
    pub async fn clear(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        debug!(%locator, "clear");
        self.act_with_retry(locator, timeout, "clear", |element| async move {
            self.driver.clear(&element).await
        })
        .await
    }

    /// Wait for presence and scroll the element into view
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn scroll_to(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        debug!(%locator, "scroll_to");
        let element = self.wait_presence(locator, timeout).await?;
        self.driver
            .execute_script(SCROLL_INTO_VIEW, std::slice::from_ref(&element))
            .await
            .map(|_| ())
    }

    async fn act_with_retry<F, Fut>(
        &self,
        locator: &Locator,
        timeout: Duration,
        action: &str,
        mut act: F,
    ) -> ProbeResult<()>
    where
        F: FnMut(ElementHandle) -> Fut,
        Fut: Future<Output = ProbeResult<()>>,
    {
        let deadline = Instant::now() + timeout;
        let mut last_transient: Option<ProbeError> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let element = match self.wait_visibility(locator, remaining).await {
                Ok(element) => element,
                Err(e) if e.is_timeout() => {
                    return Err(action_timeout(action, locator, timeout, last_transient.as_ref()));
                }
                Err(e) => return Err(e),
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining + self.config.polling, act(element)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) if e.is_transient() => {
                    debug!(%locator, action, error = %e, "transient failure, retrying");
                    last_transient = Some(e);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!(%locator, action, "driver did not answer within budget");
                    return Err(action_timeout(action, locator, timeout, last_transient.as_ref()));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(action_timeout(action, locator, timeout, last_transient.as_ref()));
            }
            tokio::time::sleep(self.config.polling.min(deadline - now)).await;
        }
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Frame context the session currently addresses
    #[must_use]
    pub fn current_frame(&self) -> FrameContext {
        self.frames.lock().current.clone()
    }

    /// Wait for the frame element, switch into it and return the context
    /// that was active before.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn wait_and_switch_to_frame(&self, locator: &Locator, timeout: Duration) -> ProbeResult<FrameContext> {
        debug!(%locator, "wait_and_switch_to_frame");
        locator.validate()?;
        self.settle_frame().await?;
        let prior = self.current_frame();
        self.enter_frame(locator, timeout).await?;
        Ok(prior)
    }

    /// Address the top-level document
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn switch_to_default_content(&self) -> ProbeResult<()> {
        debug!("switch_to_default_content");
        self.driver.switch_to_default_content().await?;
        let mut frames = self.frames.lock();
        frames.current = FrameContext::top();
        frames.pending_restore = None;
        Ok(())
    }

    /// Go back to `prior`. A no-op when already there.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] if a frame on the path cannot be re-entered.
    pub async fn restore_frame(&self, prior: &FrameContext, timeout: Duration) -> ProbeResult<()> {
        if self.current_frame() == *prior {
            return Ok(());
        }
        debug!(frame = %prior, "restore_frame");
        self.enter_path(prior, timeout).await
    }

    /// Run `body` inside the frame found by `frame`, restoring the current
    /// context afterwards whether `body` succeeds or fails.
    ///
    /// # Errors
    ///
    /// The error from entering the frame, from `body`, or from restoring
    /// (in that order of precedence).
    ///
    /// The restore gets what is left of `timeout`, and never less than one
    /// polling interval.
    pub async fn within_frame<T, F, Fut>(&self, frame: &Locator, timeout: Duration, body: F) -> ProbeResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProbeResult<T>>,
    {
        let deadline = Instant::now() + timeout;
        let prior = self.wait_and_switch_to_frame(frame, timeout).await?;
        let guard = FrameRestore::new(&self.frames, prior.clone());
        let result = body().await;
        guard.disarm();

        // never below one polling interval
        let budget = deadline.saturating_duration_since(Instant::now()).max(self.config.polling);
        let restored = self.restore_frame(&prior, budget).await;
        match (result, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                warn!(frame = %prior, error = %restore_err, "frame restore failed after error");
                Err(e)
            }
        }
    }

    async fn enter_frame(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        wait::wait_for(self.wait_config(timeout), &format!("frame {locator}"), || {
            self.try_enter_frame(locator)
        })
        .await?;
        let mut frames = self.frames.lock();
        let entered = frames.current.child(locator.clone());
        frames.current = entered;
        Ok(())
    }

    async fn try_enter_frame(&self, locator: &Locator) -> ProbeResult<Option<()>> {
        let element = match self.driver.find_element(locator).await {
            Ok(Some(element)) => element,
            Ok(None) => return Ok(None),
            Err(e) if e.is_transient() => return Ok(None),
            Err(e) => return Err(e),
        };
        match self.driver.switch_to_frame(&element).await {
            Ok(()) => Ok(Some(())),
            Err(e) if e.is_transient() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Switch to the top-level document and walk down `target`'s path.
    /// Uses raw lookups only, so it never waits on a pending restore.
    async fn enter_path(&self, target: &FrameContext, timeout: Duration) -> ProbeResult<()> {
        self.driver.switch_to_default_content().await?;
        self.frames.lock().current = FrameContext::top();
        for locator in target.path() {
            self.enter_frame(locator, timeout).await?;
        }
        Ok(())
    }

    async fn settle_frame(&self) -> ProbeResult<()> {
        let pending = self.frames.lock().pending_restore.take();
        if let Some(prior) = pending {
            if self.current_frame() != prior {
                debug!(frame = %prior, "restoring frame left by a cancelled scope");
                self.enter_path(&prior, self.config.timeout).await?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Composed protocols
    // =========================================================================

    /// Split `timeout` into the configured number of attempts; run
    /// `recover` after each attempt whose probe timed out.
    ///
    /// # Errors
    ///
    /// See [`recovery::assert_and_recover`].
    pub async fn assert_and_recover<P, PF, R, RF>(
        &self,
        what: &str,
        timeout: Duration,
        probe: P,
        recover: R,
    ) -> ProbeResult<RecoveryReport>
    where
        P: FnMut(Duration) -> PF,
        PF: Future<Output = ProbeResult<()>>,
        R: FnMut() -> RF,
        RF: Future<Output = ProbeResult<()>>,
    {
        let policy = RecoveryPolicy::new(timeout, self.attempts.attempts);
        recovery::assert_and_recover(policy, what, probe, recover).await
    }

    /// Poll for `content` inside `frame`, running `refresh` in the outer
    /// context between failed checks. Returns the number of refreshes.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] after `config.timeout`, or the first
    /// non-transient error from the check or the refresh.
    pub async fn wait_content_available<R, RF>(
        &self,
        frame: &Locator,
        content: &Locator,
        config: WaitConfig,
        mut refresh: R,
    ) -> ProbeResult<u32>
    where
        R: FnMut() -> RF,
        RF: Future<Output = ProbeResult<()>>,
    {
        debug!(%frame, %content, "wait_content_available");
        content.validate()?;
        let deadline = Instant::now() + config.timeout;
        let mut refreshes = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let check = self
                .within_frame(frame, remaining, || self.is_visible(content))
                .await;
            match check {
                Ok(true) => return Ok(refreshes),
                Ok(false) => trace!(%content, refreshes, "content not there yet"),
                Err(e) if e.is_timeout() || e.is_transient() => {
                    trace!(%content, error = %e, "content check failed");
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ProbeError::timeout(
                    format!("content {content} in frame {frame}"),
                    config.timeout,
                ));
            }
            let remaining = deadline - now;
            match tokio::time::timeout(remaining + config.polling, refresh()).await {
                Ok(refreshed) => refreshed?,
                Err(_) => {
                    return Err(ProbeError::timeout(
                        format!("refresh while waiting for content {content} in frame {frame}"),
                        config.timeout,
                    ));
                }
            }
            refreshes += 1;
            tokio::time::sleep(config.polling.min(deadline.saturating_duration_since(Instant::now()))).await;
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Current page URL
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn current_url(&self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    /// Navigate to `url`; the session is back at the top-level document
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn navigate(&self, url: &str) -> ProbeResult<()> {
        debug!(url, "navigate");
        self.driver.navigate(url).await?;
        self.reset_frame();
        Ok(())
    }

    /// Navigate to `url` and wait until the browser reports it
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn navigate_and_wait_url(&self, url: &str, timeout: Duration) -> ProbeResult<()> {
        debug!(url, "navigate_and_wait_url");
        self.navigate(url).await?;
        self.wait_url(&UrlPattern::from(url), timeout).await.map(|_| ())
    }

    /// Wait until the current URL matches `pattern`; returns the URL
    ///
    /// # Errors
    ///
    /// [`ProbeError::Timeout`] or driver errors.
    pub async fn wait_url(&self, pattern: &UrlPattern, timeout: Duration) -> ProbeResult<String> {
        debug!(%pattern, "wait_url");
        wait::wait_for(self.wait_config(timeout), &pattern.to_string(), || {
            self.url_matching(pattern)
        })
        .await
    }

    async fn url_matching(&self, pattern: &UrlPattern) -> ProbeResult<Option<String>> {
        let url = self.driver.current_url().await?;
        Ok(pattern.matches(&url).then_some(url))
    }

    /// Reload the page; the session is back at the top-level document
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn reload_page(&self) -> ProbeResult<()> {
        debug!("reload_page");
        self.driver.refresh().await?;
        self.reset_frame();
        Ok(())
    }

    fn reset_frame(&self) {
        let mut frames = self.frames.lock();
        frames.current = FrameContext::top();
        frames.pending_restore = None;
    }
}

fn action_timeout(action: &str, locator: &Locator, timeout: Duration, last: Option<&ProbeError>) -> ProbeError {
    let what = match last {
        Some(e) => format!("{action} on {locator} (last error: {e})"),
        None => format!("{action} on {locator}"),
    };
    ProbeError::timeout(what, timeout)
}
