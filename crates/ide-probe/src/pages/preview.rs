//! Preview widget: the mini browser in the IDE's right side panel.

use std::time::Duration;

use tracing::debug;

use crate::engine::WaitEngine;
use crate::frame::FrameContext;
use crate::locator::Locator;
use crate::page_object::PageObject;
use crate::recovery::RecoveryReport;
use crate::result::ProbeResult;
use crate::wait::WaitConfig;

const URL_INPUT_XPATH: &str = "//*[@id='theia-right-side-panel']//div[@class='theia-mini-browser-toolbar']//input[@class='theia-input']";
const WIDGET_CSS: &str = "div.theia-mini-browser";
const IFRAME_CSS: &str = "div.theia-mini-browser iframe";
const REFRESH_BUTTON_CSS: &str = ".theia-mini-browser .theia-mini-browser-refresh";

/// Content checks poll this many times slower than the engine default
const CONTENT_POLLING_FACTOR: u32 = 5;

/// Preview widget page object
#[derive(Debug, Clone)]
pub struct PreviewWidget {
    engine: WaitEngine,
}

impl PreviewWidget {
    /// Create a page object driving `engine`
    #[must_use]
    pub const fn new(engine: WaitEngine) -> Self {
        Self { engine }
    }

    /// URL input in the widget toolbar
    #[must_use]
    pub fn url_locator() -> Locator {
        Locator::xpath(URL_INPUT_XPATH)
    }

    /// Widget container
    #[must_use]
    pub fn widget_locator() -> Locator {
        Locator::css(WIDGET_CSS)
    }

    /// Iframe holding the previewed application
    #[must_use]
    pub fn frame_locator() -> Locator {
        Locator::css(IFRAME_CSS)
    }

    /// Toolbar refresh button
    #[must_use]
    pub fn refresh_locator() -> Locator {
        Locator::css(REFRESH_BUTTON_CSS)
    }

    /// Wait until the URL input shows `expected`
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_url(&self, expected: &str, timeout: Duration) -> ProbeResult<()> {
        debug!("PreviewWidget.wait_url {expected}");
        self.engine
            .wait_attribute_value(&Self::url_locator(), "value", expected, timeout)
            .await
    }

    /// Replace the URL in the input
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn type_url(&self, url: &str, timeout: Duration) -> ProbeResult<()> {
        debug!("PreviewWidget.type_url {url}");
        self.engine.enter_value(&Self::url_locator(), url, timeout).await
    }

    /// Type `url` and reload the widget
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn type_and_apply_url(&self, url: &str, timeout: Duration) -> ProbeResult<()> {
        debug!("PreviewWidget.type_and_apply_url {url}");
        self.type_url(url, timeout).await?;
        self.refresh_page().await
    }

    /// Click the toolbar refresh button
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn refresh_page(&self) -> ProbeResult<()> {
        debug!("PreviewWidget.refresh_page");
        self.engine
            .wait_and_click(&Self::refresh_locator(), self.engine.default_timeout())
            .await
    }

    /// Wait until the widget shows `expected`, retyping the URL and
    /// refreshing between attempts.
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] after all attempts, or the first
    /// non-timeout error.
    pub async fn wait_application_opened(&self, expected: &str, timeout: Duration) -> ProbeResult<RecoveryReport> {
        debug!("PreviewWidget.wait_application_opened {expected}");
        self.engine
            .assert_and_recover(
                &format!("application {expected} in preview"),
                timeout,
                |budget| self.wait_url(expected, budget),
                || self.type_and_apply_url(expected, timeout),
            )
            .await
    }

    /// Switch into the widget iframe; returns the context to restore
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_and_switch_to_widget_frame(&self) -> ProbeResult<FrameContext> {
        debug!("PreviewWidget.wait_and_switch_to_widget_frame");
        self.engine
            .wait_and_switch_to_frame(&Self::frame_locator(), self.engine.default_timeout())
            .await
    }

    /// Wait until the widget is displayed
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_preview_widget(&self, timeout: Duration) -> ProbeResult<()> {
        debug!("PreviewWidget.wait_preview_widget");
        self.engine
            .wait_visibility(&Self::widget_locator(), timeout)
            .await
            .map(|_| ())
    }

    /// Wait until the widget is gone
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_preview_widget_absence(&self) -> ProbeResult<()> {
        debug!("PreviewWidget.wait_preview_widget_absence");
        self.engine
            .wait_disappearance(&Self::widget_locator(), self.engine.default_timeout())
            .await
    }

    /// Wait until `content` is visible inside the widget iframe, refreshing
    /// the widget between checks. `polling` defaults to five times the
    /// engine's interval. Returns the number of refreshes.
    ///
    /// The frame context is the same before and after the call.
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_content_available(
        &self,
        content: &Locator,
        timeout: Duration,
        polling: Option<Duration>,
    ) -> ProbeResult<u32> {
        debug!("PreviewWidget.wait_content_available {content}");
        let config = self.content_config(timeout, polling);
        self.engine
            .wait_content_available(&Self::frame_locator(), content, config, || self.refresh_page())
            .await
    }

    fn content_config(&self, timeout: Duration, polling: Option<Duration>) -> WaitConfig {
        let polling = polling.unwrap_or_else(|| self.engine.config().polling * CONTENT_POLLING_FACTOR);
        WaitConfig::new(timeout, polling)
    }

    /// Wait for an element of the previewed application
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_visibility(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        debug!("PreviewWidget.wait_visibility {locator}");
        self.engine.wait_visibility(locator, timeout).await.map(|_| ())
    }

    /// Click an element of the previewed application
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_and_click(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        debug!("PreviewWidget.wait_and_click {locator}");
        self.engine.wait_and_click(locator, timeout).await
    }
}

impl PageObject for PreviewWidget {
    fn ready_locator(&self) -> Locator {
        Self::widget_locator()
    }

    fn engine(&self) -> &WaitEngine {
        &self.engine
    }

    fn page_name(&self) -> &str {
        "PreviewWidget"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::driver::{MockDriver, MockElement, Visibility};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_locators() {
        assert_eq!(PreviewWidget::widget_locator(), Locator::css("div.theia-mini-browser"));
        assert!(PreviewWidget::url_locator().selector().contains("theia-mini-browser-toolbar"));
        assert_eq!(
            PreviewWidget::refresh_locator().to_string(),
            "css=.theia-mini-browser .theia-mini-browser-refresh"
        );
    }

    #[test]
    fn test_content_polling_defaults_to_five_intervals() {
        let engine = WaitEngine::new(Arc::new(MockDriver::new()))
            .with_config(WaitConfig::new(ms(20_000), ms(1_000)));
        let widget = PreviewWidget::new(engine);
        assert_eq!(widget.content_config(ms(60_000), None).polling, ms(5_000));
        assert_eq!(widget.content_config(ms(60_000), Some(ms(200))).polling, ms(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_and_apply_url() {
        let driver = Arc::new(
            MockDriver::new()
                .with_element(MockElement::new(PreviewWidget::url_locator()).with_attribute("value", "about:blank"))
                .with_element(MockElement::new(PreviewWidget::refresh_locator())),
        );
        let widget = PreviewWidget::new(WaitEngine::new(driver.clone()));
        widget.type_and_apply_url("http://localhost:3000", ms(1_000)).await.unwrap();
        assert_eq!(
            driver.attribute_of(&PreviewWidget::url_locator(), "value").as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(driver.click_count(&PreviewWidget::refresh_locator()), 1);
        widget.wait_url("http://localhost:3000", ms(1_000)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_widget_presence_and_absence() {
        let driver = Arc::new(MockDriver::new().with_element(
            MockElement::new(PreviewWidget::widget_locator()).visibility(Visibility::Until(ms(1_500))),
        ));
        let widget = PreviewWidget::new(WaitEngine::new(driver));
        widget.wait_preview_widget(ms(1_000)).await.unwrap();
        widget.wait_loaded().await.unwrap();
        widget.wait_preview_widget_absence().await.unwrap();
    }
}
