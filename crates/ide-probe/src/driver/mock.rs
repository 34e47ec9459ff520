//! Scripted in-memory driver for tests.
//!
//! Elements live in a frame, appear and disappear on a schedule measured
//! from driver creation with tokio's clock, so `start_paused` tests get
//! deterministic timing. Typing updates the `value` attribute the way a real
//! input does.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{BrowserDriver, ElementHandle};
use crate::frame::FrameContext;
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};

const ID_PREFIX: &str = "mock-";

/// When a present element is displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Always displayed
    Always,
    /// Present but never displayed
    Never,
    /// Displayed from the given offset on
    After(Duration),
    /// Displayed until the given offset
    Until(Duration),
    /// Displayed once `target` has been clicked `count` times
    AfterClicks {
        /// Element whose clicks are counted
        target: Locator,
        /// Required number of clicks
        count: usize,
    },
}

/// A scripted element
#[derive(Debug)]
pub struct MockElement {
    locator: Locator,
    frame: FrameContext,
    visibility: Visibility,
    appears_at: Duration,
    removed_at: Option<Duration>,
    attributes: HashMap<String, Vec<(Duration, String)>>,
    text: String,
    click_errors: VecDeque<ProbeError>,
    click_hangs: bool,
}

impl MockElement {
    /// Create a visible element in the top-level document
    #[must_use]
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            frame: FrameContext::top(),
            visibility: Visibility::Always,
            appears_at: Duration::ZERO,
            removed_at: None,
            attributes: HashMap::new(),
            text: String::new(),
            click_errors: VecDeque::new(),
            click_hangs: false,
        }
    }

    /// Place the element inside a frame
    #[must_use]
    pub fn in_frame(mut self, frame: FrameContext) -> Self {
        self.frame = frame;
        self
    }

    /// Set the visibility schedule
    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Attach the element to the DOM only after `at`
    #[must_use]
    pub const fn appears_at(mut self, at: Duration) -> Self {
        self.appears_at = at;
        self
    }

    /// Detach the element from the DOM at `at`
    #[must_use]
    pub const fn removed_at(mut self, at: Duration) -> Self {
        self.removed_at = Some(at);
        self
    }

    /// Set an attribute from the start
    #[must_use]
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_attribute_at(name, Duration::ZERO, value)
    }

    /// Change an attribute at offset `at`
    #[must_use]
    pub fn with_attribute_at(
        mut self,
        name: impl Into<String>,
        at: Duration,
        value: impl Into<String>,
    ) -> Self {
        self.set_attribute(name.into(), at, value.into());
        self
    }

    /// Set the element text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Fail the next click with `error` (queued, one per click)
    #[must_use]
    pub fn with_click_error(mut self, error: ProbeError) -> Self {
        self.click_errors.push_back(error);
        self
    }

    /// Make every click on this element never complete
    #[must_use]
    pub const fn with_hanging_click(mut self) -> Self {
        self.click_hangs = true;
        self
    }

    fn is_present(&self, at: Duration) -> bool {
        at >= self.appears_at && self.removed_at.map_or(true, |removed| at < removed)
    }

    fn is_visible(&self, at: Duration, clicks: &HashMap<Locator, usize>) -> bool {
        match &self.visibility {
            Visibility::Always => true,
            Visibility::Never => false,
            Visibility::After(from) => at >= *from,
            Visibility::Until(until) => at < *until,
            Visibility::AfterClicks { target, count } => {
                clicks.get(target).copied().unwrap_or(0) >= *count
            }
        }
    }

    fn attribute_at(&self, name: &str, at: Duration) -> Option<String> {
        self.attributes
            .get(name)?
            .iter()
            .rev()
            .find(|(t, _)| *t <= at)
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&mut self, name: String, at: Duration, value: String) {
        let timeline = self.attributes.entry(name).or_default();
        let pos = timeline.partition_point(|(t, _)| *t <= at);
        timeline.insert(pos, (at, value));
    }
}

#[derive(Debug, Default)]
struct MockState {
    elements: Vec<MockElement>,
    frame: FrameContext,
    url: String,
    clicks: HashMap<Locator, usize>,
    find_errors: HashMap<Locator, VecDeque<ProbeError>>,
    history: Vec<String>,
    closed: bool,
}

impl MockState {
    fn check_open(&self) -> ProbeResult<()> {
        if self.closed {
            return Err(ProbeError::SessionClosed);
        }
        Ok(())
    }

    fn resolve(&self, element: &ElementHandle, at: Duration) -> ProbeResult<usize> {
        self.check_open()?;
        let index = element
            .id
            .strip_prefix(ID_PREFIX)
            .and_then(|i| i.parse::<usize>().ok())
            .filter(|i| *i < self.elements.len())
            .ok_or_else(|| ProbeError::driver(format!("unknown element id {}", element.id)))?;

        let el = &self.elements[index];
        if !el.is_present(at) || el.frame != self.frame {
            return Err(ProbeError::StaleElement {
                locator: element.locator.to_string(),
            });
        }
        Ok(index)
    }
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    started: Instant,
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create new mock driver; element schedules count from now
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Add an element (builder style)
    #[must_use]
    pub fn with_element(self, element: MockElement) -> Self {
        self.add_element(element);
        self
    }

    /// Set the current URL (builder style)
    #[must_use]
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.state.lock().url = url.into();
        self
    }

    /// Add an element
    pub fn add_element(&self, element: MockElement) {
        self.state.lock().elements.push(element);
    }

    /// Fail the next lookup of `locator` with `error`
    pub fn fail_next_find(&self, locator: Locator, error: ProbeError) {
        self.state
            .lock()
            .find_errors
            .entry(locator)
            .or_default()
            .push_back(error);
    }

    /// Simulate the browser going away
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state
            .lock()
            .history
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Successful clicks on elements found with `locator`
    #[must_use]
    pub fn click_count(&self, locator: &Locator) -> usize {
        self.state.lock().clicks.get(locator).copied().unwrap_or(0)
    }

    /// Frame the mock session is currently addressing
    #[must_use]
    pub fn current_frame(&self) -> FrameContext {
        self.state.lock().frame.clone()
    }

    /// Current value of an attribute on the first element with `locator`,
    /// regardless of frame
    #[must_use]
    pub fn attribute_of(&self, locator: &Locator, name: &str) -> Option<String> {
        let at = self.started.elapsed();
        self.state
            .lock()
            .elements
            .iter()
            .find(|e| &e.locator == locator)
            .and_then(|e| e.attribute_at(name, at))
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn find_elements(&self, locator: &Locator) -> ProbeResult<Vec<ElementHandle>> {
        let at = self.elapsed();
        let mut state = self.state.lock();
        state.check_open()?;
        locator.validate()?;
        if let Some(err) = state
            .find_errors
            .get_mut(locator)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }

        Ok(state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| &e.locator == locator && e.frame == state.frame && e.is_present(at))
            .map(|(i, e)| ElementHandle::new(format!("{ID_PREFIX}{i}"), e.locator.clone()))
            .collect())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> ProbeResult<bool> {
        let at = self.elapsed();
        let state = self.state.lock();
        let index = state.resolve(element, at)?;
        Ok(state.elements[index].is_visible(at, &state.clicks))
    }

    async fn click(&self, element: &ElementHandle) -> ProbeResult<()> {
        let at = self.elapsed();
        let hangs = {
            let state = self.state.lock();
            let index = state.resolve(element, at)?;
            state.elements[index].click_hangs
        };
        if hangs {
            return std::future::pending().await;
        }
        let mut state = self.state.lock();
        let index = state.resolve(element, at)?;
        if let Some(err) = state.elements[index].click_errors.pop_front() {
            return Err(err);
        }
        if !state.elements[index].is_visible(at, &state.clicks) {
            return Err(ProbeError::NotInteractable {
                locator: element.locator.to_string(),
            });
        }
        *state.clicks.entry(element.locator.clone()).or_insert(0) += 1;
        state.history.push(format!("click:{}", element.locator));
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> ProbeResult<()> {
        let at = self.elapsed();
        let mut state = self.state.lock();
        let index = state.resolve(element, at)?;
        state.elements[index].set_attribute("value".to_string(), at, String::new());
        state.history.push(format!("clear:{}", element.locator));
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ProbeResult<()> {
        let at = self.elapsed();
        let mut state = self.state.lock();
        let index = state.resolve(element, at)?;
        if !state.elements[index].is_visible(at, &state.clicks) {
            return Err(ProbeError::NotInteractable {
                locator: element.locator.to_string(),
            });
        }
        let el = &mut state.elements[index];
        let mut value = el.attribute_at("value", at).unwrap_or_default();
        value.push_str(text);
        el.set_attribute("value".to_string(), at, value);
        state.history.push(format!("send_keys:{}", element.locator));
        Ok(())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> ProbeResult<Option<String>> {
        let at = self.elapsed();
        let state = self.state.lock();
        let index = state.resolve(element, at)?;
        Ok(state.elements[index].attribute_at(name, at))
    }

    async fn text(&self, element: &ElementHandle) -> ProbeResult<String> {
        let at = self.elapsed();
        let state = self.state.lock();
        let index = state.resolve(element, at)?;
        Ok(state.elements[index].text.clone())
    }

    async fn switch_to_frame(&self, element: &ElementHandle) -> ProbeResult<()> {
        let at = self.elapsed();
        let mut state = self.state.lock();
        state.resolve(element, at)?;
        let entered = state.frame.child(element.locator.clone());
        state.frame = entered;
        state.history.push(format!("switch_to_frame:{}", element.locator));
        Ok(())
    }

    async fn switch_to_default_content(&self) -> ProbeResult<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        state.frame = FrameContext::top();
        state.history.push("switch_to_default_content".to_string());
        Ok(())
    }

    async fn execute_script(
        &self,
        script: &str,
        args: &[ElementHandle],
    ) -> ProbeResult<serde_json::Value> {
        let at = self.elapsed();
        let mut state = self.state.lock();
        for arg in args {
            state.resolve(arg, at)?;
        }
        state.history.push(format!("execute_script:{script}"));
        Ok(serde_json::Value::Null)
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let state = self.state.lock();
        state.check_open()?;
        Ok(state.url.clone())
    }

    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        state.url = url.to_string();
        state.frame = FrameContext::top();
        state.history.push(format!("navigate:{url}"));
        Ok(())
    }

    async fn refresh(&self) -> ProbeResult<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        state.frame = FrameContext::top();
        state.history.push("refresh".to_string());
        Ok(())
    }
}
