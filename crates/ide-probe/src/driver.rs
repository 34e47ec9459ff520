//! BrowserDriver - abstract browser automation boundary
//!
//! The wait engine only orchestrates calls through this trait; it implements
//! no automation protocol itself. A WebDriver client, a CDP client or the
//! scripted [`MockDriver`] can sit behind it.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────────────┐
//! │ Page objects │───►│  WaitEngine  │───►│ dyn BrowserDriver        │
//! │ (preview,    │    │ (polling,    │    │  ├─ WebDriver/CDP client │
//! │  login)      │    │  frames)     │    │  └─ MockDriver (tests)   │
//! └──────────────┘    └──────────────┘    └──────────────────────────┘
//! ```
//!
//! Drivers are session handles: every method takes `&self` and uses interior
//! state, so one session can be shared by the engine and the page objects
//! built on it. Calls against one session are strictly sequential.

mod mock;

pub use mock::{MockDriver, MockElement, Visibility};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::result::ProbeResult;

/// Reference to an element in the current document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element id
    pub id: String,
    /// Locator the element was found with
    pub locator: Locator,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, locator: Locator) -> Self {
        Self {
            id: id.into(),
            locator,
        }
    }
}

/// Browser automation primitives the engine builds on.
///
/// Implementations report failures with the [`crate::ProbeError`] taxonomy:
/// `StaleElement`/`NotInteractable`/`ClickIntercepted` for transient element
/// states, `InvalidLocator` for malformed selectors, `SessionClosed` when the
/// browser is gone, `Driver` for anything else.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// All elements matching `locator` in the current frame context
    async fn find_elements(&self, locator: &Locator) -> ProbeResult<Vec<ElementHandle>>;

    /// First element matching `locator`, if any
    async fn find_element(&self, locator: &Locator) -> ProbeResult<Option<ElementHandle>> {
        Ok(self.find_elements(locator).await?.into_iter().next())
    }

    /// Whether the element is rendered and visible
    async fn is_displayed(&self, element: &ElementHandle) -> ProbeResult<bool>;

    /// Click the element
    async fn click(&self, element: &ElementHandle) -> ProbeResult<()>;

    /// Clear an editable element
    async fn clear(&self, element: &ElementHandle) -> ProbeResult<()>;

    /// Type text into the element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ProbeResult<()>;

    /// Read an attribute or property (`None` if unset)
    async fn attribute(&self, element: &ElementHandle, name: &str) -> ProbeResult<Option<String>>;

    /// Visible text of the element
    async fn text(&self, element: &ElementHandle) -> ProbeResult<String>;

    /// Address the document inside the given frame element
    async fn switch_to_frame(&self, element: &ElementHandle) -> ProbeResult<()>;

    /// Address the top-level document
    async fn switch_to_default_content(&self) -> ProbeResult<()>;

    /// Execute a script; elements are passed as `arguments[i]`
    async fn execute_script(
        &self,
        script: &str,
        args: &[ElementHandle],
    ) -> ProbeResult<serde_json::Value>;

    /// Current page URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Navigate to URL
    async fn navigate(&self, url: &str) -> ProbeResult<()>;

    /// Reload the page
    async fn refresh(&self) -> ProbeResult<()>;
}
