//! Page Object Model support.
//!
//! A page object wraps the locators of one page or widget and exposes
//! domain actions built from [`WaitEngine`] primitives.
//!
//! # Example
//!
//! ```ignore
//! struct Dashboard {
//!     engine: WaitEngine,
//! }
//!
//! impl PageObject for Dashboard {
//!     fn ready_locator(&self) -> Locator {
//!         Locator::css("#dashboard-loaded")
//!     }
//!
//!     fn engine(&self) -> &WaitEngine {
//!         &self.engine
//!     }
//! }
//!
//! Dashboard { engine }.wait_loaded().await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::engine::WaitEngine;
use crate::locator::Locator;
use crate::result::ProbeResult;

/// A page or component in the UI
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Element whose visibility means the page is usable
    fn ready_locator(&self) -> Locator;

    /// Engine the page drives
    fn engine(&self) -> &WaitEngine;

    /// Page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Time allowed for the page to become ready
    fn load_timeout(&self) -> Duration {
        self.engine().default_timeout()
    }

    /// Wait until [`Self::ready_locator`] is visible
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] if the page never becomes ready.
    async fn wait_loaded(&self) -> ProbeResult<()> {
        debug!(page = self.page_name(), "wait_loaded");
        let locator = self.ready_locator();
        self.engine()
            .wait_visibility(&locator, self.load_timeout())
            .await
            .map(|_| ())
    }
}
