//! ide-probe: bounded wait/retry engine for cloud IDE browser tests
//!
//! Browser UIs settle asynchronously. This crate turns "eventually true" UI
//! conditions into operations that either succeed or fail with a timeout
//! naming what was awaited, within a fixed budget.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ide-probe Architecture                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────────┐    │
//! │   │ Page       │    │ WaitEngine │    │ BrowserDriver      │    │
//! │   │ objects    │───►│ wait/retry │───►│ (WebDriver client  │    │
//! │   │            │    │ frames     │    │  or MockDriver)    │    │
//! │   └────────────┘    └─────┬──────┘    └────────────────────┘    │
//! │                           │                                      │
//! │                ┌──────────┴──────────┐                           │
//! │                │ wait::poll          │                           │
//! │                │ RecoveryMachine     │                           │
//! │                └─────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ide_probe::{Locator, MockDriver, PreviewWidget, Settings, WaitEngine};
//!
//! # async fn run() -> ide_probe::ProbeResult<()> {
//! let settings = Settings::from_env();
//! ide_probe::logging::init(settings.log_level);
//!
//! let engine = WaitEngine::from_settings(Arc::new(MockDriver::new()), &settings);
//! let preview = PreviewWidget::new(engine.clone());
//! preview
//!     .wait_application_opened("http://localhost:8080", settings.default_timeout)
//!     .await?;
//! preview
//!     .wait_content_available(&Locator::css("h1.welcome"), settings.load_page_timeout, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod driver;
mod engine;
mod frame;
pub mod http;
mod locator;
pub mod logging;
mod page_object;
pub mod pages;
pub mod recovery;
mod result;
mod url_pattern;
pub mod wait;

pub use config::Settings;
pub use driver::{BrowserDriver, ElementHandle, MockDriver, MockElement, Visibility};
pub use engine::WaitEngine;
pub use frame::FrameContext;
pub use locator::{Locator, STRATEGY_CSS, STRATEGY_LINK_TEXT, STRATEGY_XPATH};
pub use logging::LogLevel;
pub use page_object::PageObject;
pub use pages::{LoginPage, PreviewWidget};
pub use recovery::{RecoveryMachine, RecoveryPolicy, RecoveryReport, RecoveryState};
pub use result::{ProbeError, ProbeResult};
pub use url_pattern::UrlPattern;
pub use wait::{AttemptConfig, WaitConfig, WaitOutcome};
