//! Keycloak login page shown by a multi-user installation.

use tracing::debug;

use crate::config::Settings;
use crate::engine::WaitEngine;
use crate::locator::Locator;
use crate::page_object::PageObject;
use crate::result::ProbeResult;

const FORM_ID: &str = "kc-form-login";
const USERNAME_ID: &str = "username";
const PASSWORD_ID: &str = "password";
const LOGIN_BUTTON_ID: &str = "kc-login";

/// Login page object
#[derive(Debug, Clone)]
pub struct LoginPage {
    engine: WaitEngine,
}

impl LoginPage {
    /// Create a page object driving `engine`
    #[must_use]
    pub const fn new(engine: WaitEngine) -> Self {
        Self { engine }
    }

    /// Login form
    #[must_use]
    pub fn form_locator() -> Locator {
        Locator::id(FORM_ID)
    }

    /// User name input
    #[must_use]
    pub fn username_locator() -> Locator {
        Locator::id(USERNAME_ID)
    }

    /// Password input
    #[must_use]
    pub fn password_locator() -> Locator {
        Locator::id(PASSWORD_ID)
    }

    /// Submit button
    #[must_use]
    pub fn login_button_locator() -> Locator {
        Locator::id(LOGIN_BUTTON_ID)
    }

    /// Open the IDE base URL and wait for the login form.
    ///
    /// Uses the page load timeout, since this is a full navigation.
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn open(&self, settings: &Settings) -> ProbeResult<()> {
        debug!("LoginPage.open {}", settings.base_url);
        self.engine.navigate(&settings.base_url).await?;
        self.engine
            .wait_visibility(&Self::form_locator(), settings.load_page_timeout)
            .await
            .map(|_| ())
    }

    /// Wait for the login form
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn wait_login_form(&self) -> ProbeResult<()> {
        debug!("LoginPage.wait_login_form");
        self.wait_loaded().await
    }

    /// Type the user name
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn input_username(&self, username: &str) -> ProbeResult<()> {
        debug!("LoginPage.input_username username: {username:?}");
        self.engine
            .enter_value(&Self::username_locator(), username, self.engine.default_timeout())
            .await
    }

    /// Type the password
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn input_password(&self, password: &str) -> ProbeResult<()> {
        debug!("LoginPage.input_password");
        self.engine
            .enter_value(&Self::password_locator(), password, self.engine.default_timeout())
            .await
    }

    /// Submit the form
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn click_login(&self) -> ProbeResult<()> {
        debug!("LoginPage.click_login");
        self.engine
            .wait_and_click(&Self::login_button_locator(), self.engine.default_timeout())
            .await
    }

    /// Fill in the credentials from `settings` and submit
    ///
    /// # Errors
    ///
    /// [`crate::ProbeError::Timeout`] or driver errors.
    pub async fn login(&self, settings: &Settings) -> ProbeResult<()> {
        debug!("LoginPage.login");
        self.wait_login_form().await?;
        self.input_username(&settings.username).await?;
        self.input_password(&settings.password).await?;
        self.click_login().await
    }
}

impl PageObject for LoginPage {
    fn ready_locator(&self) -> Locator {
        Self::form_locator()
    }

    fn engine(&self) -> &WaitEngine {
        &self.engine
    }

    fn page_name(&self) -> &str {
        "LoginPage"
    }
}
