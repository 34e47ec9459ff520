//! Page objects for the cloud IDE.

mod login;
mod preview;

pub use login::LoginPage;
pub use preview::PreviewWidget;
