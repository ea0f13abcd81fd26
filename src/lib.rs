//! macOS notarization helpers for kodegen bundles
//!
//! Zips an app bundle, submits it through `xcrun altool`, polls the
//! human-readable status report until Apple is done, and staples the ticket.
//!
//! The pieces are usable on their own:
//! - [`temp::with_temp_dir`] - scratch directory removed on every exit path
//! - [`secret::Secret`] - credential string masked in debug output
//! - [`report::parse_notarization_info`] - permissive report parser
//! - [`archive::zip_app`] - `zip` wrapper producing the upload archive

#[macro_use]
pub mod output;

pub mod archive;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod secret;
pub mod submit;
pub mod temp;

// Re-export public API
pub use archive::zip_app;
pub use config::{AppleIdCredentials, NotarizeConfig};
pub use error::{NotarizeError, Result};
pub use report::{NotarizationInfo, NotarizationStatus, parse_notarization_info};
pub use secret::{Secret, is_secret, make_secret};
pub use submit::{NotarizeOptions, notarize, staple_app, wait_for_notarization};
pub use temp::with_temp_dir;
