//! Configuration
//!
//! [`HoldfastConfig`] is read from YAML (camelCase keys, every key optional),
//! then overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HOLDFAST_TIMEOUT_SECONDS` | `timeoutSeconds` |
//! | `HOLDFAST_POLL_INTERVAL_MILLIS` | `pollIntervalMillis` |
//! | `HOLDFAST_SETTLE_BUFFER_MILLIS` | `settleBufferMillis` |
//! | `TEST_BROWSER` | `browser` |
//! | `CHROME_PATH` | `chromiumPath` |
//!
//! ```yaml
//! timeoutSeconds: 15
//! pollIntervalMillis: 250
//! disabledClasses: [disabled, btn-disabled, is-disabled, k-state-disabled]
//! artifactDir: target/screenshots
//! ```

use crate::observe::DEFAULT_DIALOG_SELECTOR;
use crate::oracle::DEFAULT_DISABLED_CLASSES;
use crate::result::{HoldfastError, HoldfastResult};
use crate::wait::{
    WaitConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SETTLE_BUFFER_MS, DEFAULT_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding the timeout
pub const ENV_TIMEOUT_SECONDS: &str = "HOLDFAST_TIMEOUT_SECONDS";
/// Environment variable overriding the poll interval
pub const ENV_POLL_INTERVAL_MILLIS: &str = "HOLDFAST_POLL_INTERVAL_MILLIS";
/// Environment variable overriding the settle buffer
pub const ENV_SETTLE_BUFFER_MILLIS: &str = "HOLDFAST_SETTLE_BUFFER_MILLIS";
/// Environment variable selecting the browser
pub const ENV_TEST_BROWSER: &str = "TEST_BROWSER";
/// Environment variable pointing at the browser executable
pub const ENV_CHROME_PATH: &str = "CHROME_PATH";

/// Browsers the Chromium collaborator can drive
pub const SUPPORTED_BROWSERS: [&str; 2] = ["chrome", "chromium"];

/// Browser used when none, or an unsupported one, is requested
pub const DEFAULT_BROWSER: &str = "chrome";

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoldfastConfig {
    /// Wait timeout in seconds
    pub timeout_seconds: u64,
    /// Poll interval in milliseconds
    pub poll_interval_millis: u64,
    /// Sleep after the page reports ready, in milliseconds
    pub settle_buffer_millis: u64,
    /// Class tokens that mark a control disabled
    pub disabled_classes: Vec<String>,
    /// CSS selector counting open dialogs
    pub dialog_selector: String,
    /// Directory for failure screenshots
    pub artifact_dir: PathBuf,
    /// Browser to launch
    pub browser: String,
    /// Run the browser headless
    pub headless: bool,
    /// Browser executable, when auto-detection is not enough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromium_path: Option<PathBuf>,
}

impl Default for HoldfastConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            poll_interval_millis: DEFAULT_POLL_INTERVAL_MS,
            settle_buffer_millis: DEFAULT_SETTLE_BUFFER_MS,
            disabled_classes: DEFAULT_DISABLED_CLASSES.iter().map(|c| (*c).to_string()).collect(),
            dialog_selector: DEFAULT_DIALOG_SELECTOR.to_string(),
            artifact_dir: PathBuf::from("Screenshots"),
            browser: DEFAULT_BROWSER.to_string(),
            headless: true,
            chromium_path: None,
        }
    }
}

impl HoldfastConfig {
    /// Parse YAML without applying overrides
    ///
    /// # Errors
    ///
    /// Returns `Yaml` for malformed input and `Config` for invalid values.
    pub fn from_yaml(yaml: &str) -> HoldfastResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file without applying overrides
    ///
    /// # Errors
    ///
    /// Returns `Io` when the file cannot be read, otherwise as [`Self::from_yaml`].
    pub fn from_file(path: &Path) -> HoldfastResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Load the effective configuration: file (or defaults), then the
    /// process environment, then validation.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or when an
    /// override is malformed or the result is invalid.
    pub fn load(path: Option<&Path>) -> HoldfastResult<Self> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, typically the process environment
    ///
    /// An unsupported `TEST_BROWSER` (firefox, edge, ...) logs a warning and
    /// selects [`DEFAULT_BROWSER`], so CI matrices that set it keep running.
    ///
    /// # Errors
    ///
    /// Returns `Config` when a numeric override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> HoldfastResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let numeric = |key: &str| -> HoldfastResult<Option<u64>> {
            lookup(key)
                .map(|raw| {
                    raw.trim().parse::<u64>().map_err(|e| {
                        HoldfastError::config(format!("{key}={raw:?} is not a whole number: {e}"))
                    })
                })
                .transpose()
        };

        if let Some(v) = numeric(ENV_TIMEOUT_SECONDS)? {
            self.timeout_seconds = v;
        }
        if let Some(v) = numeric(ENV_POLL_INTERVAL_MILLIS)? {
            self.poll_interval_millis = v;
        }
        if let Some(v) = numeric(ENV_SETTLE_BUFFER_MILLIS)? {
            self.settle_buffer_millis = v;
        }
        if let Some(browser) = lookup(ENV_TEST_BROWSER).filter(|b| !b.trim().is_empty()) {
            let browser = browser.trim().to_ascii_lowercase();
            if SUPPORTED_BROWSERS.contains(&browser.as_str()) {
                self.browser = browser;
            } else {
                warn!(
                    requested = %browser,
                    fallback = DEFAULT_BROWSER,
                    "unsupported TEST_BROWSER, falling back"
                );
                self.browser = DEFAULT_BROWSER.to_string();
            }
        }
        if let Some(path) = lookup(ENV_CHROME_PATH).filter(|p| !p.trim().is_empty()) {
            self.chromium_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first invalid value.
    pub fn validate(&self) -> HoldfastResult<()> {
        if self.poll_interval_millis == 0 {
            return Err(HoldfastError::config("pollIntervalMillis must be positive"));
        }
        if self.poll_interval_millis > self.timeout_seconds.saturating_mul(1000) {
            return Err(HoldfastError::config(format!(
                "pollIntervalMillis ({}) exceeds timeoutSeconds ({})",
                self.poll_interval_millis, self.timeout_seconds
            )));
        }
        if self.dialog_selector.trim().is_empty() {
            return Err(HoldfastError::config("dialogSelector must not be empty"));
        }
        if !SUPPORTED_BROWSERS.contains(&self.browser.as_str()) {
            return Err(HoldfastError::config(format!(
                "unsupported browser {:?}, expected one of {}",
                self.browser,
                SUPPORTED_BROWSERS.join(", ")
            )));
        }
        Ok(())
    }

    /// Timing as a [`WaitConfig`]
    #[must_use]
    pub const fn wait_config(&self) -> WaitConfig {
        WaitConfig::new(
            Duration::from_secs(self.timeout_seconds),
            Duration::from_millis(self.poll_interval_millis),
        )
        .with_settle_buffer(Duration::from_millis(self.settle_buffer_millis))
    }

    /// Serialize to YAML
    ///
    /// # Errors
    ///
    /// Returns `Yaml` if serialization fails.
    pub fn to_yaml(&self) -> HoldfastResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
