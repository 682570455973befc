//! Element State Oracle
//!
//! Pages disable controls in several incompatible ways: the `disabled`
//! attribute, `aria-disabled`, a styling class, or only the browser's native
//! state. [`StateOracle::classify`] checks them in a fixed order and reports
//! which signal decided.
//!
//! ## Signal order
//!
//! | # | Signal | Disabled when | Enabled when |
//! |---|--------|---------------|--------------|
//! | 1 | `disabled` attribute | `true` (any case), empty, `disabled` | `false` |
//! | 2 | `aria-disabled` | `true` | `false` |
//! | 3 | class token | token in the disabling set | - |
//! | 4 | native state | browser reports disabled | browser reports enabled |
//!
//! An absent attribute is not evidence. A present attribute with any other
//! value is ignored and the next signal is consulted.

use crate::driver::{BrowserControl, ElementHandle};
use crate::result::HoldfastResult;
use crate::wait::Poller;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Class tokens treated as disabling by default
pub const DEFAULT_DISABLED_CLASSES: [&str; 3] = ["disabled", "btn-disabled", "is-disabled"];

/// The signal that decided enablement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "signal", content = "detail")]
pub enum DisabledSignal {
    /// The `disabled` attribute
    DisabledAttribute,
    /// The `aria-disabled` attribute
    AriaDisabled,
    /// A disabling class token
    DisablingClass(String),
    /// The browser's native enabled state
    NativeState,
}

impl fmt::Display for DisabledSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisabledAttribute => write!(f, "disabled attribute"),
            Self::AriaDisabled => write!(f, "aria-disabled"),
            Self::DisablingClass(token) => write!(f, "class {token}"),
            Self::NativeState => write!(f, "native state"),
        }
    }
}

/// Enabled or disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Enablement {
    /// Accepts input
    Enabled,
    /// Refuses input
    Disabled,
}

/// Rendered or not
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    /// Displayed
    Visible,
    /// Not displayed
    Hidden,
}

/// Whether a click could reach the element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interactability {
    /// Displayed and enabled within the wait
    Interactable,
    /// Not displayed and enabled within the wait
    Blocked,
}

/// Derived classification of one element at one moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateVerdict {
    /// Enabled or disabled
    pub enablement: Enablement,
    /// Visible or hidden
    pub visibility: Visibility,
    /// Interactable or blocked
    pub interactability: Interactability,
    /// Signal that decided enablement
    pub decided_by: DisabledSignal,
}

impl StateVerdict {
    /// Whether the element is enabled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enablement == Enablement::Enabled
    }

    /// Whether the element is disabled
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.enablement == Enablement::Disabled
    }

    /// Whether the element is visible
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    /// Whether a click could reach the element
    #[must_use]
    pub fn is_interactable(&self) -> bool {
        self.interactability == Interactability::Interactable
    }
}

impl fmt::Display for StateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}/{:?} (by {})",
            self.enablement, self.visibility, self.interactability, self.decided_by
        )
    }
}

/// Prioritized enabled/visible/interactable classification
#[derive(Debug, Clone)]
pub struct StateOracle {
    disabled_classes: Vec<String>,
    poller: Poller,
}

impl StateOracle {
    /// Create an oracle with the default disabling classes. `poller` bounds
    /// the interactability wait.
    #[must_use]
    pub fn new(poller: Poller) -> Self {
        Self {
            disabled_classes: DEFAULT_DISABLED_CLASSES.iter().map(|c| (*c).to_string()).collect(),
            poller,
        }
    }

    /// Replace the disabling class set
    #[must_use]
    pub fn with_disabled_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// The disabling class set
    #[must_use]
    pub fn disabled_classes(&self) -> &[String] {
        &self.disabled_classes
    }

    /// The poller used for the interactability wait
    #[must_use]
    pub const fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Decide enablement alone, without waiting.
    ///
    /// # Errors
    ///
    /// Propagates collaborator errors, including drift on a stale handle.
    pub fn enablement<B>(
        &self,
        browser: &B,
        handle: &ElementHandle,
    ) -> HoldfastResult<(Enablement, DisabledSignal)>
    where
        B: BrowserControl + ?Sized,
    {
        if let Some(value) = browser.attribute(handle, "disabled")? {
            let value = value.trim();
            if value.is_empty()
                || value.eq_ignore_ascii_case("true")
                || value.eq_ignore_ascii_case("disabled")
            {
                return Ok((Enablement::Disabled, DisabledSignal::DisabledAttribute));
            }
            if value.eq_ignore_ascii_case("false") {
                return Ok((Enablement::Enabled, DisabledSignal::DisabledAttribute));
            }
        }

        if let Some(value) = browser.attribute(handle, "aria-disabled")? {
            let value = value.trim();
            if value.eq_ignore_ascii_case("true") {
                return Ok((Enablement::Disabled, DisabledSignal::AriaDisabled));
            }
            if value.eq_ignore_ascii_case("false") {
                return Ok((Enablement::Enabled, DisabledSignal::AriaDisabled));
            }
        }

        if let Some(classes) = browser.attribute(handle, "class")? {
            if let Some(token) = classes
                .split_whitespace()
                .find(|token| self.disabled_classes.iter().any(|c| c == token))
            {
                return Ok((
                    Enablement::Disabled,
                    DisabledSignal::DisablingClass(token.to_string()),
                ));
            }
        }

        let enablement = if browser.is_native_enabled(handle)? {
            Enablement::Enabled
        } else {
            Enablement::Disabled
        };
        Ok((enablement, DisabledSignal::NativeState))
    }

    /// Classify `handle`.
    ///
    /// Enablement and visibility are read once up front. When the element is
    /// not both displayed and enabled, the readings are repeated through the
    /// poller so a transiently hidden element is not reported blocked. The
    /// verdict carries the last readings taken.
    ///
    /// # Errors
    ///
    /// Propagates collaborator errors from the first reading, and non-drift
    /// errors from the wait.
    pub fn classify<B>(&self, browser: &B, handle: &ElementHandle) -> HoldfastResult<StateVerdict>
    where
        B: BrowserControl + ?Sized,
    {
        let mut reading = self.enablement(browser, handle)?;
        let mut displayed = browser.is_displayed(handle)?;

        let interactable = if displayed && reading.0 == Enablement::Enabled {
            true
        } else {
            let waited_for = format!("{handle} displayed and enabled");
            self.poller
                .await_condition(&waited_for, || {
                    displayed = browser.is_displayed(handle)?;
                    reading = self.enablement(browser, handle)?;
                    Ok(displayed && reading.0 == Enablement::Enabled)
                })?
                .is_satisfied()
        };

        let (enablement, decided_by) = reading;
        let verdict = StateVerdict {
            enablement,
            visibility: if displayed {
                Visibility::Visible
            } else {
                Visibility::Hidden
            },
            interactability: if interactable {
                Interactability::Interactable
            } else {
                Interactability::Blocked
            },
            decided_by,
        };
        debug!(%handle, %verdict, "classified element");
        Ok(verdict)
    }
}
