//! Chromium collaborator over the Chrome DevTools Protocol
//!
//! [`ChromiumBrowser`] implements the synchronous [`BrowserControl`] trait on
//! top of `chromiumoxide`. It owns a tokio runtime and blocks on each CDP
//! call, so the polling code above it never sees async.
//!
//! Handles are minted by tagging matched nodes with a `data-holdfast-id`
//! attribute. A navigation replaces the document and the tags with it, so a
//! handle from a previous page fails with `StaleElement`.

use crate::config::HoldfastConfig;
use crate::driver::{BrowserControl, ElementHandle, Scope};
use crate::locator::Locator;
use crate::result::{HoldfastError, HoldfastResult};
use crate::scenario::SessionFactory;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info};

/// Attribute carrying handle ids in the page
const HANDLE_ATTRIBUTE: &str = "data-holdfast-id";

/// Chrome's generic server error code, used for lost contexts and nodes
const SERVER_ERROR: i64 = -32000;

/// Messages Chrome sends when a navigation replaces the page under a request
const TRANSIENT_MESSAGES: [&str; 4] = [
    "execution context was destroyed",
    "cannot find context with specified id",
    "could not find node with given id",
    "no node with given id found",
];

fn is_transient(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    TRANSIENT_MESSAGES.iter().any(|known| message.contains(known))
}

/// Map transport errors onto the drift / fatal split.
///
/// Lost execution contexts, lost nodes and vanished frames happen while a
/// page navigates and are retried like any other drift. Socket and channel
/// failures mean the session is gone.
fn cdp_error(e: CdpError) -> HoldfastError {
    match e {
        CdpError::JavascriptException(details) => HoldfastError::ScriptFailed {
            message: details.text.clone(),
        },
        CdpError::Timeout => HoldfastError::ScriptFailed {
            message: "CDP request timed out".to_string(),
        },
        CdpError::Chrome(error) if error.code == SERVER_ERROR && is_transient(&error.message) => {
            HoldfastError::ScriptFailed {
                message: error.message,
            }
        }
        CdpError::ChromeMessage(message) if is_transient(&message) => {
            HoldfastError::ScriptFailed { message }
        }
        CdpError::FrameNotFound(frame) => HoldfastError::ElementGone {
            message: format!("frame {} detached", frame.inner()),
        },
        other => HoldfastError::session(other.to_string()),
    }
}

fn handle_selector(id: &str) -> String {
    format!("[{HANDLE_ATTRIBUTE}={id:?}]")
}

/// Chromium session
#[derive(Debug)]
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
    runtime: tokio::runtime::Runtime,
}

impl ChromiumBrowser {
    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns `BrowserLaunch` if the runtime, the browser or the page cannot
    /// be created.
    pub fn launch(config: &HoldfastConfig) -> HoldfastResult<Self> {
        let launch_error = |message: String| HoldfastError::BrowserLaunch { message };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| launch_error(e.to_string()))?;

        let mut builder = CdpConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(launch_error)?;

        let (browser, page, handler) = runtime.block_on(async {
            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| launch_error(e.to_string()))?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| launch_error(e.to_string()))?;
            Ok::<_, HoldfastError>((browser, page, handler))
        })?;

        info!(browser = %config.browser, headless = config.headless, "browser launched");
        Ok(Self {
            browser,
            page,
            handler,
            runtime,
        })
    }

    /// Close the browser and stop the event loop
    ///
    /// # Errors
    ///
    /// Returns `Session` if the browser does not shut down cleanly.
    pub fn close(mut self) -> HoldfastResult<()> {
        let result = self.runtime.block_on(self.browser.close());
        self.handler.abort();
        result.map(|_| ()).map_err(cdp_error)
    }

    fn eval(&self, expression: String) -> HoldfastResult<Value> {
        let result = self
            .runtime
            .block_on(self.page.evaluate(expression))
            .map_err(cdp_error)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Evaluate `body` with `el` bound to the handle's node
    fn eval_on(&self, handle: &ElementHandle, body: &str) -> HoldfastResult<Value> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel:?}); \
             if (!el) return {{ stale: true }}; return {{ value: ({body}) }}; }})()",
            sel = handle_selector(handle.id()),
        );
        let reply = self.eval(expression)?;
        if reply.get("stale").is_some() {
            return Err(HoldfastError::StaleElement {
                handle: handle.id().to_string(),
            });
        }
        Ok(reply.get("value").cloned().unwrap_or(Value::Null))
    }

    fn query(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Vec<ElementHandle>> {
        let root = match scope {
            Scope::Document => "document".to_string(),
            Scope::Within(handle) => {
                format!("document.querySelector({:?})", handle_selector(handle.id()))
            }
        };
        let prefix = uuid::Uuid::new_v4().to_string();
        let expression = format!(
            "(() => {{ const root = {root}; if (!root) return {{ stale: true }}; \
             let found; try {{ found = {query}; }} \
             catch (e) {{ return {{ invalid: String(e) }}; }} \
             return {{ ids: found.map((el, i) => {{ \
               if (!el.hasAttribute({attr:?})) el.setAttribute({attr:?}, {prefix:?} + '-' + i); \
               return el.getAttribute({attr:?}); }}) }}; }})()",
            query = locator.to_query_all("root"),
            attr = HANDLE_ATTRIBUTE,
        );
        let reply = self.eval(expression)?;
        if let Some(message) = reply.get("invalid").and_then(Value::as_str) {
            return Err(HoldfastError::InvalidSelector {
                selector: locator.to_string(),
                message: message.to_string(),
            });
        }
        if reply.get("stale").is_some() {
            if let Scope::Within(handle) = scope {
                return Err(HoldfastError::StaleElement {
                    handle: handle.id().to_string(),
                });
            }
        }
        let ids = reply
            .get("ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(ElementHandle::new)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }
}

impl BrowserControl for ChromiumBrowser {
    fn find_one(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Option<ElementHandle>> {
        Ok(self.query(locator, scope)?.into_iter().next())
    }

    fn find_all(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Vec<ElementHandle>> {
        self.query(locator, scope)
    }

    fn attribute(&self, handle: &ElementHandle, name: &str) -> HoldfastResult<Option<String>> {
        let value = self.eval_on(handle, &format!("el.getAttribute({name:?})"))?;
        Ok(value.as_str().map(str::to_string))
    }

    fn is_displayed(&self, handle: &ElementHandle) -> HoldfastResult<bool> {
        let value = self.eval_on(
            handle,
            "!!(el.offsetWidth || el.offsetHeight || el.getClientRects().length) \
             && getComputedStyle(el).visibility !== 'hidden'",
        )?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn is_native_enabled(&self, handle: &ElementHandle) -> HoldfastResult<bool> {
        let value = self.eval_on(handle, "!el.matches(':disabled')")?;
        Ok(value.as_bool().unwrap_or(true))
    }

    fn click(&self, handle: &ElementHandle) -> HoldfastResult<()> {
        // Hit-test the centre first: CDP mouse events land on whatever is on top
        let hit = self.eval_on(
            handle,
            "(() => { el.scrollIntoView({ block: 'center' }); \
             const r = el.getBoundingClientRect(); \
             if (r.width === 0 && r.height === 0) return 'element not interactable'; \
             const top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
             return top && (top === el || el.contains(top)) ? null \
               : 'other element would receive the click: ' \
               + (top ? top.tagName.toLowerCase() : 'none'); })()",
        )?;
        if let Some(reason) = hit.as_str() {
            return Err(HoldfastError::click_blocked(reason));
        }

        self.runtime.block_on(async {
            let element = self
                .page
                .find_element(handle_selector(handle.id()))
                .await
                .map_err(|e| HoldfastError::ElementGone {
                    message: format!("{}: {e}", handle.id()),
                })?;
            element
                .click()
                .await
                .map_err(|e| HoldfastError::click_blocked(e.to_string()))?;
            Ok(())
        })
    }

    fn text(&self, handle: &ElementHandle) -> HoldfastResult<Option<String>> {
        let value = self.eval_on(handle, "el.innerText")?;
        Ok(value.as_str().map(str::to_string))
    }

    fn current_url(&self) -> HoldfastResult<String> {
        let url = self.runtime.block_on(self.page.url()).map_err(cdp_error)?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    fn evaluate_script(&self, source: &str) -> HoldfastResult<Value> {
        self.eval(source.to_string())
    }

    fn navigate(&self, url: &str) -> HoldfastResult<()> {
        debug!(url, "navigating");
        self.runtime
            .block_on(self.page.goto(url))
            .map_err(cdp_error)?;
        Ok(())
    }

    fn screenshot(&self) -> HoldfastResult<Vec<u8>> {
        use base64::Engine;

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = self
            .runtime
            .block_on(self.page.execute(params))
            .map_err(cdp_error)?;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| HoldfastError::session(format!("screenshot payload: {e}")))
    }
}

/// Launches one Chromium per scenario
#[derive(Debug, Clone)]
pub struct ChromiumSessionFactory {
    config: HoldfastConfig,
}

impl ChromiumSessionFactory {
    /// Launch browsers according to `config`
    #[must_use]
    pub const fn new(config: HoldfastConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for ChromiumSessionFactory {
    type Session = ChromiumBrowser;

    fn open(&self) -> HoldfastResult<ChromiumBrowser> {
        ChromiumBrowser::launch(&self.config)
    }

    fn close(&self, session: ChromiumBrowser) -> HoldfastResult<()> {
        session.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_selector_quotes_id() {
        assert_eq!(handle_selector("abc-0"), "[data-holdfast-id=\"abc-0\"]");
    }

    #[test]
    fn test_cdp_timeout_is_drift() {
        assert!(cdp_error(CdpError::Timeout).is_drift());
    }

    fn chrome_error(code: i64, message: &str) -> CdpError {
        CdpError::Chrome(chromiumoxide::types::Error {
            code,
            message: message.to_string(),
        })
    }

    #[test]
    fn test_destroyed_context_is_drift() {
        let err = cdp_error(chrome_error(-32000, "Execution context was destroyed."));
        assert!(err.is_drift());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_context_is_drift() {
        let err = cdp_error(chrome_error(-32000, "Cannot find context with specified id"));
        assert!(matches!(err, HoldfastError::ScriptFailed { .. }));
    }

    #[test]
    fn test_lost_node_is_drift() {
        assert!(cdp_error(chrome_error(-32000, "Could not find node with given id")).is_drift());
        assert!(cdp_error(CdpError::msg("No node with given id found")).is_drift());
    }

    #[test]
    fn test_detached_frame_is_element_gone() {
        let frame = chromiumoxide::cdp::browser_protocol::page::FrameId::new("F1");
        let err = cdp_error(CdpError::FrameNotFound(frame));
        assert!(matches!(err, HoldfastError::ElementGone { .. }));
        assert!(err.is_drift());
    }

    #[test]
    fn test_other_server_errors_stay_fatal() {
        let err = cdp_error(chrome_error(-32000, "Target closed"));
        assert!(err.is_fatal());
        assert!(cdp_error(chrome_error(-32601, "Execution context was destroyed.")).is_fatal());
    }

    #[test]
    fn test_transport_failures_are_fatal() {
        assert!(cdp_error(CdpError::NoResponse).is_fatal());
        assert!(cdp_error(CdpError::msg("websocket closed")).is_fatal());
    }
}
