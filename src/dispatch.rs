//! Side effects for a decoded notification.
//!
//! Two independent outputs per notification:
//!
//! - **Clipboard**: the extracted code, only when one was found.
//! - **Desktop notification**: the full message body, always.
//!
//! A failure in one never suppresses the other. Both outputs sit behind
//! small traits so the pipeline runs against in-memory sinks in tests.

#[cfg(unix)]
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::envelope::Notification;
use crate::error::PipelineError;
use crate::extract::extract_code;

/// Destination for extracted codes.
pub trait ClipboardSink {
    /// Overwrite the clipboard's text content.
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// Destination for desktop notifications. Fire-and-forget.
pub trait NotificationSink {
    /// Raise one notification.
    fn notify(&mut self, title: &str, message: &str, app_name: &str, timeout: Duration)
        -> Result<()>;
}

/// Fixed presentation of every desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationStyle {
    /// Title token shown above the body.
    pub title: String,
    /// Application identity.
    pub app_name: String,
    /// Auto-dismiss timeout.
    pub timeout: Duration,
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self {
            title: crate::constants::NOTIFICATION_TITLE.to_string(),
            app_name: crate::constants::APP_NAME.to_string(),
            timeout: Duration::from_secs(crate::constants::NOTIFICATION_TIMEOUT_SECS),
        }
    }
}

/// Outcome of dispatching one notification.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Extracted code; empty when none was found.
    pub code: String,
    /// Clipboard was written successfully.
    pub clipboard_written: bool,
    /// Desktop notification was raised successfully.
    pub notified: bool,
    /// Side effects that failed.
    pub errors: Vec<PipelineError>,
}

/// Runs extraction and both side effects for each notification.
#[derive(Debug)]
pub struct Dispatcher<C, N> {
    clipboard: C,
    notifier: N,
    style: NotificationStyle,
}

impl<C: ClipboardSink, N: NotificationSink> Dispatcher<C, N> {
    /// Create a dispatcher over the given sinks.
    pub fn new(clipboard: C, notifier: N, style: NotificationStyle) -> Self {
        Self {
            clipboard,
            notifier,
            style,
        }
    }

    /// Extract the code from `notification.message` and fire both side
    /// effects.
    ///
    /// Failures are collected in the report and logged; they never abort
    /// the other side effect.
    pub fn dispatch(&mut self, notification: &Notification) -> DispatchReport {
        let mut report = DispatchReport {
            code: extract_code(&notification.message),
            ..DispatchReport::default()
        };

        if !report.code.is_empty() {
            match self.clipboard.set_text(&report.code) {
                Ok(()) => {
                    log::info!("Copied code {} to clipboard", report.code);
                    report.clipboard_written = true;
                }
                Err(e) => {
                    let err = PipelineError::ClipboardUnavailable(format!("{e:#}"));
                    log::warn!("{}", err);
                    report.errors.push(err);
                }
            }
        }

        match self.notifier.notify(
            &self.style.title,
            &notification.message,
            &self.style.app_name,
            self.style.timeout,
        ) {
            Ok(()) => report.notified = true,
            Err(e) => {
                let err = PipelineError::NotificationUnavailable(format!("{e:#}"));
                log::warn!("{}", err);
                report.errors.push(err);
            }
        }

        report
    }

    /// Borrow the clipboard sink.
    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    /// Borrow the notification sink.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}

// =============================================================================
// System sinks
// =============================================================================

/// OS clipboard via `arboard`.
///
/// The handle is opened on first use and kept: on X11 and Wayland the
/// clipboard contents are only served while an owner is alive.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClipboard")
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl SystemClipboard {
    /// Create a clipboard sink. Nothing is opened until the first write.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().context("could not access clipboard")?);
        }
        let Some(clipboard) = self.inner.as_mut() else {
            anyhow::bail!("clipboard handle missing");
        };
        if let Err(e) = clipboard.set_text(text.to_string()) {
            // Drop the handle so the next write reopens it.
            self.inner = None;
            return Err(e).context("clipboard write failed");
        }
        Ok(())
    }
}

/// Desktop notifications through the platform's notification command.
///
/// - Linux / BSD: `notify-send`
/// - macOS: `osascript` (`display notification`); the timeout is left to
///   Notification Center
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn notify(
        &mut self,
        title: &str,
        message: &str,
        app_name: &str,
        timeout: Duration,
    ) -> Result<()> {
        #[cfg(target_os = "macos")]
        {
            let _ = timeout;
            notify_macos(title, message, app_name)
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            notify_freedesktop(title, message, app_name, timeout)
        }

        #[cfg(not(unix))]
        {
            let _ = (title, message, app_name, timeout);
            anyhow::bail!("desktop notifications are not supported on this platform")
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notify_freedesktop(title: &str, message: &str, app_name: &str, timeout: Duration) -> Result<()> {
    let output = Command::new("notify-send")
        .arg(format!("--app-name={app_name}"))
        .arg(format!("--expire-time={}", timeout.as_millis()))
        .arg("--")
        .arg(title)
        .arg(message)
        .output()
        .context("failed to run notify-send")?;
    check_status("notify-send", &output)
}

#[cfg(target_os = "macos")]
fn notify_macos(title: &str, message: &str, app_name: &str) -> Result<()> {
    let script = format!(
        r#"display notification "{}" with title "{}" subtitle "{}""#,
        escape_applescript(message),
        escape_applescript(title),
        escape_applescript(app_name),
    );
    let output = Command::new("osascript")
        .args(["-e", &script])
        .output()
        .context("failed to run osascript")?;
    check_status("osascript", &output)
}

/// Escape backslashes and quotes for an AppleScript string literal.
#[cfg_attr(not(target_os = "macos"), allow(dead_code, reason = "macOS only"))]
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg_attr(not(unix), allow(dead_code, reason = "unix only"))]
fn check_status(program: &str, output: &std::process::Output) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{} exited with {}: {}", program, output.status, stderr.trim())
    }
}
