// Shared test doubles for the integration tests.
//
// Both sinks append to one shared journal so tests can assert the relative
// order of side effects across frames.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use codemsg::channel::ChannelTarget;
use codemsg::dispatch::NotificationStyle;
use codemsg::ws::TlsPolicy;
use codemsg::{ClipboardSink, Dispatcher, NotificationSink, Session};

/// One recorded side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Clipboard(String),
    Notify { title: String, body: String },
}

pub type Journal = Arc<Mutex<Vec<Effect>>>;

pub struct RecordingClipboard(pub Journal);

impl ClipboardSink for RecordingClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(Effect::Clipboard(text.to_string()));
        Ok(())
    }
}

pub struct RecordingNotifier(pub Journal);

impl NotificationSink for RecordingNotifier {
    fn notify(
        &mut self,
        title: &str,
        message: &str,
        _app_name: &str,
        _timeout: Duration,
    ) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(Effect::Notify {
            title: title.to_string(),
            body: message.to_string(),
        });
        Ok(())
    }
}

/// Session over recording sinks, plus the journal they write to.
pub fn recording_session(url: &str, token: &str) -> (Session<RecordingClipboard, RecordingNotifier>, Journal) {
    let journal: Journal = Arc::default();
    let dispatcher = Dispatcher::new(
        RecordingClipboard(Arc::clone(&journal)),
        RecordingNotifier(Arc::clone(&journal)),
        NotificationStyle::default(),
    );
    let target = ChannelTarget {
        url: url.to_string(),
        token: token.to_string(),
        tls: TlsPolicy::Verify,
    };
    (Session::new(target, dispatcher), journal)
}

pub fn clipboard_writes(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Effect::Clipboard(text) => Some(text.clone()),
            Effect::Notify { .. } => None,
        })
        .collect()
}

pub fn notification_bodies(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Effect::Notify { body, .. } => Some(body.clone()),
            Effect::Clipboard(_) => None,
        })
        .collect()
}
