//! Synthetic input source.
//!
//! Events are pushed in through an [`Injector`] instead of an OS hook. This is
//! the collector on targets without a hook backend, and the way tests drive a
//! pipeline.

use crate::collector::{CollectorConfig, CollectorError, InputEvent, InputSource};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A collector whose events come from [`Injector`] handles.
pub struct SyntheticCollector {
    config: CollectorConfig,
    sender: Option<Sender<InputEvent>>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
}

impl SyntheticCollector {
    /// Create a new synthetic collector.
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            config,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle for pushing events into this collector.
    ///
    /// Returns `None` once the collector has been stopped.
    pub fn injector(&self) -> Option<Injector> {
        self.sender.as_ref().map(|sender| Injector {
            config: self.config.clone(),
            sender: sender.clone(),
            running: self.running.clone(),
        })
    }
}

impl InputSource for SyntheticCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop accepting events. The channel disconnects once every
    /// outstanding injector is dropped.
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.sender = None;
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<InputEvent> {
        &self.receiver
    }
}

/// A cloneable handle that feeds events to a [`SyntheticCollector`].
#[derive(Clone)]
pub struct Injector {
    config: CollectorConfig,
    sender: Sender<InputEvent>,
    running: Arc<AtomicBool>,
}

impl Injector {
    /// Deliver an event as a hook callback would.
    ///
    /// Returns `false` if the event was not delivered: the collector is not
    /// running, the event is outside its configuration, or the receiving side
    /// is gone.
    pub fn send(&self, event: InputEvent) -> bool {
        if !self.running.load(Ordering::SeqCst) || !self.config.accepts(&event) {
            return false;
        }
        self.sender.send(event).is_ok()
    }
}

/// There is no permission gate without an OS hook.
pub fn check_permission() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RawKey;

    #[test]
    fn test_injector_requires_running() {
        let mut collector = SyntheticCollector::new(CollectorConfig::keyboard());
        let injector = collector.injector().unwrap();

        assert!(!injector.send(InputEvent::KeyDown(RawKey::Char('a'))));

        collector.start().unwrap();
        assert!(injector.send(InputEvent::KeyDown(RawKey::Char('a'))));
        assert_eq!(
            collector.receiver().try_recv().ok(),
            Some(InputEvent::KeyDown(RawKey::Char('a')))
        );
    }

    #[test]
    fn test_injector_respects_config() {
        let mut collector = SyntheticCollector::new(CollectorConfig::keyboard());
        collector.start().unwrap();
        let injector = collector.injector().unwrap();

        assert!(!injector.send(InputEvent::Move { x: 1, y: 1 }));
        assert!(collector.receiver().try_recv().is_err());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut collector = SyntheticCollector::new(CollectorConfig::default());
        collector.start().unwrap();
        assert!(matches!(
            collector.start(),
            Err(CollectorError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_stop_disconnects_after_injectors_drop() {
        let mut collector = SyntheticCollector::new(CollectorConfig::default());
        collector.start().unwrap();
        let injector = collector.injector().unwrap();

        collector.stop();
        assert!(!collector.is_running());
        assert!(collector.injector().is_none());

        drop(injector);
        assert!(matches!(
            collector.receiver().try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        ));
    }
}
