//! Window-to-window messaging.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use super::message::{Envelope, WindowMessage};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("target window is closed")]
    Closed,

    #[error("no peer window to post to")]
    NoPeer,

    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

/// A handle to another window. Handles observe a window; they never keep it alive.
pub trait PeerWindow: fmt::Debug {
    /// Origin of the window this handle points at.
    fn origin(&self) -> String;

    fn is_closed(&self) -> bool;

    fn post(&self, message: &WindowMessage) -> Result<(), TransportError>;
}

#[derive(Debug)]
struct Mailbox {
    origin: String,
    closed: bool,
    inbox: VecDeque<Envelope>,
}

/// An in-process window: owns an inbox that other windows post into through handles.
///
/// Messages are round-tripped through JSON on post, so the receiver sees exactly what a
/// real cross-window transport would deliver.
#[derive(Clone, Debug)]
pub struct LocalWindow {
    mailbox: Rc<RefCell<Mailbox>>,
}

impl LocalWindow {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            mailbox: Rc::new(RefCell::new(Mailbox {
                origin: origin.into(),
                closed: false,
                inbox: VecDeque::new(),
            })),
        }
    }

    pub fn origin(&self) -> String {
        self.mailbox.borrow().origin.clone()
    }

    /// A handle `sender` can use to post into this window.
    pub fn handle_from(&self, sender: &Self) -> Rc<dyn PeerWindow> {
        Rc::new(LocalPeer {
            target: Rc::downgrade(&self.mailbox),
            sender: Rc::downgrade(&sender.mailbox),
        })
    }

    /// Drain received messages, oldest first.
    pub fn take_messages(&self) -> Vec<Envelope> {
        self.mailbox.borrow_mut().inbox.drain(..).collect()
    }

    pub fn pending_messages(&self) -> usize {
        self.mailbox.borrow().inbox.len()
    }

    /// Closing drops queued messages and makes every handle report closed.
    pub fn close(&self) {
        let mut mailbox = self.mailbox.borrow_mut();
        mailbox.closed = true;
        mailbox.inbox.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.borrow().closed
    }
}

struct LocalPeer {
    target: Weak<RefCell<Mailbox>>,
    sender: Weak<RefCell<Mailbox>>,
}

impl fmt::Debug for LocalPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPeer")
            .field("origin", &self.origin())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PeerWindow for LocalPeer {
    fn origin(&self) -> String {
        self.target
            .upgrade()
            .map(|mailbox| mailbox.borrow().origin.clone())
            .unwrap_or_default()
    }

    fn is_closed(&self) -> bool {
        self.target
            .upgrade()
            .is_none_or(|mailbox| mailbox.borrow().closed)
    }

    fn post(&self, message: &WindowMessage) -> Result<(), TransportError> {
        let target = self.target.upgrade().ok_or(TransportError::Closed)?;
        if target.borrow().closed {
            return Err(TransportError::Closed);
        }
        let sender = self.sender.upgrade().ok_or(TransportError::Closed)?;
        let origin = sender.borrow().origin.clone();

        let json = message.to_json()?;
        let message = WindowMessage::from_json(&json)?;
        let reply: Rc<dyn PeerWindow> = Rc::new(Self {
            target: self.sender.clone(),
            sender: self.target.clone(),
        });

        log::trace!("post {} {origin} -> {}", message.kind(), target.borrow().origin);
        target.borrow_mut().inbox.push_back(Envelope {
            origin,
            message,
            source: Some(reply),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::WidgetId;

    fn closing(id: &str) -> WindowMessage {
        WindowMessage::PopoutClosing {
            widget_id: WidgetId::new(id),
            timestamp: 1.0,
        }
    }

    #[test]
    fn post_delivers_with_sender_origin_and_reply_handle() {
        let main = LocalWindow::new("app://main");
        let popout = LocalWindow::new("app://main");
        let stranger = LocalWindow::new("https://evil.example");

        let to_main = main.handle_from(&stranger);
        to_main.post(&closing("a")).unwrap();

        let received = main.take_messages();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].origin, "https://evil.example");
        assert_eq!(received[0].message, closing("a"));

        // Replying goes back to the sender only.
        let reply = received[0].source.clone().unwrap();
        reply.post(&closing("b")).unwrap();
        assert_eq!(stranger.pending_messages(), 1);
        assert_eq!(popout.pending_messages(), 0);
    }

    #[test]
    fn closed_or_dropped_windows_refuse_posts() {
        let main = LocalWindow::new("app://main");
        let popout = LocalWindow::new("app://main");
        let handle = popout.handle_from(&main);
        assert!(!handle.is_closed());

        popout.close();
        assert!(handle.is_closed());
        assert_eq!(handle.post(&closing("a")), Err(TransportError::Closed));

        let other = LocalWindow::new("app://main");
        let handle = other.handle_from(&main);
        drop(other);
        assert!(handle.is_closed());
        assert_eq!(handle.origin(), "");
    }
}
