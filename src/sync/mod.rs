//! Cross-window state synchronization between the main window and its popouts.

mod channel;
mod handshake;
mod manager;
mod message;
mod options;
mod popout;
mod registry;
mod state;
mod throttle;
mod transport;
mod validate;
mod window;


pub use channel::{
    BroadcastHub, BroadcastPort, KeyValueStorage, SharedStorage, StorageEvent, StorageView,
    WidgetStateChannel, storage_key,
};
pub use handshake::{HandshakeError, HandshakeStatus, StoreInitializer};
pub use manager::{
    ApplyReport, InitialDataResponder, SendOutcome, SyncError, SyncManager, SyncStats,
};
pub use message::{Envelope, InitialData, WindowMessage, WindowRole, wire_timestamp};
pub use options::{ActionFilter, FieldPath, SyncOptions};
pub use popout::{
    PopoutError, PopoutRequest, PopoutSpawner, announce_closing, handle_popout_closing,
    pop_out_widget, reconcile_closed_popouts, return_widget,
};
pub use registry::{BroadcastReport, OpenerLink, PopoutRegistry, SyncPeers};
pub use state::{ActionDescriptor, JsonStateStore, StateStore};
pub use throttle::Throttle;
pub use transport::{LocalWindow, PeerWindow, TransportError};
pub use validate::{SliceValidator, SliceValidators, ValidationError};
pub use window::{Inbound, WindowSync};
