//! Service layer for the sniper application.
//!
//! This module contains the boundary clients:
//! - Patient portal queries (`PortalClient`)
//! - Push notification dispatch (`PushoverNotifier`)

mod notify;
mod portal;

pub use notify::{Notifier, PushoverNotifier};
pub use portal::PortalClient;
