//! OAuth callback HTTP surface.

mod callback;

pub use callback::{callback_router, serve, CallbackState};
