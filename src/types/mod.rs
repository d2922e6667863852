//! Public types for the Fafnir API.

mod action;
mod generation;
mod message;
mod request;
mod response;

pub use action::DeferredAction;
pub use generation::VersionToken;
pub use message::{ControlMessage, ControlReply, Notice};
pub use request::{Destination, Method, ResourceRequest};
pub use response::StoredResponse;
