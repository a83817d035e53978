//! Actor implementations

pub mod dispatcher;

pub use dispatcher::{DispatcherActor, DispatcherActorArgs};
