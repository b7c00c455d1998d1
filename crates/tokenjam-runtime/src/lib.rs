//! # tokenjam-runtime
//!
//! The live side of a tokenjam session.
//!
//! - [`session`]: the single-writer session actor and the [`SessionHandle`]
//!   transports use to reach it
//! - [`evaluator`]: the throttled evaluation loop
//! - [`interpreter`]: the [`Interpreter`] seam and its process-backed
//!   implementation
//!
//! Subscriber fan-out lives in a private registry owned by the actor.

#![deny(unsafe_code)]

pub mod errors;
pub mod evaluator;
pub mod interpreter;
mod registry;
pub mod session;

pub use errors::{Result, SessionError};
pub use interpreter::{Interpreter, ProcessInterpreter};
pub use session::{
    NO_OUTPUT, Session, SessionConfig, SessionHandle, SessionStatus, Subscription,
};
