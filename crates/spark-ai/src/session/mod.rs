//! Single-exchange chat sessions.
//!
//! `state` holds the synchronous state machine; `driver` owns the
//! connection and feeds it transport events until it settles.

mod driver;
mod state;


pub use driver::{run_session, ChatRequest, SessionOptions};
pub use state::{ChatReply, ChatSession, SessionState, Transition, EMPTY_RESPONSE};
