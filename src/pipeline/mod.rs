//! Pipeline stages for image-to-text recognition.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! against a scripted [`transport::Transport`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ submit ──▶ poll ──▶ extract
//! (bytes)   (base64)   (202 +     (GET     (paragraphs
//!                      handle)    loop)     → text)
//! ```
//!
//! 1. [`input`]     — size and magic-byte checks, file loading
//! 2. [`encode`]    — JSON body with the base64 payload
//! 3. [`submit`]    — start the remote job, return its handle
//! 4. [`poll`]      — follow the handle until a terminal state
//! 5. [`extract`]   — flatten the result into text
//!
//! [`transport`] is the network seam; [`mock`] is its scripted stand-in.

pub mod encode;
pub mod extract;
pub mod input;
pub mod mock;
pub mod poll;
pub mod submit;
pub mod transport;
