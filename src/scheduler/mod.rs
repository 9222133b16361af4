//! Cancellable polling: abort signals, the keyed poll scheduler and its tick tasks

pub mod abort;
pub mod poll_scheduler;
pub mod poll_slot;
pub mod tasks;
