//! Attach documents (bilag) to collectable-debt agreements (FP-aftaler).
//!
//! A run walks a worklist of partner/document cases. For each case the
//! [`retry`] policy consults the queue history, the [`matcher`] scans the
//! partner's ledger for an agreement, and the [`action`] attaches the
//! document. Every attempt is recorded in the [`storage`] queue.

pub mod action;
pub mod config;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod process;
pub mod retry;
pub mod source;
pub mod storage;
