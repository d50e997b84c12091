//! Core data model for afklar.
//!
//! Cases come from the worklist, ledger rows from each partner's open-item
//! list, and queue attempts record what each run did with a case.

mod attempt;
mod case;
mod ledger;

pub use attempt::{AttemptHandle, AttemptStatus, QueueAttempt};
pub use case::Case;
pub use ledger::{AgreementMatch, LedgerRow, Miss};
