//! Case processing: one pass over the worklist.
//!
//! Each case is gated by the retry policy, recorded in the queue as
//! in-progress, matched against its partner's ledger, attached if an
//! agreement is found, and finalized as done. Once recorded, a case is
//! always finalized, whatever happens in between. Case-scoped failures end
//! up in the attempt's message; only enumeration and queue failures end the
//! run.

use jiff::Timestamp;
use tracing::{debug, info, info_span, warn};

use crate::{
    action::{ActionError, AgreementAction},
    matcher::{MatchRules, find_agreement},
    model::{AgreementMatch, AttemptStatus, Case, Miss},
    retry::{Decision, RetryPolicy, SkipReason},
    source::{SourceError, WorklistSource},
    storage::{QueueStore, StorageError},
};

/// Message of an attempt whose document was attached.
pub const ATTACHED: &str = "attached";

/// Message of an attempt whose document was left alone.
pub const NOT_ATTACHED: &str = "not attached";

/// Failures scoped to a single case.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("bilag {document_id} not found in the ledger of partner {partner_id}")]
    Integrity {
        partner_id: String,
        document_id: String,
    },

    #[error("ledger unavailable: {0}")]
    Source(#[from] SourceError),

    #[error("attach failed: {0}")]
    Action(#[from] ActionError),
}

/// Failures that end the run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to list candidates: {0}")]
    Source(#[from] SourceError),

    #[error("queue store failed: {0}")]
    Queue(#[from] StorageError),
}

/// What happened to one case.
#[derive(Debug)]
pub enum CaseOutcome {
    /// Gated out by the retry policy; nothing was recorded.
    Skipped(SkipReason),

    Attached,

    NotAttached,

    /// A case-scoped error; the attempt was finalized with its message.
    Failed(CaseError),
}

/// Tally of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub attached: usize,
    pub not_attached: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &CaseOutcome) {
        match outcome {
            CaseOutcome::Skipped(_) => self.skipped += 1,
            CaseOutcome::Attached => self.attached += 1,
            CaseOutcome::NotAttached => self.not_attached += 1,
            CaseOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.attached + self.not_attached + self.skipped + self.failed
    }
}

/// Drives cases from a worklist through the queue and the agreement action.
pub struct CaseProcessor<'a, W, A, Q> {
    source: &'a mut W,
    action: &'a mut A,
    queue: &'a mut Q,
    policy: RetryPolicy,
    rules: MatchRules,
}

impl<'a, W, A, Q> CaseProcessor<'a, W, A, Q>
where
    W: WorklistSource,
    A: AgreementAction,
    Q: QueueStore,
{
    pub fn new(source: &'a mut W, action: &'a mut A, queue: &'a mut Q) -> Self {
        Self {
            source,
            action,
            queue,
            policy: RetryPolicy::default(),
            rules: MatchRules::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: MatchRules) -> Self {
        self.rules = rules;
        self
    }

    /// Processes every candidate in worklist order.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        let cases = self.source.list_candidates()?;
        info!(cases = cases.len(), "worklist loaded");

        let mut summary = RunSummary::default();
        for case in &cases {
            let outcome = self.process_case(case)?;
            summary.record(&outcome);
        }

        info!(
            attached = summary.attached,
            not_attached = summary.not_attached,
            skipped = summary.skipped,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }

    /// Takes one case from gating through finalization.
    ///
    /// Returns `Err` only when the queue store itself fails.
    pub fn process_case(&mut self, case: &Case) -> Result<CaseOutcome, StorageError> {
        let reference = case.reference();
        let _span = info_span!("case", %reference).entered();

        let history = self.queue.history(&reference)?;
        if let Decision::Skip(reason) = self.policy.evaluate(&history, Timestamp::now()) {
            warn!(?reason, "skipping");
            return Ok(CaseOutcome::Skipped(reason));
        }

        let handle = self.queue.create(&reference)?;

        let (message, outcome) = match self.act(case) {
            Ok(true) => (ATTACHED.to_string(), CaseOutcome::Attached),
            Ok(false) => (NOT_ATTACHED.to_string(), CaseOutcome::NotAttached),
            Err(e) => {
                warn!(error = %e, "case failed");
                (format!("{NOT_ATTACHED}: {e}"), CaseOutcome::Failed(e))
            }
        };

        self.queue.finalize(handle, AttemptStatus::Done, &message)?;
        info!(attempt = %handle, %message, "finalized");
        Ok(outcome)
    }

    fn act(&mut self, case: &Case) -> Result<bool, CaseError> {
        let rows = self.source.ledger_for(&case.partner_id)?;

        match find_agreement(&rows, &case.document_id, &self.rules) {
            AgreementMatch::Found { row } => {
                let agreement = &rows[row];
                debug!(agreement = %agreement.document_id, "agreement found");
                Ok(self.action.attach(agreement, &case.document_id)?)
            }
            AgreementMatch::NotFound(Miss::DocumentMissing) => Err(CaseError::Integrity {
                partner_id: case.partner_id.clone(),
                document_id: case.document_id.clone(),
            }),
            AgreementMatch::NotFound(miss) => {
                debug!(?miss, "nothing to attach");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::RefCell, collections::HashMap, io, rc::Rc};

    use jiff::SignedDuration;

    use crate::{
        model::{AttemptHandle, LedgerRow, QueueAttempt},
        storage::SqliteQueue,
    };

    const OPEN_DUE: &str = r"@0A\QTilgodehavende åbent og forfaldent@";

    #[derive(Default)]
    struct FakeWorklist {
        cases: Vec<Case>,
        ledgers: HashMap<String, Vec<LedgerRow>>,
        unavailable: bool,
    }

    impl FakeWorklist {
        fn with_case(mut self, partner: &str, document: &str, rows: Vec<LedgerRow>) -> Self {
            self.cases.push(Case::new(partner, document));
            self.ledgers.insert(partner.to_string(), rows);
            self
        }
    }

    impl WorklistSource for FakeWorklist {
        fn list_candidates(&mut self) -> Result<Vec<Case>, SourceError> {
            if self.unavailable {
                return Err(SourceError::Io(io::Error::other("worklist screen gone")));
            }
            Ok(self.cases.clone())
        }

        fn ledger_for(&mut self, partner_id: &str) -> Result<Vec<LedgerRow>, SourceError> {
            self.ledgers
                .get(partner_id)
                .cloned()
                .ok_or_else(|| SourceError::LedgerNotFound(partner_id.to_string()))
        }
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Attach,
        Decline,
        Fail,
    }

    struct FakeAction {
        reply: Reply,
        calls: Vec<(LedgerRow, String)>,
    }

    impl FakeAction {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: Vec::new(),
            }
        }
    }

    impl AgreementAction for FakeAction {
        fn attach(&mut self, agreement: &LedgerRow, document_id: &str) -> Result<bool, ActionError> {
            self.calls.push((agreement.clone(), document_id.to_string()));
            match self.reply {
                Reply::Attach => Ok(true),
                Reply::Decline => Ok(false),
                Reply::Fail => Err(ActionError::Rejected("agreement locked".into())),
            }
        }
    }

    fn document(id: &str, signal: &str) -> LedgerRow {
        LedgerRow {
            document_id: id.into(),
            document_type: "AB".into(),
            agreement_type: String::new(),
            signal: signal.into(),
            created_by: None,
        }
    }

    fn agreement(id: &str) -> LedgerRow {
        LedgerRow {
            document_id: id.into(),
            document_type: "FK".into(),
            agreement_type: "FP".into(),
            signal: String::new(),
            created_by: None,
        }
    }

    fn eligible_ledger() -> Vec<LedgerRow> {
        vec![document("D1", OPEN_DUE), agreement("A1")]
    }

    fn queue() -> SqliteQueue {
        SqliteQueue::in_memory("test").unwrap()
    }

    #[test]
    fn attaches_eligible_document() {
        let mut source = FakeWorklist::default().with_case("P1", "D1", eligible_ledger());
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.attached, 1);
        assert_eq!(action.calls.len(), 1);
        assert_eq!(action.calls[0].0.document_id, "A1");
        assert_eq!(action.calls[0].1, "D1");

        let history = queue.history("P1:D1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, AttemptStatus::Done);
        assert_eq!(history[0].message.as_deref(), Some(ATTACHED));
    }

    #[test]
    fn ineligible_document_is_not_attached() {
        let ledger = vec![document("D1", "@08\\QRed@"), agreement("A1")];
        let mut source = FakeWorklist::default().with_case("P1", "D1", ledger);
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.not_attached, 1);
        assert!(action.calls.is_empty());
        let history = queue.history("P1:D1").unwrap();
        assert_eq!(history[0].status, AttemptStatus::Done);
        assert_eq!(history[0].message.as_deref(), Some(NOT_ATTACHED));
    }

    #[test]
    fn recently_handled_case_is_skipped_without_trace() {
        let mut source = FakeWorklist::default().with_case("P1", "D1", eligible_ledger());
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();
        let two_days_ago = Timestamp::now() - SignedDuration::from_hours(48);
        let earlier = queue.create_at("P1:D1", two_days_ago).unwrap();
        queue
            .finalize(earlier, AttemptStatus::Done, ATTACHED)
            .unwrap();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(action.calls.is_empty());
        assert_eq!(queue.history("P1:D1").unwrap().len(), 1);
    }

    #[test]
    fn missing_document_fails_case_and_run_continues() {
        let mut source = FakeWorklist::default()
            .with_case("P1", "D1", vec![agreement("A1"), document("D2", OPEN_DUE)])
            .with_case("P2", "D5", vec![document("D5", OPEN_DUE), agreement("A5")]);
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.attached, 1);

        let failed = queue.history("P1:D1").unwrap();
        assert_eq!(failed[0].status, AttemptStatus::Done);
        let message = failed[0].message.as_deref().unwrap();
        assert!(message.starts_with("not attached: "));
        assert!(message.contains("bilag D1 not found"));

        let next = queue.history("P2:D5").unwrap();
        assert_eq!(next[0].message.as_deref(), Some(ATTACHED));
    }

    #[test]
    fn action_failure_is_finalized() {
        let mut source = FakeWorklist::default().with_case("P1", "D1", eligible_ledger());
        let mut action = FakeAction::new(Reply::Fail);
        let mut queue = queue();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.failed, 1);
        let history = queue.history("P1:D1").unwrap();
        assert_eq!(history[0].status, AttemptStatus::Done);
        assert_eq!(
            history[0].message.as_deref(),
            Some("not attached: attach failed: agreement locked")
        );
    }

    #[test]
    fn declined_attach_is_not_attached() {
        let mut source = FakeWorklist::default().with_case("P1", "D1", eligible_ledger());
        let mut action = FakeAction::new(Reply::Decline);
        let mut queue = queue();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.not_attached, 1);
        assert_eq!(action.calls.len(), 1);
        let history = queue.history("P1:D1").unwrap();
        assert_eq!(history[0].message.as_deref(), Some(NOT_ATTACHED));
    }

    #[test]
    fn ledger_failure_is_scoped_to_case() {
        let ledger = vec![document("D5", OPEN_DUE), agreement("A1")];
        let mut source = FakeWorklist::default().with_case("P2", "D5", ledger);
        source.cases.insert(0, Case::new("P9", "D9"));
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 2);
        let history = queue.history("P9:D9").unwrap();
        assert_eq!(
            history[0].message.as_deref(),
            Some("not attached: ledger unavailable: no ledger for partner P9")
        );
        let next = queue.history("P2:D5").unwrap();
        assert_eq!(next[0].message.as_deref(), Some(ATTACHED));
    }

    #[test]
    fn enumeration_failure_ends_run() {
        let mut source = FakeWorklist {
            unavailable: true,
            ..FakeWorklist::default()
        };
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();

        let err = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap_err();

        assert!(matches!(err, RunError::Source(_)));
    }

    #[test]
    fn cases_are_processed_in_worklist_order() {
        let mut source = FakeWorklist::default()
            .with_case("P2", "D2", vec![document("D2", OPEN_DUE), agreement("A2")])
            .with_case("P1", "D1", eligible_ledger());
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();

        CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        let documents: Vec<&str> = action.calls.iter().map(|(_, d)| d.as_str()).collect();
        assert_eq!(documents, ["D2", "D1"]);
    }

    #[test]
    fn single_unfinished_attempt_is_retried() {
        let mut source = FakeWorklist::default().with_case("P1", "D1", eligible_ledger());
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();
        queue.create("P1:D1").unwrap();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.attached, 1);
        assert_eq!(queue.history("P1:D1").unwrap().len(), 2);
    }

    #[test]
    fn repeated_unfinished_attempts_back_off() {
        let mut source = FakeWorklist::default().with_case("P1", "D1", eligible_ledger());
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();
        queue.create("P1:D1").unwrap();
        queue.create("P1:D1").unwrap();

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(action.calls.is_empty());
        assert_eq!(queue.history("P1:D1").unwrap().len(), 2);
    }

    #[test]
    fn custom_rules_are_used() {
        let ledger = vec![document("D1", "GREEN"), agreement("A1")];
        let mut source = FakeWorklist::default().with_case("P1", "D1", ledger);
        let mut action = FakeAction::new(Reply::Attach);
        let mut queue = queue();
        let rules = MatchRules {
            open_due_signal: "GREEN".into(),
            ..MatchRules::default()
        };

        let summary = CaseProcessor::new(&mut source, &mut action, &mut queue)
            .with_rules(rules)
            .run()
            .unwrap();

        assert_eq!(summary.attached, 1);
    }

    type Calls = Rc<RefCell<Vec<String>>>;

    /// Queue that logs each call into a log shared with [`WatchingAction`].
    struct LoggedQueue {
        inner: Rc<RefCell<SqliteQueue>>,
        calls: Calls,
    }

    impl QueueStore for LoggedQueue {
        fn create(&mut self, reference: &str) -> Result<AttemptHandle, StorageError> {
            self.calls.borrow_mut().push("create".into());
            self.inner.borrow_mut().create(reference)
        }

        fn finalize(
            &mut self,
            handle: AttemptHandle,
            status: AttemptStatus,
            message: &str,
        ) -> Result<(), StorageError> {
            self.calls.borrow_mut().push(format!("finalize:{message}"));
            self.inner.borrow_mut().finalize(handle, status, message)
        }

        fn history(&mut self, reference: &str) -> Result<Vec<QueueAttempt>, StorageError> {
            self.calls.borrow_mut().push("history".into());
            self.inner.borrow_mut().history(reference)
        }
    }

    /// Attaches, noting what the queue held for the case at that moment.
    struct WatchingAction {
        queue: Rc<RefCell<SqliteQueue>>,
        calls: Calls,
        seen: Vec<QueueAttempt>,
    }

    impl AgreementAction for WatchingAction {
        fn attach(&mut self, _agreement: &LedgerRow, document_id: &str) -> Result<bool, ActionError> {
            self.calls.borrow_mut().push(format!("attach:{document_id}"));
            self.seen = self
                .queue
                .borrow_mut()
                .history(&format!("P1:{document_id}"))
                .unwrap();
            Ok(true)
        }
    }

    #[test]
    fn attempt_is_recorded_before_acting() {
        let shared = Rc::new(RefCell::new(queue()));
        let calls = Calls::default();
        let mut source = FakeWorklist::default().with_case("P1", "D1", eligible_ledger());
        let mut action = WatchingAction {
            queue: Rc::clone(&shared),
            calls: Rc::clone(&calls),
            seen: Vec::new(),
        };
        let mut queue = LoggedQueue {
            inner: Rc::clone(&shared),
            calls: Rc::clone(&calls),
        };

        CaseProcessor::new(&mut source, &mut action, &mut queue)
            .run()
            .unwrap();

        assert_eq!(
            *calls.borrow(),
            ["history", "create", "attach:D1", "finalize:attached"]
        );
        assert_eq!(action.seen.len(), 1);
        assert_eq!(action.seen[0].status, AttemptStatus::InProgress);
    }
}
