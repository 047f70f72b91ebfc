//! Chunk assembler - the per-exchange protocol state machine.
//!
//! Turns the incoming fragment sequence into one ordered answer. Exactly
//! one terminal transition (`Done` or `Failed`) happens per exchange; any
//! fragment delivered after that is rejected and logged, never merged.

use indexmap::IndexMap;
use log::{info, warn};

use crate::protocol::Fragment;

/// Lifecycle of one exchange's reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// No fragment received yet.
    Idle,
    /// At least one fragment stored, terminal fragment still outstanding.
    Receiving,
    /// Terminal fragment arrived, answer frozen.
    Done,
    /// Service or transport error, partial state discarded.
    Failed,
}

impl AssemblerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AssemblerState::Done | AssemblerState::Failed)
    }
}

/// What [`ChunkAssembler::accept`] did with a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Stored; more fragments expected.
    Accepted,
    /// Stored; this was the terminal fragment.
    Finished,
    /// Protocol violation, fragment ignored.
    Rejected,
}

/// The finished product of one exchange.
#[derive(Debug, Clone)]
pub struct AssembledAnswer {
    pub question: String,
    /// Fragment text keyed by seq, in arrival order.
    pub per_seq: IndexMap<u32, String>,
    /// Concatenation of every fragment's text in arrival order.
    pub answer: String,
}

#[derive(Debug)]
pub struct ChunkAssembler {
    state: AssemblerState,
    question: String,
    per_seq: IndexMap<u32, String>,
    answer: String,
    error: Option<String>,
}

impl ChunkAssembler {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            state: AssemblerState::Idle,
            question: question.into(),
            per_seq: IndexMap::new(),
            answer: String::new(),
            error: None,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Feed one fragment through the state machine.
    ///
    /// Duplicate `seq` is unspecified upstream: the per-seq map keeps the
    /// last write, the running answer keeps both texts, and a warning is
    /// logged.
    pub fn accept(&mut self, fragment: Fragment) -> FragmentOutcome {
        if self.state.is_terminal() {
            warn!(
                "Fragment seq {} arrived after terminal state {:?}, rejecting",
                fragment.seq, self.state
            );
            return FragmentOutcome::Rejected;
        }

        if self.state == AssemblerState::Idle {
            self.state = AssemblerState::Receiving;
        }

        info!(
            "Received fragment seq {} ({:?}): {}",
            fragment.seq,
            fragment.status,
            fragment.text.replace('\n', "\\n")
        );

        if self.per_seq.contains_key(&fragment.seq) {
            warn!(
                "Duplicate fragment seq {}, keeping the later text",
                fragment.seq
            );
        }

        self.answer.push_str(&fragment.text);
        self.per_seq.insert(fragment.seq, fragment.text);

        if fragment.status.is_terminal() {
            self.state = AssemblerState::Done;
            info!(
                "Assembled answer complete: {}",
                self.answer.replace('\n', "\\n")
            );
            FragmentOutcome::Finished
        } else {
            FragmentOutcome::Accepted
        }
    }

    /// Record a failure. Partial fragments are discarded; further
    /// fragments will be rejected.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.state.is_terminal() {
            warn!("Failure reported after terminal state {:?}, ignoring", self.state);
            return;
        }
        self.per_seq.clear();
        self.answer.clear();
        self.error = Some(message.into());
        self.state = AssemblerState::Failed;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The frozen answer, available only once the exchange is `Done`.
    pub fn into_answer(self) -> Option<AssembledAnswer> {
        if self.state != AssemblerState::Done {
            return None;
        }
        Some(AssembledAnswer {
            question: self.question,
            per_seq: self.per_seq,
            answer: self.answer,
        })
    }
}
