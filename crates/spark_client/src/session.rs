//! Stream session - owns the conversation and one exchange at a time.
//!
//! An exchange: append the user turn, trim the window, build and sign the
//! request, open the websocket, drive the chunk assembler from transport
//! events, then append the assistant turn and record usage. There is no
//! client-side timeout: a connection that never produces a terminal
//! fragment blocks the exchange until the server closes it.

use std::collections::HashMap;

use chrono::Utc;
use log::{error, info, warn};
use spark_core::{Role, SparkConfig};
use tokio::sync::mpsc;

use crate::assembler::{AssembledAnswer, ChunkAssembler, FragmentOutcome};
use crate::auth::sign_url;
use crate::context::ContextWindow;
use crate::errcode::map_error_code;
use crate::error::SparkError;
use crate::protocol::{ChatRequest, Fragment};
use crate::transport::{self, TransportEvent};
use crate::usage::{UsageAccountant, UsageRecord};

/// Result of driving one exchange to its terminal state.
#[derive(Debug)]
pub struct ExchangeOutcome {
    pub assembled: AssembledAnswer,
    /// Absent when the terminal frame carried no usage block.
    pub usage: Option<UsageRecord>,
}

pub struct StreamSession {
    config: SparkConfig,
    window: ContextWindow,
    accountant: UsageAccountant,
    exchanges: Vec<AssembledAnswer>,
    last_error: Option<String>,
}

impl StreamSession {
    pub fn new(config: SparkConfig) -> Self {
        let window = ContextWindow::new(config.language, config.prompt.clone());
        Self {
            config,
            window,
            accountant: UsageAccountant::new(),
            exchanges: Vec::new(),
            last_error: None,
        }
    }

    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    pub fn usage(&self) -> &UsageAccountant {
        &self.accountant
    }

    /// Completed exchanges of this process, oldest first.
    pub fn exchanges(&self) -> &[AssembledAnswer] {
        &self.exchanges
    }

    /// Error text of the most recent failed exchange.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &SparkConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SparkConfig {
        &mut self.config
    }

    /// Start a fresh multi-turn conversation: clears the transcript, so
    /// the prompt prefix applies again to the next question. Cumulative
    /// usage is never reset.
    pub fn reset_conversation(&mut self) {
        self.window.reset();
    }

    /// Run one exchange and return the assembled answer.
    pub async fn run_exchange(&mut self, question: &str) -> Result<String, SparkError> {
        self.run_exchange_with(question, |_: &Fragment| {}).await
    }

    /// Run one exchange, invoking `on_fragment` for every accepted
    /// fragment as it arrives (streaming output).
    pub async fn run_exchange_with<F>(
        &mut self,
        question: &str,
        on_fragment: F,
    ) -> Result<String, SparkError>
    where
        F: FnMut(&Fragment),
    {
        self.check_credentials()?;
        self.last_error = None;

        info!("Starting exchange for question: {question}");
        self.window.append(Role::User, question);
        self.window.trim();

        let request = ChatRequest::new(&self.config, self.window.turns());
        let body = serde_json::to_string(&request)
            .map_err(|e| SparkError::Transport(format!("serialize request: {e}")))?;

        let signed_url = sign_url(&self.config.credentials, &self.config.spark_url, Utc::now())?;
        let mut events = transport::open_exchange(&signed_url, body).await?;

        let result = drive_exchange(
            &mut events,
            question,
            &self.config.error_code_table,
            on_fragment,
        )
        .await;
        // Dropping the receiver here closes the connection.
        drop(events);

        match result {
            Ok(outcome) => Ok(self.complete_exchange(outcome)),
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fold a finished exchange back into the session: assistant turn
    /// appended, usage recorded, answer kept in the exchange history.
    fn complete_exchange(&mut self, outcome: ExchangeOutcome) -> String {
        self.window
            .append(Role::Assistant, outcome.assembled.answer.clone());
        match outcome.usage {
            Some(usage) => self.accountant.record(usage),
            None => self.accountant.record_missing(),
        }
        let answer = outcome.assembled.answer.clone();
        self.exchanges.push(outcome.assembled);
        answer
    }

    fn check_credentials(&self) -> Result<(), SparkError> {
        let credentials = &self.config.credentials;
        if credentials.app_id.is_empty()
            || credentials.api_key.is_empty()
            || credentials.api_secret.is_empty()
        {
            return Err(SparkError::Auth(
                "app_id, api_key and api_secret must all be configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Consume transport events until a terminal state.
///
/// Split out from [`StreamSession`] so the state machine can be exercised
/// against a bare channel, without a live connection.
pub async fn drive_exchange<F>(
    events: &mut mpsc::Receiver<TransportEvent>,
    question: &str,
    error_table: &HashMap<String, String>,
    mut on_fragment: F,
) -> Result<ExchangeOutcome, SparkError>
where
    F: FnMut(&Fragment),
{
    let mut assembler = ChunkAssembler::new(question);
    let mut usage: Option<UsageRecord> = None;

    loop {
        let Some(event) = events.recv().await else {
            return Err(SparkError::Transport(
                "event stream ended before a terminal fragment".to_string(),
            ));
        };

        match event {
            TransportEvent::Frame(frame) => {
                if frame.header.code != 0 {
                    let message = map_error_code(frame.header.code, error_table);
                    error!(
                        "Exchange failed, service code {}: {message}",
                        frame.header.code
                    );
                    assembler.fail(message.clone());
                    return Err(SparkError::Service {
                        code: frame.header.code,
                        message,
                    });
                }

                let Some(payload) = frame.payload else {
                    warn!("Frame with code 0 but no payload, ignoring");
                    continue;
                };
                if let Some(block) = &payload.usage {
                    usage = Some(block.text.into());
                }
                let Some(choices) = payload.choices else {
                    warn!("Frame payload without choices, ignoring");
                    continue;
                };

                let Some(fragment) = Fragment::from_choices(&choices) else {
                    warn!("Unknown fragment status {}, ignoring", choices.status);
                    continue;
                };

                match assembler.accept(fragment.clone()) {
                    FragmentOutcome::Accepted => on_fragment(&fragment),
                    FragmentOutcome::Finished => {
                        on_fragment(&fragment);
                        break;
                    }
                    FragmentOutcome::Rejected => {}
                }
            }
            TransportEvent::Closed => {
                return Err(SparkError::Transport(
                    "connection closed before a terminal fragment".to_string(),
                ));
            }
            TransportEvent::Failed(message) => {
                assembler.fail(message.clone());
                return Err(SparkError::Transport(message));
            }
        }
    }

    match assembler.into_answer() {
        Some(assembled) => Ok(ExchangeOutcome { assembled, usage }),
        None => Err(SparkError::Transport(
            "exchange finished without an assembled answer".to_string(),
        )),
    }
}
