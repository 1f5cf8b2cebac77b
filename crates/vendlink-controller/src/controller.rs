//! The transaction control loop.
//!
//! [`TransactionController`] owns the phase machine, the in-flight
//! transaction and the three devices it talks to. Each call to
//! [`step`](TransactionController::step) performs the work of the current
//! phase, including its poll delay, and then the end-of-cycle delay:
//!
//! | Phase | Work | Next |
//! |---|---|---|
//! | Init | render the waiting prompt | WaitingForCard |
//! | WaitingForCard | poll; decode a command frame | CardDetected, or stay |
//! | CardDetected | render the card id | Validating (Init for unknown commands) |
//! | Validating | check the balance, reply `OK`/`ERR` | ValidatingWait or Init |
//! | ValidatingWait | poll for any non-idle frame | Dispensing, or stay |
//! | Dispensing | poll for the completion code | Init, or stay |
//!
//! Failures inside a cycle never escape `step`: bus errors and bad frames
//! are retried on the next poll and validation failures count as denials.

use std::future::Future;

use chrono::Local;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};
use vendlink_core::{Transaction, ValidationResult};
use vendlink_hardware::{PeripheralLink, StatusDisplay};
use vendlink_network::CardValidator;
use vendlink_protocol::{CommandParser, Frame, ReplyCode};

use crate::{
    config::ControllerConfig,
    error::{ControllerError, Result},
    state_machine::{Phase, PhaseMachine},
};

/// Prompt shown at the start of every cycle.
pub const MSG_WAITING: &str = "Waiting for card scan";
/// Shown once a card is authorized.
pub const MSG_VALID: &str = "Valid card";
/// Shown when the peripheral starts dispensing.
pub const MSG_DISPENSING: &str = "Dispensing...";
/// Shown when the peripheral reports completion.
pub const MSG_DONE: &str = "Done...";
/// Shown when a frame carries a command other than purchase or reload.
pub const MSG_UNKNOWN_COMMAND: &str = "Unknown command";
/// Shown when the phase watchdog fires.
pub const MSG_TIMED_OUT: &str = "Timed out";

/// Single-flight vending transaction controller.
///
/// Generic over the peripheral link, the card validator and the display so
/// the same logic runs on hardware and against mocks.
///
/// # Examples
///
/// ```
/// use vendlink_controller::{ControllerConfig, Phase, TransactionController};
/// use vendlink_hardware::mock::{MockDisplay, MockPeripheral};
/// use vendlink_network::MockValidator;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let (link, handle) = MockPeripheral::new();
///     let validator = MockValidator::new().with_balance("CARD0001", 50.0);
///     let mut controller = TransactionController::new(
///         link,
///         validator,
///         MockDisplay::new(),
///         ControllerConfig::without_delays(),
///     );
///     controller.boot().unwrap();
///
///     handle.push_frame("CARD0001|11000").await.unwrap();
///     assert_eq!(controller.step().await, Phase::WaitingForCard);
///     assert_eq!(controller.step().await, Phase::CardDetected);
/// }
/// ```
#[derive(Debug)]
pub struct TransactionController<L, V, D> {
    link: L,
    validator: V,
    display: D,
    config: ControllerConfig,
    machine: PhaseMachine,
    transaction: Option<Transaction>,
}

impl<L, V, D> TransactionController<L, V, D>
where
    L: PeripheralLink,
    V: CardValidator,
    D: StatusDisplay,
{
    /// Create a controller in `Init`.
    pub fn new(link: L, validator: V, display: D, config: ControllerConfig) -> Self {
        Self {
            link,
            validator,
            display,
            config,
            machine: PhaseMachine::new(),
            transaction: None,
        }
    }

    /// Bring up the display and show the boot banner.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::DisplayInit` if the display cannot be
    /// initialized or drawn to. The caller must not run the loop after
    /// this error.
    pub fn boot(&mut self) -> Result<()> {
        if let Err(e) = self.display.init() {
            error!(error = %e, "Display initialization failed, refusing to run");
            return Err(ControllerError::DisplayInit(e));
        }

        let now = Local::now().format("%Y/%m/%d %H:%M:%S").to_string();
        self.display.clear();
        self.display.show(&format!("vendlink {}", vendlink_core::VERSION));
        self.display.show(&now);
        self.display.flush().map_err(ControllerError::DisplayInit)?;

        info!(
            address = self.config.peripheral_address,
            watchdog = ?self.config.phase_timeout,
            "Controller booted"
        );
        Ok(())
    }

    /// Run one step of the cycle and return the phase it ended in.
    pub async fn step(&mut self) -> Phase {
        if self.check_watchdog() {
            sleep(self.config.cycle_delay).await;
            return self.phase();
        }

        match self.machine.current_phase() {
            Phase::Init => self.prompt(),
            Phase::WaitingForCard => self.wait_for_card().await,
            Phase::CardDetected => self.announce_card().await,
            Phase::Validating => self.validate_card().await,
            Phase::ValidatingWait => self.wait_for_dispense_start().await,
            Phase::Dispensing => self.wait_for_dispense_end().await,
        }

        sleep(self.config.cycle_delay).await;
        self.phase()
    }

    /// Step until `shutdown` completes.
    ///
    /// A step in progress when `shutdown` fires is abandoned. This stops
    /// the process; it does not cancel the transaction on the peripheral.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                phase = self.step() => trace!(%phase, "Step complete"),
            }
        }

        info!(phase = %self.phase(), "Shutdown requested");
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.machine.current_phase()
    }

    /// The phase machine, for history and timing.
    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    /// The in-flight transaction, if any.
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Active configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The status display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// The card validator.
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Init: show the prompt and start waiting.
    fn prompt(&mut self) {
        self.transaction = None;
        self.render(true, &[MSG_WAITING]);
        self.advance(Phase::WaitingForCard);
    }

    /// WaitingForCard: poll until a frame decodes into a transaction.
    async fn wait_for_card(&mut self) {
        sleep(self.config.card_poll_interval).await;

        let Some(frame) = self.poll_frame().await else {
            return;
        };

        match CommandParser::parse(&frame) {
            Ok(transaction) => {
                info!(
                    transaction = %transaction.id,
                    card = %transaction.card_id,
                    command = %transaction.command,
                    amount = transaction.amount,
                    "Card detected"
                );
                self.transaction = Some(transaction);
                self.advance(Phase::CardDetected);
            }
            Err(e) => debug!(frame = %frame, error = %e, "Ignoring unparseable frame"),
        }
    }

    /// CardDetected: show the card, or reject an unknown command outright.
    async fn announce_card(&mut self) {
        let Some((card, command)) = self
            .transaction
            .as_ref()
            .map(|tx| (tx.card_id.to_string(), tx.command))
        else {
            warn!("No transaction in CardDetected, restarting cycle");
            self.return_to_init();
            return;
        };

        if !command.is_known() {
            warn!(card = %card, code = %command.as_char(), "Rejecting unknown command");
            self.reply(ReplyCode::Err).await;
            self.render(false, &[MSG_UNKNOWN_COMMAND]);
            sleep(self.config.validation_settle).await;
            self.return_to_init();
            return;
        }

        self.render(false, &[format!("-> {card}").as_str()]);
        self.advance(Phase::Validating);
    }

    /// Validating: ask the balance service and tell the peripheral.
    async fn validate_card(&mut self) {
        let Some(card_id) = self.transaction.as_ref().map(|tx| tx.card_id.clone()) else {
            warn!("No transaction in Validating, restarting cycle");
            self.return_to_init();
            return;
        };

        let result = match self.validator.validate(&card_id).await {
            Ok(result) => result,
            Err(e) if e.is_timeout() => {
                warn!(card = %card_id, error = %e, "Validation timed out, denying");
                ValidationResult::denied()
            }
            Err(e) => {
                warn!(card = %card_id, error = %e, "Validation failed, denying");
                ValidationResult::denied()
            }
        };

        if let Some(balance) = result.balance {
            self.render(false, &[format!("Balance: {balance:.2}").as_str()]);
            sleep(self.config.balance_hold).await;
        }

        if result.authorized {
            info!(card = %card_id, balance = ?result.balance, "Card authorized");
            self.render(false, &[MSG_VALID]);
            self.reply(ReplyCode::Ok).await;
            self.advance(Phase::ValidatingWait);
        } else {
            info!(card = %card_id, balance = ?result.balance, "Card denied");
            self.reply(ReplyCode::Err).await;
            self.return_to_init();
        }

        sleep(self.config.validation_settle).await;
    }

    /// ValidatingWait: any non-idle frame means dispensing has started.
    async fn wait_for_dispense_start(&mut self) {
        sleep(self.config.authorized_poll_interval).await;

        if let Some(frame) = self.poll_frame().await {
            debug!(frame = %frame, "Dispensing started");
            self.render(true, &[MSG_DISPENSING]);
            self.advance(Phase::Dispensing);
        }
    }

    /// Dispensing: wait for the completion code.
    async fn wait_for_dispense_end(&mut self) {
        sleep(self.config.dispense_poll_interval).await;

        match self.poll_frame().await {
            Some(frame) if frame.is_dispense_complete() => {
                if let Some(tx) = &self.transaction {
                    info!(transaction = %tx.id, card = %tx.card_id, "Dispense complete");
                }
                self.render(false, &[MSG_DONE]);
                sleep(self.config.completion_hold).await;
                self.return_to_init();
            }
            Some(frame) => trace!(frame = %frame, "Still dispensing"),
            None => {}
        }
    }

    /// Poll the link, folding "no data", the idle marker and link errors
    /// into `None`.
    async fn poll_frame(&mut self) -> Option<Frame> {
        match self.link.poll().await {
            Ok(Some(frame)) if !frame.is_idle() => Some(frame),
            Ok(_) => None,
            Err(e) => {
                debug!(phase = %self.phase(), error = %e, "Missed poll");
                None
            }
        }
    }

    async fn reply(&mut self, reply: ReplyCode) {
        if let Err(e) = self.link.send(reply).await {
            warn!(%reply, error = %e, "Failed to write reply to peripheral");
        }
    }

    /// Append lines to the display, optionally starting a fresh frame.
    fn render(&mut self, clear: bool, lines: &[&str]) {
        if clear {
            self.display.clear();
        }
        for line in lines {
            self.display.show(line);
        }
        if let Err(e) = self.display.flush() {
            warn!(error = %e, "Display update failed");
        }
    }

    /// Fire the phase watchdog if it has expired. Returns whether it fired.
    fn check_watchdog(&mut self) -> bool {
        match self.machine.check_and_handle_timeout() {
            Ok(Some(transition)) => {
                warn!(
                    phase = %transition.from,
                    timeout = ?self.config.phase_timeout,
                    "Phase watchdog expired"
                );
                self.transaction = None;
                self.render(false, &[MSG_TIMED_OUT]);
                true
            }
            Ok(None) => false,
            Err(e) => {
                error!(error = %e, "Watchdog transition rejected, resetting");
                self.return_to_init();
                true
            }
        }
    }

    fn advance(&mut self, next: Phase) {
        match self.machine.transition_to(next) {
            Ok(transition) => {
                debug_assert_eq!(
                    self.transaction.is_some(),
                    next.holds_transaction(),
                    "transaction presence out of step with phase {next}"
                );
                info!(from = %transition.from, phase = %transition.to, "Phase transition");
                if next.is_guarded() {
                    self.arm_watchdog();
                }
            }
            Err(e) => {
                error!(error = %e, "Rejected phase transition, resetting");
                self.machine.reset();
                self.transaction = None;
            }
        }
    }

    fn return_to_init(&mut self) {
        self.transaction = None;
        self.advance(Phase::Init);
    }

    fn arm_watchdog(&mut self) {
        if let Some(timeout) = self.config.phase_timeout.filter(|t| !t.is_zero()) {
            self.machine.set_timeout(timeout);
        }
    }
}

impl<L, V, D> TransactionController<L, V, D> {
    /// Take the devices back.
    pub fn into_parts(self) -> (L, V, D) {
        (self.link, self.validator, self.display)
    }
}
