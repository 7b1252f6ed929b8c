//! Inbound command dispatcher.
//!
//! Runs inside the keep-alive service call whenever the transport hands
//! over a message.  It goes through the same publish throttle as the
//! outbound tasks, so a burst of commands is spaced out exactly like a
//! burst of publishes.

use log::{debug, info, warn};

use crate::message::Message;
use crate::throttle::PublishThrottle;

use super::commands::Command;
use super::events::AppEvent;
use super::ports::{ClockPort, EventSink, OutputPort, RestartPort, RestartReason};

#[derive(Debug, Default)]
pub struct CommandDispatcher {
    applied: u32,
    ignored: u32,
}

impl CommandDispatcher {
    pub const fn new() -> Self {
        Self {
            applied: 0,
            ignored: 0,
        }
    }

    /// Handle one inbound message and return how it was classified.
    ///
    /// `ON`/`OFF` set the output (no toggling), `RESET` restarts the
    /// device on the spot.  Everything else is dropped without a reply.
    pub fn on_message(
        &mut self,
        msg: &Message<'_>,
        throttle: &mut PublishThrottle,
        clock: &mut impl ClockPort,
        hw: &mut (impl OutputPort + RestartPort),
        sink: &mut impl EventSink,
    ) -> Command {
        throttle.gate(clock, || {
            let cmd = Command::parse(msg.payload);
            match cmd {
                Command::TurnOn | Command::TurnOff => {
                    let on = cmd == Command::TurnOn;
                    hw.set_output(on);
                    self.applied += 1;
                    info!("command on '{}': output {}", msg.topic, if on { "on" } else { "off" });
                    sink.emit(&AppEvent::CommandApplied(cmd));
                }
                Command::Reset => {
                    self.applied += 1;
                    warn!("command on '{}': restart requested", msg.topic);
                    sink.emit(&AppEvent::CommandApplied(cmd));
                    hw.restart(RestartReason::Command);
                }
                Command::Unknown => {
                    self.ignored += 1;
                    debug!("ignoring {}-byte payload on '{}'", msg.payload.len(), msg.topic);
                    sink.emit(&AppEvent::CommandIgnored {
                        len: msg.payload.len(),
                    });
                }
            }
            cmd
        })
    }

    /// Recognised commands applied so far.
    pub fn applied(&self) -> u32 {
        self.applied
    }

    /// Payloads dropped as unrecognised.
    pub fn ignored(&self) -> u32 {
        self.ignored
    }
}
