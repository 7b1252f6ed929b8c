//! Fuzz target: inbound payload → `Command::parse` / `Message::outbound`
//!
//! Arbitrary bytes must classify without panicking, only the three exact
//! literals may be recognised, and the envelope must reject anything over
//! the payload limit.
//!
//! cargo fuzz run fuzz_command_payload

#![no_main]

use envrelay::app::commands::Command;
use envrelay::message::{MAX_PAYLOAD_LEN, Message, QoS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cmd = Command::parse(data);
    match data {
        b"ON" => assert_eq!(cmd, Command::TurnOn),
        b"OFF" => assert_eq!(cmd, Command::TurnOff),
        b"RESET" => assert_eq!(cmd, Command::Reset),
        _ => assert_eq!(cmd, Command::Unknown),
    }

    let msg = Message::outbound("relay/led", data, QoS::AtMostOnce);
    assert_eq!(msg.is_ok(), data.len() <= MAX_PAYLOAD_LEN);
});
