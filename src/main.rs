//! Binary entrypoint that launches the Webhub chat server.

use std::process::ExitCode;

use webhub_chat::start_webhub_chat;

/// Load configuration and sessions, then serve the chat API until Ctrl-C.
fn main() -> ExitCode {
    start_webhub_chat::run()
}
