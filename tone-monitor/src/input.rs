//! Reference selection events read line by line from stdin.

use crossbeam_channel::Sender;
use std::io::BufRead;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Select a new reference pitch in Hz.
    Select(u32),
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Some(Ok(Command::Quit));
    }
    Some(
        line.parse::<u32>()
            .map(Command::Select)
            .map_err(|_| format!("Not a frequency: {:?}", line)),
    )
}

/// Forwards commands from `reader` until EOF or a receiver hang-up.
///
/// EOF is reported as [`Command::Quit`].
pub fn forward_commands<R: BufRead>(reader: R, commands: Sender<Command>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        };
        match parse_command(&line) {
            Some(Ok(command)) => {
                if commands.send(command).is_err() {
                    return;
                }
            }
            Some(Err(message)) => warn!("{}", message),
            None => {}
        }
    }
    let _ = commands.send(Command::Quit);
}
