//! Input thread: reads key lines from a terminal and routes them to the logic thread.

pub mod keymap;

use crate::input::keymap::{KeyAction, KeyMap};
use crate::system::bus::{LaneEvent, SessionCommand, SystemBus};
use std::io::BufRead;
use std::thread;
use std::time::Instant;

/// Spawns the input thread. It stops at end of input or once quit is sent.
pub fn start_thread<R>(bus: SystemBus, keymap: KeyMap, reader: R) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("Input Thread".to_string())
        .spawn(move || {
            log::info!("INPUT: Thread started");

            for line in reader.lines() {
                let Ok(line) = line else {
                    break;
                };
                let at = Instant::now();
                if !route_line(&bus, &keymap, &line, at) {
                    break;
                }
            }

            log::info!("INPUT: Thread stopped");
        })
        .expect("Failed to spawn Input thread")
}

/// Returns `false` once the session should no longer receive input.
fn route_line(bus: &SystemBus, keymap: &KeyMap, line: &str, at: Instant) -> bool {
    for action in keymap.parse_line(line) {
        let sent = match action {
            KeyAction::Lane(lane) => bus.lane_tx.send(LaneEvent { lane, at }).is_ok(),
            KeyAction::Command(cmd) => {
                if bus.control_tx.send(cmd).is_err() {
                    false
                } else {
                    cmd != SessionCommand::Quit
                }
            }
        };
        if !sent {
            return false;
        }
    }
    true
}
