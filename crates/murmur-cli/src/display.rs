//! Terminal presentation of room traffic.
//!
//! The display hint arrives unauthenticated from the network, so it is only
//! ever matched against a fixed palette; its raw bytes never reach the
//! terminal. Names and message text are stripped of control characters for
//! the same reason.

use crossterm::style::{Color, Stylize};
use murmur_relay::Received;
use rand::seq::SliceRandom;

/// Colors a participant can be assigned, by wire name.
pub const PALETTE: &[(&str, Color)] = &[
    ("red", Color::Red),
    ("green", Color::Green),
    ("yellow", Color::Yellow),
    ("cyan", Color::Cyan),
    ("magenta", Color::Magenta),
    ("blue", Color::Blue),
    ("white", Color::White),
];

/// Pick the color hint this session will send with every message.
pub fn random_hint() -> &'static str {
    PALETTE
        .choose(&mut rand::thread_rng())
        .map_or("white", |(name, _)| *name)
}

pub fn color_for(hint: &str) -> Option<Color> {
    PALETTE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(hint.trim()))
        .map(|(_, color)| *color)
}

pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Render one consumer result as a terminal line.
pub fn render(received: &Received) -> String {
    match received {
        Received::Message(m) => {
            let line = format!("{}: {}", sanitize(&m.sender_name), sanitize(&m.text));
            match color_for(&m.display_hint) {
                Some(color) => line.with(color).to_string(),
                None => line,
            }
        }
        Received::Unreadable(_) => {
            "Could not open this message. The passphrase may differ or the message is corrupted."
                .dark_grey()
                .to_string()
        }
    }
}
