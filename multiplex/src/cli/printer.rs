//! Line-oriented, name-prefixed output for multiplexed commands.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{self, Stderr, Stdout, Write};

use colored::{Color, Colorize};
use multiplex::{Channel, Watcher};

/// Writes each complete line of a command's output as `[name] line`.
///
/// Chunks rarely end on line boundaries, so a partial trailing line is kept
/// until its newline arrives. End of stream on either channel ends the
/// process, so it flushes the partial lines of both.
pub struct LinePrinter<O: Write = Stdout, E: Write = Stderr> {
    prefix: String,
    out: O,
    err: E,
    pending_out: Vec<u8>,
    pending_err: Vec<u8>,
}

impl LinePrinter {
    pub fn stdio(name: &str) -> Self {
        Self::new(name, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> LinePrinter<O, E> {
    pub fn new(name: &str, out: O, err: E) -> Self {
        let prefix = format!("[{name}]").color(string_to_color(name)).to_string();
        Self {
            prefix,
            out,
            err,
            pending_out: Vec::new(),
            pending_err: Vec::new(),
        }
    }

    fn write_chunk(&mut self, channel: Channel, chunk: &[u8]) {
        if chunk.is_empty() {
            self.flush_pending();
            return;
        }

        let (pending, sink) = match channel {
            Channel::Stdout => (&mut self.pending_out, &mut self.out as &mut dyn Write),
            Channel::Stderr => (&mut self.pending_err, &mut self.err as &mut dyn Write),
        };
        pending.extend_from_slice(chunk);
        let Some(last_newline) = pending.iter().rposition(|b| *b == b'\n') else {
            return;
        };
        let complete: Vec<u8> = pending.drain(..=last_newline).collect();
        for line in String::from_utf8_lossy(&complete).lines() {
            let _ = writeln!(sink, "{} {line}", self.prefix);
        }
        let _ = sink.flush();
    }

    /// Write out partial lines of both channels without waiting for '\n'.
    fn flush_pending(&mut self) {
        let prefix = &self.prefix;
        for (pending, sink) in [
            (&mut self.pending_out, &mut self.out as &mut dyn Write),
            (&mut self.pending_err, &mut self.err as &mut dyn Write),
        ] {
            if !pending.is_empty() {
                let line = String::from_utf8_lossy(pending);
                let _ = writeln!(sink, "{prefix} {line}");
                pending.clear();
            }
            let _ = sink.flush();
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O, E> Watcher for LinePrinter<O, E>
where
    O: Write + Send,
    E: Write + Send,
{
    fn on_chunk(&mut self, channel: Channel, chunk: &[u8]) {
        self.write_chunk(channel, chunk);
    }
}

fn string_to_color(s: &str) -> Color {
    let colors = [
        Color::Green,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::BrightGreen,
        Color::BrightBlue,
        Color::BrightMagenta,
        Color::BrightCyan,
    ];

    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    let hash = hasher.finish();

    let idx = usize::try_from(hash % colors.len() as u64).unwrap_or_default();
    colors[idx]
}
