use crossterm::terminal;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Sink = Box<dyn Write + Send>;

/// Line-oriented output shared by the probe loop, the key loop and logging.
///
/// Raw terminal mode disables output post-processing, so while it is on every
/// `\n` is written as `\r\n`.
#[derive(Clone)]
pub struct Console {
    sink: Arc<Mutex<Sink>>,
    raw: Arc<AtomicBool>,
}

impl Console {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
            raw: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// A console on another sink that follows this one's raw-mode flag.
    pub fn sibling(&self, sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
            raw: Arc::clone(&self.raw),
        }
    }

    pub fn set_raw(&self, raw: bool) {
        self.raw.store(raw, Ordering::Relaxed);
    }

    pub fn line(&self, text: impl AsRef<str>) {
        self.lines(std::iter::once(text));
    }

    /// Writes several lines without interleaving output from other threads.
    pub fn lines<I>(&self, lines: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let raw = self.raw.load(Ordering::Relaxed);
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        for line in lines {
            let _ = write_translated(&mut *sink, line.as_ref().as_bytes(), raw);
            let _ = sink.write_all(if raw { b"\r\n" } else { b"\n" });
        }
        let _ = sink.flush();
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let raw = self.raw.load(Ordering::Relaxed);
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        write_translated(&mut *sink, buf, raw)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

fn write_translated(sink: &mut dyn Write, buf: &[u8], raw: bool) -> io::Result<()> {
    if !raw {
        return sink.write_all(buf);
    }

    let mut pieces = buf.split(|&b| b == b'\n');
    if let Some(first) = pieces.next() {
        sink.write_all(first)?;
    }
    for piece in pieces {
        sink.write_all(b"\r\n")?;
        sink.write_all(piece)?;
    }
    Ok(())
}

/// Keeps the terminal in raw mode until dropped.
pub struct RawMode {
    console: Console,
}

impl RawMode {
    pub fn enable(console: &Console) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        console.set_raw(true);
        Ok(Self {
            console: console.clone(),
        })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        self.console.set_raw(false);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Console;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// In-memory sink whose contents stay readable after the console takes it.
    #[derive(Clone, Default)]
    pub struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        pub fn console() -> (Console, Capture) {
            let capture = Capture::default();
            (Console::new(capture.clone()), capture)
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Capture;
    use std::io::Write;

    #[test]
    fn cooked_mode_uses_plain_newlines() {
        let (console, capture) = Capture::console();
        console.line("one");
        console.lines(["two", "three"]);
        assert_eq!(capture.text(), "one\ntwo\nthree\n");
    }

    #[test]
    fn raw_mode_translates_line_endings() {
        let (console, capture) = Capture::console();
        console.set_raw(true);
        console.line("a\nb");
        assert_eq!(capture.text(), "a\r\nb\r\n");
    }

    #[test]
    fn sibling_follows_raw_flag() {
        let (console, _) = Capture::console();
        let capture = Capture::default();
        let mut sibling = console.sibling(capture.clone());

        console.set_raw(true);
        sibling.write_all(b"log line\n").unwrap();
        assert_eq!(capture.text(), "log line\r\n");
    }
}
