//! Raw-mode terminal backend on the process's stdin/stdout.

#![cfg_attr(not(unix), allow(dead_code, unused_imports))]

use std::env;
use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use once_cell::sync::Lazy;
use unicode_width::UnicodeWidthChar;

use crate::core::backend::{Backend, BackendFactory, BackendOptions};
use crate::core::cell::{Cell, CellBuffer};
use crate::core::event::{Event, EventQueue};
use crate::core::output::{ColorDepth, OutputGate, TerminalCmd};
use crate::core::raw_seq::RawSequenceSet;
use crate::core::style::Style;
use crate::error::BackendError;
use crate::logging;
use crate::platform::stdin_buffer::{StdinBuffer, StdinEvent};

#[cfg(unix)]
use libc::{self, c_int};
#[cfg(unix)]
use signal_hook::iterator::Signals;

const INPUT_POLL_MS: i32 = 50;
const ESC_TIMEOUT_MS: u64 = 10;

static UTF8_LOCALE: Lazy<bool> = Lazy::new(|| {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.is_empty())
        .map(|value| {
            let value = value.to_ascii_lowercase();
            value.contains("utf-8") || value.contains("utf8")
        })
        .unwrap_or(false)
});

/// ASCII stand-ins for line-drawing glyphs on terminals without UTF-8.
fn ascii_fallback(ch: char) -> Option<char> {
    match ch {
        '─' | '━' | '═' => Some('-'),
        '│' | '┃' | '║' => Some('|'),
        '┌' | '┐' | '└' | '┘' | '├' | '┤' | '┬' | '┴' | '┼' => Some('+'),
        '▲' | '↑' => Some('^'),
        '▼' | '↓' => Some('v'),
        '◀' | '←' => Some('<'),
        '▶' | '→' => Some('>'),
        '·' | '•' => Some('.'),
        '…' => Some('~'),
        _ => None,
    }
}

fn color_depth(term: &str, truecolor: Option<bool>) -> ColorDepth {
    let palette = if term.contains("256color") {
        ColorDepth::Palette256
    } else {
        ColorDepth::Ansi16
    };
    match truecolor {
        Some(true) => ColorDepth::TrueColor,
        Some(false) => palette,
        None => match env::var("COLORTERM").as_deref() {
            Ok("truecolor") | Ok("24bit") => ColorDepth::TrueColor,
            _ => palette,
        },
    }
}

#[cfg(unix)]
fn wait_writable(fd: c_int) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }

        return Err(io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

#[cfg(unix)]
fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> io::Result<usize>,
    FWait: FnMut(c_int) -> io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
            }
            Ok(count) => {
                let remaining = bytes.len() - written;
                if count > remaining {
                    return Err(io::Error::other("write returned more bytes than requested"));
                }
                written += count;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                continue;
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                wait_writable(fd)?;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_fd(fd: c_int, data: &str) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    write_all_fd_with(
        fd,
        data.as_bytes(),
        |fd, buf| {
            let result = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
            if result < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(result as usize)
            }
        },
        wait_writable,
    )
}

#[cfg(unix)]
fn read_winsize(fd: c_int) -> Option<(usize, usize)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col as usize, size.ws_row as usize))
    } else {
        None
    }
}

#[cfg(unix)]
fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

#[cfg(unix)]
fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Raw sequences shared with the input thread; `version` bumps on change.
#[derive(Debug, Default)]
struct SharedRawSeqs {
    seqs: RawSequenceSet,
    version: u64,
}

fn map_stdin_event(event: StdinEvent) -> Event {
    match event {
        StdinEvent::Data(data) => Event::Input(data),
        StdinEvent::Paste(content) => Event::Paste(content),
        StdinEvent::Raw(seq) => Event::RawSeq(seq),
    }
}

#[cfg(unix)]
#[derive(Debug)]
pub struct ProcessBackend {
    stdin_fd: c_int,
    stdout_fd: c_int,
    term: String,
    utf8: bool,
    original_termios: Option<libc::termios>,
    cells: CellBuffer,
    output: OutputGate,
    cursor: Option<(usize, usize)>,
    last_style: Option<Style>,
    mouse: bool,
    paste: bool,
    initialized: bool,
    raw_seqs: Arc<Mutex<SharedRawSeqs>>,
    events: Arc<EventQueue>,
    input_thread: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    resize_signal_handle: Option<signal_hook::iterator::Handle>,
    resize_thread: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl ProcessBackend {
    /// Backend on the process's stdin/stdout.
    pub fn new(options: &BackendOptions) -> Result<Self, BackendError> {
        Self::with_fds(libc::STDIN_FILENO, libc::STDOUT_FILENO, options)
    }

    /// Backend on arbitrary terminal file descriptors (e.g. a pty).
    pub fn with_fds(
        stdin_fd: c_int,
        stdout_fd: c_int,
        options: &BackendOptions,
    ) -> Result<Self, BackendError> {
        let term = match &options.term {
            Some(term) => term.clone(),
            None => env::var("TERM").unwrap_or_default(),
        };
        if term.is_empty() || term == "dumb" {
            return Err(BackendError::UnsupportedTerminal { term });
        }
        let is_tty = unsafe { libc::isatty(stdin_fd) == 1 && libc::isatty(stdout_fd) == 1 };
        if !is_tty {
            return Err(BackendError::NotATty);
        }

        let depth = color_depth(&term, options.truecolor);
        log::debug!(target: logging::BACKEND, "terminal {term:?} with {depth:?}");
        let (columns, rows) = read_winsize(stdout_fd).unwrap_or((80, 24));

        Ok(Self {
            stdin_fd,
            stdout_fd,
            term,
            utf8: *UTF8_LOCALE,
            original_termios: None,
            cells: CellBuffer::new(columns, rows),
            output: OutputGate::new(depth),
            cursor: None,
            last_style: None,
            mouse: false,
            paste: false,
            initialized: false,
            raw_seqs: Arc::new(Mutex::new(SharedRawSeqs::default())),
            events: Arc::new(EventQueue::new()),
            input_thread: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            resize_signal_handle: None,
            resize_thread: None,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn color_depth(&self) -> ColorDepth {
        self.output.depth()
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let original = match self.original_termios {
            Some(original) => original,
            None => {
                let original = get_termios(self.stdin_fd)?;
                self.original_termios = Some(original);
                original
            }
        };
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        set_termios(self.stdin_fd, &raw)
    }

    fn restore_raw_mode(&mut self) -> io::Result<()> {
        if let Some(original) = self.original_termios.as_ref() {
            set_termios(self.stdin_fd, original)?;
        }
        Ok(())
    }

    fn start_input_thread(&mut self) {
        let stdin_fd = self.stdin_fd;
        let events = Arc::clone(&self.events);
        let stop_flag = Arc::clone(&self.stop_flag);
        let raw_seqs = Arc::clone(&self.raw_seqs);

        self.input_thread = Some(thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            let mut stdin_buffer = StdinBuffer::new(ESC_TIMEOUT_MS);
            let mut seen_version = None;

            while !stop_flag.load(Ordering::SeqCst) {
                {
                    let shared = match raw_seqs.lock() {
                        Ok(shared) => shared,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    if seen_version != Some(shared.version) {
                        stdin_buffer.set_raw_seqs(&shared.seqs.to_vec());
                        seen_version = Some(shared.version);
                    }
                }

                let now = Instant::now();
                let timeout_ms = stdin_buffer.next_timeout_ms(now, INPUT_POLL_MS);
                let readable = poll_readable(stdin_fd, timeout_ms);
                let batch = if readable {
                    let read_len = unsafe {
                        libc::read(stdin_fd, buffer.as_mut_ptr() as *mut _, buffer.len())
                    };
                    if read_len <= 0 {
                        Vec::new()
                    } else {
                        stdin_buffer.process(&buffer[..read_len as usize])
                    }
                } else {
                    stdin_buffer.flush_due(now)
                };

                for event in batch {
                    events.push(map_stdin_event(event));
                }
            }
        }));
    }

    fn stop_input_thread(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn start_resize_thread(&mut self) -> io::Result<()> {
        let mut signals = Signals::new([libc::SIGWINCH])?;
        let handle = signals.handle();
        let events = Arc::clone(&self.events);
        let stdout_fd = self.stdout_fd;

        let thread = thread::spawn(move || {
            for _ in signals.forever() {
                if let Some((columns, rows)) = read_winsize(stdout_fd) {
                    events.push(Event::Resize { columns, rows });
                }
            }
        });

        self.resize_signal_handle = Some(handle);
        self.resize_thread = Some(thread);
        Ok(())
    }

    fn stop_resize_thread(&mut self) {
        if let Some(handle) = self.resize_signal_handle.take() {
            handle.close();
        }
        if let Some(thread) = self.resize_thread.take() {
            let _ = thread.join();
        }
    }

    fn update_raw_seqs(&self, update: impl FnOnce(&mut RawSequenceSet) -> bool) {
        let mut shared = match self.raw_seqs.lock() {
            Ok(shared) => shared,
            Err(poisoned) => poisoned.into_inner(),
        };
        if update(&mut shared.seqs) {
            shared.version += 1;
        }
    }

    /// Write pending commands now. Ignored before `init` and after `fini`.
    fn flush_output(&mut self) -> io::Result<()> {
        let mut out = String::new();
        self.output.flush(&mut out);
        if !self.initialized {
            return Ok(());
        }
        write_fd(self.stdout_fd, &out)
    }

    fn flush_best_effort(&mut self) {
        if let Err(err) = self.flush_output() {
            log::warn!(target: logging::BACKEND, "terminal write failed: {err}");
        }
    }
}

#[cfg(unix)]
impl Backend for ProcessBackend {
    fn init(&mut self) -> io::Result<()> {
        self.stop_flag.store(false, Ordering::SeqCst);
        self.events.reset();
        self.enable_raw_mode()?;
        if let Err(err) = self.start_resize_thread() {
            let _ = self.restore_raw_mode();
            return Err(err);
        }
        self.start_input_thread();
        self.initialized = true;

        if let Some((columns, rows)) = read_winsize(self.stdout_fd) {
            self.cells.resize(columns, rows);
        }
        self.cells.invalidate();
        self.last_style = None;
        self.output.push(TerminalCmd::AltScreenEnter);
        self.output.push(TerminalCmd::HideCursor);
        self.output.push(TerminalCmd::ResetStyle);
        self.output.push(TerminalCmd::ClearScreen);
        self.flush_output()
    }

    fn fini(&mut self) {
        if !self.initialized {
            self.events.close();
            return;
        }
        self.stop_input_thread();
        self.stop_resize_thread();

        self.output.push(TerminalCmd::ResetStyle);
        self.output.push(TerminalCmd::ShowCursor);
        if self.mouse {
            self.output.push(TerminalCmd::MouseDisable);
        }
        if self.paste {
            self.output.push(TerminalCmd::BracketedPasteDisable);
        }
        self.output.push(TerminalCmd::AltScreenLeave);
        self.flush_best_effort();
        self.initialized = false;
        self.mouse = false;
        self.paste = false;

        // Flush input before leaving raw mode to avoid buffered bytes leaking to the shell.
        let _ = unsafe { libc::tcflush(self.stdin_fd, libc::TCIFLUSH) };
        if let Err(err) = self.restore_raw_mode() {
            log::warn!(target: logging::BACKEND, "failed to restore terminal mode: {err}");
        }
        self.events.close();
    }

    fn size(&self) -> (usize, usize) {
        read_winsize(self.stdout_fd).unwrap_or_else(|| self.cells.size())
    }

    fn get_content(&self, x: usize, y: usize) -> Cell {
        self.cells.get(x, y).cloned().unwrap_or_default()
    }

    fn set_content(&mut self, x: usize, y: usize, ch: char, combining: &[char], style: Style) {
        let ch = if self.utf8 || ch.is_ascii() {
            ch
        } else {
            ascii_fallback(ch).unwrap_or('?')
        };
        let combining: &[char] = if self.utf8 { combining } else { &[] };
        self.cells.set(x, y, Cell::new(ch, combining, style));
    }

    fn show_cursor(&mut self, x: usize, y: usize) {
        self.cursor = Some((x, y));
    }

    fn hide_cursor(&mut self) {
        self.cursor = None;
    }

    fn show(&mut self) -> io::Result<()> {
        let (columns, rows) = self.size();
        if (columns, rows) != self.cells.size() {
            self.cells.resize(columns, rows);
            self.output.push(TerminalCmd::ClearScreen);
            self.last_style = None;
        }

        self.output.push(TerminalCmd::HideCursor);
        let mut next_x = None;
        for (x, y, cell) in self.cells.take_dirty() {
            if next_x != Some((x, y)) {
                self.output.push(TerminalCmd::MoveTo { x, y });
            }
            if self.last_style != Some(cell.style) {
                self.output.push(TerminalCmd::SetStyle(cell.style));
                self.last_style = Some(cell.style);
            }
            self.output.push(TerminalCmd::bytes(cell.symbol()));
            next_x = Some((x + cell.width(), y));
        }
        if let Some((x, y)) = self.cursor {
            self.output.push(TerminalCmd::MoveTo { x, y });
            self.output.push(TerminalCmd::ShowCursor);
        }
        self.flush_output()
    }

    fn clear(&mut self, style: Style) {
        self.cells.fill(Cell::new(' ', &[], style));
    }

    fn enable_mouse(&mut self) {
        self.mouse = true;
        self.output.push(TerminalCmd::MouseEnable);
        self.flush_best_effort();
    }

    fn disable_mouse(&mut self) {
        self.mouse = false;
        self.output.push(TerminalCmd::MouseDisable);
        self.flush_best_effort();
    }

    fn set_paste(&mut self, enabled: bool) {
        self.paste = enabled;
        self.output.push(if enabled {
            TerminalCmd::BracketedPasteEnable
        } else {
            TerminalCmd::BracketedPasteDisable
        });
        self.flush_best_effort();
    }

    fn register_raw_seq(&mut self, seq: &str) {
        self.update_raw_seqs(|seqs| seqs.insert(seq));
    }

    fn unregister_raw_seq(&mut self, seq: &str) {
        self.update_raw_seqs(|seqs| seqs.remove(seq));
    }

    fn can_display(&self, ch: char, check_fallbacks: bool) -> bool {
        if ch.is_control() || ch.width().is_none() {
            return false;
        }
        if self.utf8 || ch.is_ascii() {
            return true;
        }
        check_fallbacks && ascii_fallback(ch).is_some()
    }

    fn events(&self) -> Arc<EventQueue> {
        Arc::clone(&self.events)
    }
}

#[cfg(unix)]
impl Drop for ProcessBackend {
    fn drop(&mut self) {
        if self.initialized {
            self.fini();
        }
    }
}

/// Builds [`ProcessBackend`]s on stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessFactory;

#[cfg(unix)]
impl BackendFactory for ProcessFactory {
    fn create(&self, options: &BackendOptions) -> Result<Box<dyn Backend>, BackendError> {
        Ok(Box::new(ProcessBackend::new(options)?))
    }
}

#[cfg(not(unix))]
impl BackendFactory for ProcessFactory {
    fn create(&self, _options: &BackendOptions) -> Result<Box<dyn Backend>, BackendError> {
        Err(BackendError::Unavailable(
            "the process backend needs a Unix terminal".to_string(),
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io;
    use std::time::{Duration, Instant};

    use super::{ascii_fallback, color_depth, get_termios, poll_readable, write_all_fd_with, ProcessBackend};
    use crate::core::backend::{Backend, BackendOptions};
    use crate::core::event::{Event, Poll};
    use crate::core::output::ColorDepth;
    use crate::core::style::Style;
    use crate::error::BackendError;
    use assert_matches::assert_matches;

    use libc::{self, c_int};

    struct Pty {
        master: c_int,
        slave: c_int,
    }

    impl Drop for Pty {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.master);
                libc::close(self.slave);
            }
        }
    }

    fn open_pty() -> Pty {
        let mut master: c_int = 0;
        let mut slave: c_int = 0;
        let result = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, 0, "openpty failed");
        Pty { master, slave }
    }

    fn read_available(fd: c_int, timeout: Duration) -> Vec<u8> {
        let end = Instant::now() + timeout;
        let mut out = Vec::new();
        while Instant::now() < end {
            let remaining = end.saturating_duration_since(Instant::now());
            let timeout_ms = remaining.as_millis().min(i32::MAX as u128) as i32;
            if timeout_ms == 0 || !poll_readable(fd, timeout_ms) {
                break;
            }
            let mut buf = [0u8; 1024];
            let read_len = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) };
            if read_len <= 0 {
                break;
            }
            out.extend_from_slice(&buf[..read_len as usize]);
        }
        out
    }

    fn write_master(pty: &Pty, payload: &[u8]) {
        let _ = unsafe {
            libc::write(
                pty.master,
                payload.as_ptr() as *const libc::c_void,
                payload.len(),
            )
        };
    }

    fn xterm() -> BackendOptions {
        BackendOptions {
            truecolor: Some(false),
            term: Some("xterm-256color".to_string()),
        }
    }

    fn wait_event(backend: &ProcessBackend) -> Event {
        match backend.events().wait_timeout(Duration::from_millis(500)) {
            Poll::Event(event) => event,
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn dumb_and_empty_terminals_are_rejected() {
        let pty = open_pty();
        let dumb = BackendOptions {
            term: Some("dumb".to_string()),
            truecolor: None,
        };
        assert_matches!(
            ProcessBackend::with_fds(pty.slave, pty.slave, &dumb),
            Err(BackendError::UnsupportedTerminal { .. })
        );
    }

    #[test]
    fn non_tty_descriptors_are_rejected() {
        let mut fds = [0 as c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let result = ProcessBackend::with_fds(fds[0], fds[1], &xterm());
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
        assert_matches!(result, Err(BackendError::NotATty));
    }

    #[test]
    fn init_enters_raw_mode_and_fini_restores_it() {
        let pty = open_pty();
        let original = get_termios(pty.slave).expect("get termios");

        let mut backend = ProcessBackend::with_fds(pty.slave, pty.slave, &xterm()).expect("backend");
        backend.init().expect("init");
        let raw = get_termios(pty.slave).expect("get termios");
        assert_eq!(raw.c_lflag & libc::ICANON, 0, "raw mode not enabled");
        let output = read_available(pty.master, Duration::from_millis(200));
        assert!(String::from_utf8_lossy(&output).contains("\x1b[?1049h"));

        backend.fini();
        let restored = get_termios(pty.slave).expect("get termios");
        assert_eq!(
            restored.c_lflag & libc::ICANON,
            original.c_lflag & libc::ICANON
        );
        let output = read_available(pty.master, Duration::from_millis(200));
        assert!(String::from_utf8_lossy(&output).contains("\x1b[?1049l"));
        assert!(backend.events().is_closed());
    }

    #[test]
    fn show_writes_only_changed_cells() {
        let pty = open_pty();
        let mut backend = ProcessBackend::with_fds(pty.slave, pty.slave, &xterm()).expect("backend");
        backend.init().expect("init");
        backend.show().expect("first show");
        read_available(pty.master, Duration::from_millis(200));

        backend.set_content(2, 0, 'Z', &[], Style::default().reverse(true));
        backend.show().expect("show");
        let output = String::from_utf8_lossy(&read_available(pty.master, Duration::from_millis(200)))
            .to_string();
        assert!(output.contains("\x1b[1;3H"), "missing move: {output:?}");
        assert!(output.contains("\x1b[0;7mZ"), "missing styled cell: {output:?}");

        backend.show().expect("idle show");
        let output = String::from_utf8_lossy(&read_available(pty.master, Duration::from_millis(200)))
            .to_string();
        assert!(!output.contains('Z'));
        backend.fini();
    }

    #[test]
    fn input_is_split_and_raw_sequences_are_recognized() {
        let pty = open_pty();
        let mut backend = ProcessBackend::with_fds(pty.slave, pty.slave, &xterm()).expect("backend");
        backend.register_raw_seq("\x1b[1;5A");
        backend.init().expect("init");

        write_master(&pty, b"x\x1b[1;5A\x1b[200~hello\x1b[201~");
        assert_eq!(wait_event(&backend), Event::Input("x".to_string()));
        assert_eq!(wait_event(&backend), Event::RawSeq("\x1b[1;5A".to_string()));
        assert_eq!(wait_event(&backend), Event::Paste("hello".to_string()));

        backend.unregister_raw_seq("\x1b[1;5A");
        // Let the input thread pick up the new registry.
        std::thread::sleep(Duration::from_millis(120));
        write_master(&pty, b"\x1b[1;5A");
        assert_eq!(wait_event(&backend), Event::Input("\x1b[1;5A".to_string()));
        backend.fini();
    }

    #[test]
    fn init_fails_on_bad_descriptor() {
        let pty = open_pty();
        let mut backend = ProcessBackend::with_fds(pty.slave, pty.slave, &xterm()).expect("backend");
        backend.stdin_fd = -1;
        let err = backend.init().expect_err("expected init to fail");
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn color_depth_follows_policy_and_term() {
        assert_eq!(color_depth("xterm-256color", Some(true)), ColorDepth::TrueColor);
        assert_eq!(color_depth("xterm-256color", Some(false)), ColorDepth::Palette256);
        assert_eq!(color_depth("xterm", Some(false)), ColorDepth::Ansi16);
    }

    #[test]
    fn line_drawing_has_ascii_fallbacks() {
        assert_eq!(ascii_fallback('─'), Some('-'));
        assert_eq!(ascii_fallback('┼'), Some('+'));
        assert_eq!(ascii_fallback('€'), None);
    }

    #[test]
    fn write_all_fd_with_handles_partial_writes() {
        let data = b"abcdefg";
        let mut out = Vec::new();
        let mut calls = 0;
        write_all_fd_with(
            1,
            data,
            |_, buf| {
                calls += 1;
                let count = buf.len().min(2);
                out.extend_from_slice(&buf[..count]);
                Ok(count)
            },
            |_| unreachable!("wait_writable should not be called for partial writes"),
        )
        .expect("write_all_fd_with failed");

        assert_eq!(out, data);
        assert!(calls > 1, "expected multiple writes, got {calls}");
    }

    #[test]
    fn write_all_fd_with_waits_for_writable_on_would_block_and_retries() {
        let data = b"xyz";
        let mut out = Vec::new();
        let mut calls = 0;
        let events = std::cell::RefCell::new(Vec::new());
        write_all_fd_with(
            1,
            data,
            |_, buf| {
                events.borrow_mut().push("write");
                calls += 1;
                if calls == 1 {
                    return Err(io::Error::from(io::ErrorKind::WouldBlock));
                }
                out.extend_from_slice(buf);
                Ok(buf.len())
            },
            |_| {
                events.borrow_mut().push("wait");
                Ok(())
            },
        )
        .expect("write_all_fd_with failed");

        assert_eq!(out, data);
        assert_eq!(events.into_inner(), vec!["write", "wait", "write"]);
    }
}
