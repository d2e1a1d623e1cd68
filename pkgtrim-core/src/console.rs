use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

fn use_color() -> bool {
    static USE_COLOR: OnceLock<bool> = OnceLock::new();
    *USE_COLOR.get_or_init(|| env::var_os("NO_COLOR").is_none())
}

fn is_tty() -> bool {
    static IS_TTY: OnceLock<bool> = OnceLock::new();
    *IS_TTY.get_or_init(|| io::stderr().is_terminal())
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\u{1b}[{}m{}\u{1b}[0m", code, text)
    } else {
        text.to_string()
    }
}

fn dim(text: &str) -> String {
    paint("2", text)
}

fn green(text: &str) -> String {
    paint("32", text)
}

fn yellow(text: &str) -> String {
    paint("33", text)
}

fn red(text: &str) -> String {
    paint("31", text)
}

fn elapsed_ms() -> u128 {
    START_TIME
        .get()
        .map(|t| t.elapsed().as_millis())
        .unwrap_or(0)
}

pub fn header(command: &str) {
    START_TIME.get_or_init(Instant::now);
    eprintln!(
        "{}",
        dim(&format!("pkgtrim {} v{}", command, env!("CARGO_PKG_VERSION")))
    );
    eprintln!();
}

/// Transient progress line; overwritten by the next one on a terminal.
pub fn step(message: &str) {
    if is_tty() {
        eprint!("\r\u{1b}[K{}", dim(message));
        let _ = io::stderr().flush();
    }
}

pub fn clear_line() {
    if is_tty() {
        eprint!("\r\u{1b}[K");
        let _ = io::stderr().flush();
    }
}

pub fn removal(
    file: &str,
    package: &str,
    scope: &str,
    reason: &str,
    provider: &str,
    dry_run: bool,
) {
    let action = if dry_run {
        yellow("would remove")
    } else {
        red("removing")
    };
    println!(
        "{}: {} {} from {} ({}: {})",
        file, action, package, scope, reason, provider
    );
}

pub fn file_summary(file: &str, count: usize, dry_run: bool) {
    let action = if dry_run { "would remove" } else { "removed" };
    println!("{}: {} {} redundant packages", file, action, count);
}

pub fn nothing_to_trim(file: &str) {
    println!("{}: {}", file, green("no redundant packages found"));
}

pub fn file_error(file: &str, message: &str) {
    println!("{}: {} {}", file, red("error:"), message);
}

pub fn done(files: usize) {
    let noun = if files == 1 { "file" } else { "files" };
    eprintln!();
    eprintln!(
        "{}",
        dim(&format!("checked {} {} in {}ms", files, noun, elapsed_ms()))
    );
}

pub fn warn(message: &str) {
    let tag = yellow("warn");
    eprintln!("{} {}", tag, message);
}

pub fn error(message: &str) {
    let tag = red("error");
    eprintln!("{} {}", tag, message);
}

pub fn info(message: &str) {
    println!("{}", message);
}

pub fn detail(label: &str, value: &str) {
    println!("  {} {}", dim(label), value);
}
