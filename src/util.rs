use anstyle::Style;
use std::io::{IsTerminal, Write};

/// Brackets the output of one executed runnable with `<<< name` and `>>> name`.
pub struct Delimiter<'a>(&'a str);

impl<'a> Delimiter<'a> {
    pub fn new(name: &'a str) -> Self {
        let self_ = Self(name);
        self_.write_message(true);
        self_
    }

    fn write_message(&self, opening: bool) {
        let message = format!("{} {}", if opening { "<<<" } else { ">>>" }, self.0);
        let style = if std::io::stderr().is_terminal() {
            Style::new().bold()
        } else {
            Style::new()
        };
        writeln!(
            std::io::stderr(),
            "{}{message}{}",
            style.render(),
            style.render_reset()
        )
        .unwrap_or_default();
    }
}

impl Drop for Delimiter<'_> {
    fn drop(&mut self) {
        self.write_message(false);
    }
}
