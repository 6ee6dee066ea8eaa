//! Destination for `print` output.
//!
//! Scripts run from the CLI print to stdout; tests and embedders capture
//! output in a shared buffer instead.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub enum PrintHandler {
    /// Write to stdout (default)
    #[default]
    Stdout,
    /// Append to a buffer shared by every clone of this handler
    Buffer(Rc<RefCell<String>>),
}

impl PrintHandler {
    /// A fresh, empty capture buffer
    pub fn buffer() -> Self {
        PrintHandler::Buffer(Rc::new(RefCell::new(String::new())))
    }

    /// Print a line (with newline).
    pub fn println(&self, msg: &str) {
        match self {
            PrintHandler::Stdout => {
                let mut stdout = std::io::stdout().lock();
                // a closed stdout is not a script error
                let _ = writeln!(stdout, "{msg}");
            }
            PrintHandler::Buffer(buf) => {
                let mut buf = buf.borrow_mut();
                buf.push_str(msg);
                buf.push('\n');
            }
        }
    }

    /// Captured output. Always empty for stdout.
    pub fn contents(&self) -> String {
        match self {
            PrintHandler::Stdout => String::new(),
            PrintHandler::Buffer(buf) => buf.borrow().clone(),
        }
    }

    /// Clear captured output.
    pub fn clear(&self) {
        if let PrintHandler::Buffer(buf) = self {
            buf.borrow_mut().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_is_shared_between_clones() {
        let handler = PrintHandler::buffer();
        let clone = handler.clone();
        clone.println("a");
        handler.println("b");
        assert_eq!(handler.contents(), "a\nb\n");

        handler.clear();
        assert_eq!(clone.contents(), "");
    }

    #[test]
    fn test_stdout_captures_nothing() {
        let handler = PrintHandler::Stdout;
        assert_eq!(handler.contents(), "");
    }
}
