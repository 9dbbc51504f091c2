//! Manual Review
//!
//! Human-in-the-loop judgment with the same return shape as the automated
//! validator. Generic over reader/writer so terminals and tests share it.

use std::io::{self, BufRead, Write};

use super::validator::ValidatedResponse;

pub struct ManualReviewer<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ManualReviewer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed during manual review",
            ));
        }
        Ok(line.trim().to_string())
    }

    /// Ask until the reviewer confirms (`y` or empty answer)
    pub fn review(&mut self) -> io::Result<ValidatedResponse> {
        loop {
            let success = self.ask("Success? (y/n) ")?.eq_ignore_ascii_case("y");
            let critique = self.ask("Enter your critique: ")?;
            writeln!(self.output, "Success: {}\nCritique: {}", success, critique)?;

            let confirm = self.ask("Confirm? (y/n) ")?;
            if confirm.is_empty() || confirm == "y" {
                return Ok(ValidatedResponse { success, critique });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirmed_first_pass() {
        let mut out = Vec::new();
        let mut reviewer = ManualReviewer::new(Cursor::new("y\nlooks good\ny\n"), &mut out);
        let r = reviewer.review().unwrap();
        assert_eq!(r, ValidatedResponse::new(true, "looks good"));
        assert!(String::from_utf8(out).unwrap().contains("Critique: looks good"));
    }

    #[test]
    fn test_empty_confirmation_accepts() {
        let mut reviewer = ManualReviewer::new(Cursor::new("n\n\n\n"), Vec::new());
        assert_eq!(reviewer.review().unwrap(), ValidatedResponse::new(false, ""));
    }

    #[test]
    fn test_rejection_restarts() {
        let input = "y\nfirst\nn\nn\nsecond\ny\n";
        let mut reviewer = ManualReviewer::new(Cursor::new(input), Vec::new());
        assert_eq!(reviewer.review().unwrap(), ValidatedResponse::new(false, "second"));
    }

    #[test]
    fn test_eof_is_an_error() {
        let mut reviewer = ManualReviewer::new(Cursor::new("y\n"), Vec::new());
        assert!(reviewer.review().is_err());
    }
}
