/*!
 * Console Resolver
 * Interactive deadlock resolution over a line-based reader and writer
 */

use crate::core::types::ResourceId;
use crate::deadlock::{DeadlockResolver, ResolutionRequest};
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use tracing::warn;

/// Prompts an operator for the resource to force-release
///
/// An empty line, `q`, `quit` or end of input abandons the run.
pub struct ConsoleResolver<R, W> {
    input: R,
    output: W,
}

impl ConsoleResolver<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn show(&mut self, request: &ResolutionRequest) -> io::Result<()> {
        if let Some(rejection) = &request.rejection {
            writeln!(self.output, "Rejected: {}", rejection)?;
        } else {
            writeln!(
                self.output,
                "Deadlock detected among: {}",
                request.participants.join(", ")
            )?;
            for (resource, owner) in &request.ownership {
                writeln!(self.output, "  R{} held by {}", resource, owner)?;
            }
            for (process, resources) in &request.waiting {
                let resources: Vec<String> = resources.iter().map(|r| format!("R{}", r)).collect();
                writeln!(self.output, "  {} waiting on {}", process, resources.join(", "))?;
            }
        }
        let candidates: Vec<String> = request.candidates.iter().map(|r| r.to_string()).collect();
        write!(
            self.output,
            "Resource to release [{}] (q to abort): ",
            candidates.join(", ")
        )?;
        self.output.flush()
    }

    fn ask(&mut self, request: &ResolutionRequest) -> io::Result<Option<ResourceId>> {
        self.show(request)?;
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let answer = line.trim();
            if answer.is_empty() || answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
                return Ok(None);
            }
            let answer = answer.trim_start_matches(['R', 'r']);
            match answer.parse::<ResourceId>() {
                Ok(resource) => return Ok(Some(resource)),
                Err(_) => {
                    write!(self.output, "Not a resource id, try again: ")?;
                    self.output.flush()?;
                }
            }
        }
    }
}

impl<R, W> DeadlockResolver for ConsoleResolver<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn choose(&mut self, request: &ResolutionRequest) -> Option<ResourceId> {
        match self.ask(request) {
            Ok(choice) => choice,
            Err(e) => {
                warn!(error = %e, "Console resolver failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ResolutionError;
    use std::io::Cursor;

    fn request() -> ResolutionRequest {
        ResolutionRequest {
            participants: vec!["P1".into(), "P2".into()],
            candidates: vec![0, 1],
            ownership: vec![(0, "P1".into()), (1, "P2".into())],
            waiting: [("P1".to_string(), vec![1]), ("P2".to_string(), vec![0])].into(),
            attempt: 1,
            rejection: None,
        }
    }

    #[test]
    fn test_reads_choice_after_garbage() {
        let mut resolver = ConsoleResolver::new(Cursor::new("abc\nR1\n"), Vec::new());
        assert_eq!(resolver.choose(&request()), Some(1));

        let shown = String::from_utf8(resolver.into_output()).unwrap();
        assert!(shown.contains("Deadlock detected among: P1, P2"));
        assert!(shown.contains("R0 held by P1"));
        assert!(shown.contains("P2 waiting on R0"));
        assert!(shown.contains("Not a resource id"));
    }

    #[test]
    fn test_quit_and_eof_abandon() {
        let mut resolver = ConsoleResolver::new(Cursor::new("q\n"), Vec::new());
        assert_eq!(resolver.choose(&request()), None);

        let mut resolver = ConsoleResolver::new(Cursor::new(""), Vec::new());
        assert_eq!(resolver.choose(&request()), None);
    }

    #[test]
    fn test_rejection_is_shown() {
        let mut req = request();
        req.attempt = 2;
        req.rejection = Some(ResolutionError::NotInCycle(5));

        let mut resolver = ConsoleResolver::new(Cursor::new("0\n"), Vec::new());
        assert_eq!(resolver.choose(&req), Some(0));
        let shown = String::from_utf8(resolver.into_output()).unwrap();
        assert!(shown.contains("Rejected: Resource 5 is not part of the detected cycle"));
    }
}
