/// Events emitted by the process runner while `go test` executes.
///
/// These events decouple the subprocess plumbing from the consumer that
/// classifies output, so the aggregator sees one ordered stream regardless
/// of how the runner reads its pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The runner process has been spawned.
    Started { program: String, args: Vec<String> },
    /// One line of output, without its trailing newline.
    Output { line: String, is_stderr: bool },
    /// The runner process has exited. `code` is `None` when killed by a signal.
    Exited { code: Option<i32> },
}
