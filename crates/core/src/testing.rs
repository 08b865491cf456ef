//! Scripted [`CommandRunner`] for unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use droid_protocol::CommandResult;
use droid_runtime::CommandRunner;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
	Exit(i32, String, String),
	Timeout(String),
	Launch(String),
	/// Sleeps before answering with the inner reply.
	Delayed(Duration, Box<Reply>),
}

impl Reply {
	pub(crate) fn ok(stdout: &str) -> Self {
		Reply::Exit(0, stdout.to_string(), String::new())
	}

	pub(crate) fn fail(code: i32, stderr: &str) -> Self {
		Reply::Exit(code, String::new(), stderr.to_string())
	}

	pub(crate) fn after(millis: u64, reply: Reply) -> Self {
		Reply::Delayed(Duration::from_millis(millis), Box::new(reply))
	}
}

/// Replies to commands whose joined argv contains a needle. Queued replies
/// are used once each, oldest first, ahead of the standing rules. Among
/// standing rules those added later win; unmatched commands exit 0 with no
/// output.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
	rules: Mutex<Vec<(String, Reply)>>,
	queued: Mutex<Vec<(String, Reply)>>,
	calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn on(&self, needle: &str, reply: Reply) {
		self.rules.lock().push((needle.to_string(), reply));
	}

	pub(crate) fn queue(&self, needle: &str, reply: Reply) {
		self.queued.lock().push((needle.to_string(), reply));
	}

	/// Every argv seen so far, joined with spaces.
	pub(crate) fn calls(&self) -> Vec<String> {
		self.calls.lock().iter().map(|argv| argv.join(" ")).collect()
	}

	pub(crate) fn calls_matching(&self, needle: &str) -> Vec<String> {
		self.calls().into_iter().filter(|c| c.contains(needle)).collect()
	}
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
	async fn run(&self, argv: &[String], _timeout: Duration) -> CommandResult {
		let joined = argv.join(" ");
		self.calls.lock().push(argv.to_vec());
		let queued = {
			let mut queued = self.queued.lock();
			queued
				.iter()
				.position(|(needle, _)| joined.contains(needle.as_str()))
				.map(|index| queued.remove(index).1)
		};
		let reply = queued.or_else(|| {
			self.rules
				.lock()
				.iter()
				.rev()
				.find(|(needle, _)| joined.contains(needle.as_str()))
				.map(|(_, reply)| reply.clone())
		});

		let mut reply = reply.unwrap_or_else(|| Reply::ok(""));
		loop {
			match reply {
				Reply::Delayed(delay, inner) => {
					tokio::time::sleep(delay).await;
					reply = *inner;
				}
				Reply::Exit(code, out, err) => return CommandResult::exited(joined, code, out, err),
				Reply::Timeout(partial) => return CommandResult::timed_out(joined, partial, String::new()),
				Reply::Launch(message) => return CommandResult::launch_error(joined, message),
			}
		}
	}
}
