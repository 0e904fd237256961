//! # followloop Orchestrator
//!
//! Process-wide coordinator for page contexts. It never touches the DOM:
//! it injects the page scripts, waits for them to report ready and relays
//! [`AgentCommand`](followloop_protocols::AgentCommand)s with retries.
//!
//! [`LocalPageChannel`] hosts the page scripts in this process, one
//! [`PageHost`] per browser tab.

mod error;
mod guard;
mod local;
mod orchestrator;
mod scripted;
mod watch;

pub use error::{OrchestratorError, OrchestratorResult};
pub use guard::{check_page_url, is_profile_path};
pub use local::{LocalPageChannel, PageHost};
pub use orchestrator::Orchestrator;
pub use scripted::{PageDiagnosis, ScriptedTestReport};
