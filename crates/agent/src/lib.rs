//! The core agent loop for gitscribe.
//!
//! One run follows a **model turn → tool turn → ... → answer** cycle:
//!
//! 1. **Seed** a history with the user's prompt
//! 2. **Call the model** with the system instruction, the history and the
//!    tool catalog
//! 3. **If tool requests**: execute them in order, append the results, go
//!    back to step 2
//! 4. **If a text answer**: the run is done
//!
//! The loop stops early when the step bound is reached, which is reported
//! as its own outcome. The system instruction carries the path-resolution
//! procedure; the loop itself has no repository-specific branching.

pub mod answer;
pub mod context;
pub mod instructions;
pub mod loop_runner;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use answer::final_answer;
pub use context::AgentContext;
pub use instructions::{InstructionError, InstructionParams, SYSTEM_V1, SystemInstruction};
pub use loop_runner::{AgentLoop, AgentRun, Phase, RunOutcome};
pub use stream_event::AgentStreamEvent;
