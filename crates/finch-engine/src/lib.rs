pub mod arguments;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod reassembler;
pub mod registry;
pub mod session;

pub use dispatcher::ToolDispatcher;
pub use error::EngineError;
pub use orchestrator::{SubAgent, SubAgentOrchestrator};
pub use reassembler::{CompleteToolCall, StreamReassembler, TurnItem};
pub use registry::{AgentRegistry, ToolRegistry};
pub use session::{ConversationSession, OutputItem, RawTurn};
