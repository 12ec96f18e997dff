// Tools the model can call. Each one is registered in a `ToolRegistry`,
// which is the single source of both the declarations sent to the model and
// the dispatch table.

pub mod calendar_tools;
pub mod canvas_tools;
pub mod document_tools;
pub mod hello_tool;
pub mod registry;
pub mod tool_error;

pub use calendar_tools::{CreateCalendarEventTool, ReadCalendarEventsTool};
pub use canvas_tools::UpcomingAssignmentsTool;
pub use document_tools::CreateGoogleDocTool;
pub use hello_tool::HelloWorldTool;
pub use registry::{RegistryError, Tool, ToolContext, ToolRegistry};
pub use tool_error::ToolError;
