//! Tool adapters and the registry that routes calls to them
//!
//! - `local`: in-process document tools
//! - `deployment`: calls to external model-serving endpoints
//! - `remote`: tools discovered on remote tool servers

pub mod adapter;
pub mod deployment;
pub mod local;
pub mod remote;

mod registry;

pub use adapter::ToolAdapter;
pub use deployment::{DeploymentTool, HttpDeploymentClient, IMAGE_GENERATION};
pub use local::{DocumentSearchTool, FileContentTool, LocalTool};
pub use registry::{RegistryStats, ToolRegistry};
pub use remote::RemoteTool;
