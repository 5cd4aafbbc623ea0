// Services module - agent client, jwt, patch merge, save coordination

pub mod agent_service;
pub mod jwt_service;
pub mod merge_service;
pub mod save_service;

pub use agent_service::{AgentReply, AgentService};
pub use jwt_service::JwtService;
pub use save_service::SaveCoordinator;
