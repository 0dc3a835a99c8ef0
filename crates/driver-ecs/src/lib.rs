pub mod api;
pub mod ecs_client;

pub use ecs_client::EcsCliClient;
