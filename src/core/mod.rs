pub mod auth;
pub mod error;
pub mod forwarded;
pub mod gateway;
pub mod resolver;
pub mod routes;
pub mod upstream;

pub use auth::{AuthError, Principal, SharedSecret, TokenVerifier};
pub use error::GatewayError;
pub use forwarded::{ForwardedContext, Scheme};
pub use gateway::GatewayService;
pub use resolver::UrlResolver;
pub use routes::RouteTable;
