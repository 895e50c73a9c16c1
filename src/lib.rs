// Bounded-memory, single-connection HTTP/1.1 request handler
pub mod config;
pub mod context;
pub mod demo;
pub mod error;
pub mod features;
pub mod handler;
pub mod http;
pub mod log;
pub mod metrics;
pub mod reader;
pub mod server;
pub mod stream;
pub mod window;

pub use crate::error::{HandleError, Outcome, ProtocolError, SetupError};
pub use crate::features::{Credentials, Features, RequestProcessor};
pub use crate::handler::HttpHandler;
pub use crate::http::{HttpRequest, HttpResponse, Method, Parameter};
pub use crate::stream::{Connection, TcpConnection};
