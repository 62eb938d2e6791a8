//! Rate-limit-aware, filtered and windowed access to a user's GitHub activity,
//! plus the formatting that turns it into a resume-summary request.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod http;
pub mod mcp;
pub mod pager;
pub mod prompt;
pub mod rate;
pub mod server;
pub mod service;
pub mod stream;
pub mod tools;
pub mod types;
pub mod window;

pub use error::{ErrorKind, FetchError};
pub use service::ActivityService;
