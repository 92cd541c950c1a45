//! Resistencia Engine library.
//!
//! Server side of the story player: live play and paint sessions over REST.
//!
//! ## Structure
//!
//! - `use_cases/` - Session and progression orchestration
//! - `stores/` - In-memory storage for live sessions
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
