// --- Module Structure ---

// Identity: token decoding, the derived session, and the store that owns it.
pub mod auth;
pub mod session;
pub mod storage;

// Authorization: capability checks and route guards.
pub mod capability;
pub mod guard;

// Data and persistence.
pub mod models;
pub mod repository;

pub mod moderation;
pub mod config;

// Route table, grouped by guard (Public, Authenticated, Admin).
pub mod routes;

// --- Public Re-exports ---

pub use auth::{IdentityClaims, Role, Session};
pub use capability::{Action, CapabilityResolver, Denied, Owned};
pub use config::AppConfig;
pub use guard::{Guard, GuardDecision, History, Navigator};
pub use moderation::{EditPolicy, ModerationBoard, ModerationError, ModerationPipeline};
pub use repository::{
    CommentRepositoryState, HttpRepository, InMemoryRepository, PostRepositoryState,
    RepositoryError,
};
pub use routes::{Navigation, Router, View};
pub use session::SessionStore;
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStoreState};
