pub mod capture;
pub mod error;
pub mod events;
pub mod handle;
pub mod playback;
pub mod session;
pub mod store;
pub mod testing;
pub mod traits;

pub use error::ChatError;
pub use handle::SessionHandle;
pub use session::{ChatSession, SessionConfig, SessionProviders, SessionSnapshot};
