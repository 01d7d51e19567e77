pub mod coordinator;
pub mod dispatcher;
pub mod refresher;
pub mod session;
pub mod state;

pub use coordinator::{ActionCoordinator, ActionScope};
pub use dispatcher::{AuthMode, Failure, Payload, RequestBody, RequestDispatcher, RequestSpec};
pub use refresher::TokenRefresher;
pub use session::{AuthState, RequestContext, SessionStore};
pub use state::{ClientState, LoadingSlice};
