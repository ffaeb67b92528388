pub mod api;
pub mod dispatcher;
pub mod refresh;
pub mod teardown;

pub use api::ApiClient;
pub use dispatcher::{ApiRequest, Dispatcher};
pub use refresh::RefreshCoordinator;
pub use teardown::{ChannelNavigator, Navigation, Navigator, SessionTeardown};
