pub mod api;
pub mod link_validator;
pub mod normalize;
pub mod session;


pub use api::{FeedLinks, FeedResponse, PatreonApiClient, PatreonCredentials};
pub use link_validator::HttpLinkValidator;
pub use normalize::normalize;
pub use session::{Authenticator, FileTokenStore, SessionManager, TokenStore};
