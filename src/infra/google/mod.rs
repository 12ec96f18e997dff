// Google REST clients. The core layer only sees `CalendarApi`,
// `DocumentApi` and `TokenExchanger`.

pub mod google_workspace_client;
pub mod oauth_client;

pub use google_workspace_client::GoogleWorkspaceClient;
pub use oauth_client::GoogleTokenExchanger;
