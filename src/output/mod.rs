//! Output formatting for hook responses.

mod response;

pub use response::{format_response, modified_event_json};
