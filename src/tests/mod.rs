pub mod common;

mod httpmock_token_endpoint;
