pub mod config;
pub mod project;
pub mod test_fixture;
pub mod transport_state;
