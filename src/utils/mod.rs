//! Input parsing and validation helpers

pub mod port_spec;
pub mod validator;

pub use port_spec::parse_port_spec;
