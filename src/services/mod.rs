pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod formatter;
pub mod schema;
