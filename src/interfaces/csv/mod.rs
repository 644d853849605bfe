pub mod route_writer;
pub mod script_reader;
