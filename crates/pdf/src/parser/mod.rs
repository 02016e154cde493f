pub mod backend;
pub mod fragments;
pub mod spans;
