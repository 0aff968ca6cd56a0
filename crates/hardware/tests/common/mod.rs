/// Running platforms and debug clients.
pub mod harness;
