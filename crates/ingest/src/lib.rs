// Module structure for the ingest parsers and their command-line runner.

// Core parsing
pub mod parser;

// Process plumbing
pub mod conf;
pub mod runtime;
