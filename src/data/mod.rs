pub mod distances;
pub mod graph;
pub mod init;
pub mod structures;
