pub mod graph;
pub mod init;
pub mod nearest_neighbours;
pub mod structures;
pub mod synthetic;
