pub mod fs;
pub mod solver;
