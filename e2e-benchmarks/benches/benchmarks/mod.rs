pub mod joinbench;
pub mod querybench;
