pub mod analysis;
pub mod cli;
pub mod evidence;
pub mod genes;
pub mod gff;
pub mod output;
pub mod pipeline;
