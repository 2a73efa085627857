mod file;

pub use file::Channel;
