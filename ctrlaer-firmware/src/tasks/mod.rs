//! Embassy async tasks

pub mod listen;

pub use listen::listen_task;
