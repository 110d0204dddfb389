pub mod history;
pub mod shared_buffer;
pub mod state;
