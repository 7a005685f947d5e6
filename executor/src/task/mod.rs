mod api;
mod core;

pub use self::api::{DropHandle, Handle, Runnable, Task};
