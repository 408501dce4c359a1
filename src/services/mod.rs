pub mod backoff;
pub mod coordinator;
#[cfg(test)]
pub mod memory;
pub mod note_store;
pub mod object_store;
pub mod renderer;
