pub mod backend;
pub mod memory;
pub mod mongo;
pub mod record;
