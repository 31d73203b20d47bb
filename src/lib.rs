pub mod record;
pub mod level;
pub mod backend;
pub mod fields;
pub mod pool;
pub mod handler;

pub mod noop;
pub mod capture;
