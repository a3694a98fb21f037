pub mod accounts;
pub mod launch;
pub mod properties;
pub mod system;
pub mod versions;
