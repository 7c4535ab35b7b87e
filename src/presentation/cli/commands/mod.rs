pub mod cleanup;
pub mod daemon;
pub mod failures;
pub mod init;
pub mod scan;
