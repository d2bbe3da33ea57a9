pub mod init;
pub mod metrics;
pub mod run;
pub mod signoff;
pub mod status;
