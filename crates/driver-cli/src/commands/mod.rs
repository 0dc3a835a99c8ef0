pub mod attach;
pub mod config;
pub mod fingerprint;
pub mod list;
pub mod run;
pub mod stop;
pub mod watch;
