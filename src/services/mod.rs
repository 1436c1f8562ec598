pub mod chat;
pub mod correlator;
pub mod download;
pub mod poller;
pub mod quota;
pub mod scheduler;
pub mod storage;
pub mod tracker;
pub mod upload;
