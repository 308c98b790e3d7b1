pub mod domain;
pub mod logic;
pub mod storage;
