pub mod composite;
pub mod in_memory_store;
pub mod influx_store;
pub mod jsonl_store;
pub mod migrations;
pub mod mongo_store;
pub mod redis_store;
pub mod sqlite_store;
