//! Driving adapters holding the transient state behind each screen. They own their form records,
//! loading flags, error state, and cached data, and call into the domain through its driving ports.

pub mod add_task;
pub mod auth;
pub mod task_list;
